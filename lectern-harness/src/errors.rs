use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::validate::ValidationError;
use lectern_protocol::errors::ClientError;

/// Format a JSON parse error for user-friendly display, including the field path
fn format_json_error(e: &serde_path_to_error::Error<serde_json::Error>) -> String {
    let path = e.path().to_string();
    let inner = e.inner();
    let located = format!("Line {}, Column {}: {}", inner.line(), inner.column(), inner);

    if path.is_empty() || path == "." {
        located
    } else {
        format!("{}: {}", path, located)
    }
}

fn tag_suffix(tag: &Option<String>) -> String {
    match tag {
        Some(tag) => format!(" ('{}')", tag),
        None => String::new(),
    }
}

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Invalid notebook identifier '{0}': expected a bare name without path separators")]
    InvalidIdentifier(String),

    #[error("Notebook '{identifier}' not found at {path}")]
    NotFound { identifier: String, path: PathBuf },

    #[error("Failed to read notebook '{path}': {source}")]
    DocumentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse notebook '{path}':\n  {}", format_json_error(.source))]
    DocumentParse {
        path: PathBuf,
        #[source]
        source: serde_path_to_error::Error<serde_json::Error>,
    },

    #[error("Execution timeout must be greater than zero")]
    InvalidTimeout,

    #[error("Kernel binary not found; build the workspace or set LECTERN_KERNEL")]
    KernelBinaryNotFound,

    #[error("Failed to spawn kernel process: {0}")]
    KernelSpawn(#[source] std::io::Error),

    #[error("Timed out waiting for kernel socket at {0}")]
    KernelConnect(PathBuf),

    #[error("Kernel connection error: {0}")]
    Client(#[from] ClientError),

    #[error("Kernel protocol error: {0}")]
    Protocol(String),

    #[error("Cell {index}{} failed: {message}", tag_suffix(.tag))]
    CellFailed {
        index: usize,
        tag: Option<String>,
        message: String,
        traceback: Option<String>,
    },

    #[error("Notebook execution exceeded timeout of {}s", .limit.as_secs())]
    Timeout { limit: Duration },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type Result<T> = std::result::Result<T, HarnessError>;

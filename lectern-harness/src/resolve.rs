//! Identifier-to-path resolution.
//!
//! Notebook identifiers are bare names; the harness resolves them inside a
//! configured notebooks directory by a fixed naming convention. Resolution
//! failures happen before any kernel process is launched.

use std::path::{Path, PathBuf};

use crate::errors::{HarnessError, Result};

/// File extension appended to a notebook identifier
pub const NOTEBOOK_EXT: &str = "nb.json";

/// Resolve a notebook identifier to its document path.
///
/// Identifiers must be bare names: path separators and parent-directory
/// components are rejected so an identifier can never escape the
/// notebooks directory.
pub fn resolve_notebook(notebooks_dir: &Path, identifier: &str) -> Result<PathBuf> {
    if identifier.is_empty()
        || identifier.contains('/')
        || identifier.contains('\\')
        || identifier.contains("..")
    {
        return Err(HarnessError::InvalidIdentifier(identifier.to_string()));
    }

    let path = notebooks_dir.join(format!("{}.{}", identifier, NOTEBOOK_EXT));
    if !path.is_file() {
        return Err(HarnessError::NotFound {
            identifier: identifier.to_string(),
            path,
        });
    }
    Ok(path)
}

#[cfg(test)]
mod tests;

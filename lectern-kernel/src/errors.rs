use thiserror::Error;

#[derive(Error, Debug)]
pub enum KernelError {
    #[error("Lua state error: {0}")]
    Lua(String),

    #[error("cell {index} failed: {message}")]
    Cell {
        index: usize,
        message: String,
        traceback: Option<String>,
    },

    #[error("Global '{name}' cannot be serialized: {message}")]
    Serialize { name: String, message: String },

    #[error("Session thread is not running")]
    SessionClosed,

    #[error("Failed to start session thread: {0}")]
    SessionSpawn(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, KernelError>;

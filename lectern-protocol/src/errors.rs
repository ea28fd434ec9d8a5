use std::path::PathBuf;
use thiserror::Error;

/// Errors in message encoding/decoding.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Failed to encode message: {0}")]
    Encode(#[source] bincode::Error),

    #[error("Failed to decode message: {0}")]
    Decode(#[source] bincode::Error),

    #[error("Message exceeds maximum size")]
    MessageTooLarge,
}

/// Errors on the client (harness) side of the connection.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to connect to kernel socket: {0}")]
    Connect(#[source] std::io::Error),

    #[error("Kernel connection closed")]
    Disconnected,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Errors on the server (kernel) side of the connection.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Socket path {socket_path} is a symlink; refusing to bind")]
    SocketSymlink { socket_path: PathBuf },

    #[error("Failed to remove stale socket {socket_path}: {source}")]
    StaleSocket {
        socket_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to bind socket {socket_path}: {source}")]
    Bind {
        socket_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to set permissions on socket {socket_path}: {source}")]
    SocketPermissions {
        socket_path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

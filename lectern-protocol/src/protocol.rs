use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;

/// Maximum message size (10MB) — local Unix socket, no network concerns
pub const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Request sent from the harness to the kernel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    /// Check that the kernel is alive and accepting requests
    Ping,
    /// Execute one code cell. `index` is the cell's position in the
    /// notebook document and is echoed back in errors so failures can be
    /// attributed to the originating cell.
    ExecuteCell { index: usize, source: String },
    /// Read a global binding from the kernel state, serialized as JSON
    Inspect { name: String },
    /// List the names of globals defined by executed cells
    ListGlobals,
    /// Shut the kernel down
    Shutdown,
}

impl Request {
    /// Return the variant name as a static string (for lightweight error reporting)
    pub fn variant_name(&self) -> &'static str {
        match self {
            Request::Ping => "Ping",
            Request::ExecuteCell { .. } => "ExecuteCell",
            Request::Inspect { .. } => "Inspect",
            Request::ListGlobals => "ListGlobals",
            Request::Shutdown => "Shutdown",
        }
    }
}

/// Result of a successfully executed cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellResult {
    /// Cell position in the notebook document
    pub index: usize,
    /// Captured output lines, in production order
    pub outputs: Vec<String>,
    /// Wall-clock execution time in milliseconds
    pub duration_ms: u64,
    /// Completion timestamp in milliseconds since Unix epoch
    pub finished_at: i64,
}

/// Response sent from the kernel to the harness
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    Pong,
    /// Cell executed successfully
    CellDone(CellResult),
    /// Cell raised during execution. The kernel error is surfaced verbatim;
    /// the traceback is split out when one is available.
    CellFailed {
        index: usize,
        message: String,
        traceback: Option<String>,
    },
    /// Inspection result. `None` when the binding does not exist.
    Value { json: Option<String> },
    /// Names of globals defined by executed cells, sorted
    Globals(Vec<String>),
    /// Kernel acknowledged a shutdown request
    ShuttingDown,
    /// Request failed inside the kernel
    Error { message: String },
}

impl Response {
    /// Create an error response
    pub fn error(msg: impl Into<String>) -> Self {
        Response::Error {
            message: msg.into(),
        }
    }
}

/// Client-to-server message with request ID for multiplexing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub id: u64,
    pub request: Request,
}

/// Server-to-client message: either a response to a request, or a pushed event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    Response { id: u64, response: Response },
    Event { event: ServerEvent },
}

/// Server-pushed events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerEvent {
    /// One output line produced by the cell currently executing for `request_id`
    Output { request_id: u64, line: String },
}

impl ServerEvent {
    /// The request this event belongs to
    pub fn request_id(&self) -> u64 {
        match self {
            ServerEvent::Output { request_id, .. } => *request_id,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Encode a request envelope to length-prefixed bincode bytes
pub fn encode_envelope(envelope: &RequestEnvelope) -> Result<Vec<u8>> {
    let size = bincode::serialized_size(envelope).map_err(ProtocolError::Encode)?;
    if size > MAX_MESSAGE_SIZE as u64 {
        return Err(ProtocolError::MessageTooLarge);
    }
    let len = size as u32;
    let mut frame = Vec::with_capacity(4 + size as usize);
    frame.extend_from_slice(&len.to_be_bytes());
    bincode::serialize_into(&mut frame, envelope).map_err(ProtocolError::Encode)?;
    Ok(frame)
}

/// Decode a request envelope from raw bincode payload (framing already stripped)
pub fn decode_envelope(bytes: &[u8]) -> Result<RequestEnvelope> {
    bincode::deserialize(bytes).map_err(ProtocolError::Decode)
}

/// Encode a server message to length-prefixed bincode bytes
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>> {
    let size = bincode::serialized_size(msg).map_err(ProtocolError::Encode)?;
    if size > MAX_MESSAGE_SIZE as u64 {
        return Err(ProtocolError::MessageTooLarge);
    }
    let len = size as u32;
    let mut frame = Vec::with_capacity(4 + size as usize);
    frame.extend_from_slice(&len.to_be_bytes());
    bincode::serialize_into(&mut frame, msg).map_err(ProtocolError::Encode)?;
    Ok(frame)
}

/// Decode a server message from raw bincode payload (framing already stripped)
pub fn decode_server_message(bytes: &[u8]) -> Result<ServerMessage> {
    bincode::deserialize(bytes).map_err(ProtocolError::Decode)
}

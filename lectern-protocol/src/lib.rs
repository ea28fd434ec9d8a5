//! Wire protocol between the lectern harness and a kernel process.
//!
//! One kernel process serves exactly one harness invocation over a Unix
//! socket. Messages are length-prefixed bincode frames: the harness sends
//! [`protocol::RequestEnvelope`]s, the kernel answers with
//! [`protocol::ServerMessage`]s and may push [`protocol::ServerEvent`]s
//! (live cell output) while a request is in flight.

pub mod client;
pub mod errors;
pub mod protocol;
pub mod server;

pub use client::Client;
pub use errors::{ClientError, ProtocolError, ServerError};
pub use server::{OutputSender, Server, ShutdownTx};

use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::UnixStream,
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::debug;

use crate::{
    errors::ClientError,
    protocol::{
        decode_server_message, encode_envelope, Request, RequestEnvelope, Response, ServerEvent,
        ServerMessage, MAX_MESSAGE_SIZE,
    },
};

pub type Result<T> = std::result::Result<T, ClientError>;

/// Bounded channel capacity for the client writer task.
const WRITER_CHANNEL_CAPACITY: usize = 64;

struct PendingRequest {
    response_tx: oneshot::Sender<Response>,
    event_tx: Option<mpsc::UnboundedSender<ServerEvent>>,
}

/// Harness-side connection to one kernel process.
///
/// Requests are multiplexed over a single Unix socket; each in-flight
/// request owns a oneshot for its response and an unbounded channel for
/// events the kernel pushes while the request executes.
pub struct Client {
    writer_tx: mpsc::Sender<Vec<u8>>,
    pending: Arc<DashMap<u64, PendingRequest>>,
    next_id: Arc<AtomicU64>,
    _reader_handle: JoinHandle<()>,
    _writer_handle: JoinHandle<()>,
}

impl Client {
    /// Connect to the kernel at the given socket path
    pub async fn connect(socket_path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(socket_path)
            .await
            .map_err(ClientError::Connect)?;

        let (read_half, mut write_half) = stream.into_split();

        let pending: Arc<DashMap<u64, PendingRequest>> = Arc::new(DashMap::new());

        // Writer task: receives encoded bytes and writes to stream
        let (writer_tx, mut writer_rx) = mpsc::channel::<Vec<u8>>(WRITER_CHANNEL_CAPACITY);

        let writer_handle = tokio::spawn(async move {
            while let Some(bytes) = writer_rx.recv().await {
                if let Err(e) = write_half.write_all(&bytes).await {
                    debug!("Client writer error: {}", e);
                    break;
                }
            }
            let _ = write_half.shutdown().await;
        });

        // Reader task: reads length-prefixed frames from stream, dispatches to pending map
        let reader_pending = pending.clone();
        let reader_handle = tokio::spawn(async move {
            let mut reader = read_half;

            loop {
                // Read 4-byte length header
                let mut len_buf = [0u8; 4];
                if let Err(e) = reader.read_exact(&mut len_buf).await {
                    if e.kind() == std::io::ErrorKind::UnexpectedEof {
                        debug!("Kernel disconnected (EOF)");
                    } else {
                        debug!("Client reader error: {}", e);
                    }
                    // Drop all pending senders so waiters get RecvError → Disconnected
                    reader_pending.clear();
                    return;
                }
                let msg_len = u32::from_be_bytes(len_buf) as usize;

                if msg_len > MAX_MESSAGE_SIZE {
                    debug!("Kernel message exceeds maximum size");
                    reader_pending.clear();
                    return;
                }

                // Read payload
                let mut payload = vec![0u8; msg_len];
                if let Err(e) = reader.read_exact(&mut payload).await {
                    debug!("Client reader error: {}", e);
                    reader_pending.clear();
                    return;
                }

                // Decode server message
                match decode_server_message(&payload) {
                    Ok(ServerMessage::Response { id, response }) => {
                        if let Some((_, pending_req)) = reader_pending.remove(&id) {
                            let _ = pending_req.response_tx.send(response);
                        } else {
                            debug!("Received response for unknown request id={}", id);
                        }
                    }
                    Ok(ServerMessage::Event { event }) => {
                        let request_id = event.request_id();
                        if let Some(pending_req) = reader_pending.get(&request_id) {
                            if let Some(ref event_tx) = pending_req.event_tx {
                                let _ = event_tx.send(event);
                            }
                        }
                    }
                    Err(e) => {
                        debug!("Failed to decode server message: {}", e);
                    }
                }
            }
        });

        Ok(Self {
            writer_tx,
            pending,
            next_id: Arc::new(AtomicU64::new(1)),
            _reader_handle: reader_handle,
            _writer_handle: writer_handle,
        })
    }

    /// Check if a kernel is serving the given socket by connecting and pinging
    pub async fn is_kernel_alive(socket_path: &Path) -> bool {
        if !socket_path.exists() {
            return false;
        }

        match Self::connect(socket_path).await {
            Ok(client) => {
                let Ok((_rx, fut)) = client.send_request(Request::Ping) else {
                    return false;
                };
                matches!(fut.await, Ok(Response::Pong))
            }
            Err(_) => false,
        }
    }

    /// Send a request and receive both pushed events and a response.
    /// Takes `&self` - multiple requests can be in-flight concurrently.
    ///
    /// Returns an event receiver and a future that resolves to the final
    /// response. The event channel closes once the response has arrived.
    pub fn send_request(
        &self,
        request: Request,
    ) -> Result<(
        mpsc::UnboundedReceiver<ServerEvent>,
        impl Future<Output = Result<Response>>,
    )> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let (response_tx, response_rx) = oneshot::channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        self.pending.insert(
            id,
            PendingRequest {
                response_tx,
                event_tx: Some(event_tx),
            },
        );

        let envelope = RequestEnvelope { id, request };
        let bytes = encode_envelope(&envelope)?;

        let writer_tx = self.writer_tx.clone();
        let response_future = async move {
            writer_tx
                .send(bytes)
                .await
                .map_err(|_| ClientError::Disconnected)?;
            response_rx.await.map_err(|_| ClientError::Disconnected)
        };

        Ok((event_rx, response_future))
    }

    /// Ping the kernel
    pub fn ping(
        &self,
    ) -> Result<(
        mpsc::UnboundedReceiver<ServerEvent>,
        impl Future<Output = Result<Response>>,
    )> {
        self.send_request(Request::Ping)
    }

    /// Execute one cell. Output lines stream in on the event receiver while
    /// the cell runs; the response carries the authoritative result.
    pub fn execute_cell(
        &self,
        index: usize,
        source: String,
    ) -> Result<(
        mpsc::UnboundedReceiver<ServerEvent>,
        impl Future<Output = Result<Response>>,
    )> {
        self.send_request(Request::ExecuteCell { index, source })
    }

    /// Read a global binding from the kernel state
    pub fn inspect(
        &self,
        name: impl Into<String>,
    ) -> Result<(
        mpsc::UnboundedReceiver<ServerEvent>,
        impl Future<Output = Result<Response>>,
    )> {
        self.send_request(Request::Inspect { name: name.into() })
    }

    /// List globals defined by executed cells
    pub fn list_globals(
        &self,
    ) -> Result<(
        mpsc::UnboundedReceiver<ServerEvent>,
        impl Future<Output = Result<Response>>,
    )> {
        self.send_request(Request::ListGlobals)
    }

    /// Ask the kernel to shut down
    pub fn shutdown(
        &self,
    ) -> Result<(
        mpsc::UnboundedReceiver<ServerEvent>,
        impl Future<Output = Result<Response>>,
    )> {
        self.send_request(Request::Shutdown)
    }
}

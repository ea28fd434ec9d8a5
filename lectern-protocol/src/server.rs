use std::{future::Future, path::PathBuf, sync::Arc};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{UnixListener, UnixStream},
    sync::mpsc,
};
use tracing::{debug, error, info};

use crate::{
    errors::ServerError,
    protocol::{
        decode_envelope, encode_server_message, Request, Response, ServerEvent, ServerMessage,
        MAX_MESSAGE_SIZE,
    },
};

pub type Result<T> = std::result::Result<T, ServerError>;
pub type ShutdownTx = mpsc::Sender<()>;

/// Bounded channel capacity for the per-connection writer task.
const WRITER_CHANNEL_CAPACITY: usize = 256;

/// Sender for output events from a request handler back to the client.
///
/// Wraps the shared write channel and the request ID so handlers can
/// stream cell output lines without knowing about framing.
#[derive(Clone)]
pub struct OutputSender {
    write_tx: mpsc::Sender<Vec<u8>>,
    request_id: u64,
}

impl OutputSender {
    /// Create a new output sender.
    pub fn new(write_tx: mpsc::Sender<Vec<u8>>, request_id: u64) -> Self {
        Self {
            write_tx,
            request_id,
        }
    }

    /// Send one output line to the client. Fire-and-forget: errors are silently ignored.
    pub async fn send_line(&self, line: String) {
        let msg = ServerMessage::Event {
            event: ServerEvent::Output {
                request_id: self.request_id,
                line,
            },
        };
        if let Ok(bytes) = encode_server_message(&msg) {
            let _ = self.write_tx.send(bytes).await;
        }
    }
}

/// Kernel-side request loop over a Unix socket.
///
/// Each accepted connection gets its own writer task; each decoded request
/// is handled concurrently so a long-running cell does not block control
/// requests such as `Shutdown`.
pub struct Server<F, Fut>
where
    F: Fn(Request, ShutdownTx, OutputSender) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send,
{
    socket_path: PathBuf,
    handler: Arc<F>,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl<F, Fut> Server<F, Fut>
where
    F: Fn(Request, ShutdownTx, OutputSender) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send,
{
    pub fn new(socket_path: PathBuf, handler: F) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        Ok(Self {
            socket_path,
            handler: Arc::new(handler),
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub async fn run(mut self) -> Result<()> {
        // Reject symlinked socket path before any operations
        if self.socket_path.exists() {
            let meta = std::fs::symlink_metadata(&self.socket_path).map_err(|e| {
                ServerError::StaleSocket {
                    socket_path: self.socket_path.clone(),
                    source: e,
                }
            })?;
            if meta.file_type().is_symlink() {
                return Err(ServerError::SocketSymlink {
                    socket_path: self.socket_path.clone(),
                });
            }
        }

        // Remove stale socket file
        match std::fs::remove_file(&self.socket_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ServerError::StaleSocket {
                    socket_path: self.socket_path.clone(),
                    source: e,
                })
            }
        }

        let listener = UnixListener::bind(&self.socket_path).map_err(|e| ServerError::Bind {
            socket_path: self.socket_path.clone(),
            source: e,
        })?;

        // Owner-only: the socket lives in a per-run directory owned by the
        // harness user, but tighten the file itself as well.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.socket_path, std::fs::Permissions::from_mode(0o600))
                .map_err(|e| ServerError::SocketPermissions {
                    socket_path: self.socket_path.clone(),
                    source: e,
                })?;
        }

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, _)) => {
                            let shutdown_tx = self.shutdown_tx.clone();
                            let handler = Arc::clone(&self.handler);

                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(handler, stream, shutdown_tx).await {
                                    debug!("Connection handler error: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }
                _ = self.shutdown_rx.recv() => {
                    info!("Kernel server shutting down");
                    break;
                }
            }
        }

        let _ = std::fs::remove_file(&self.socket_path);
        Ok(())
    }
}

/// Serve one connection: read frames, dispatch each request to the handler
/// on its own task, funnel framed responses through a single writer task.
async fn handle_connection<F, Fut>(
    handler: Arc<F>,
    stream: UnixStream,
    shutdown_tx: ShutdownTx,
) -> std::io::Result<()>
where
    F: Fn(Request, ShutdownTx, OutputSender) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send,
{
    let (mut read_half, mut write_half) = stream.into_split();

    let (write_tx, mut write_rx) = mpsc::channel::<Vec<u8>>(WRITER_CHANNEL_CAPACITY);

    let writer_handle = tokio::spawn(async move {
        while let Some(bytes) = write_rx.recv().await {
            if let Err(e) = write_half.write_all(&bytes).await {
                debug!("Connection writer error: {}", e);
                break;
            }
        }
        let _ = write_half.shutdown().await;
    });

    loop {
        let mut len_buf = [0u8; 4];
        match read_half.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                debug!("Client disconnected (EOF)");
                break;
            }
            Err(e) => return Err(e),
        }
        let msg_len = u32::from_be_bytes(len_buf) as usize;

        if msg_len > MAX_MESSAGE_SIZE {
            debug!("Request exceeds maximum size; closing connection");
            break;
        }

        let mut payload = vec![0u8; msg_len];
        read_half.read_exact(&mut payload).await?;

        let envelope = match decode_envelope(&payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!("Failed to decode request: {}", e);
                continue;
            }
        };

        debug!(
            id = envelope.id,
            request = envelope.request.variant_name(),
            "handling request"
        );

        let handler = Arc::clone(&handler);
        let shutdown_tx = shutdown_tx.clone();
        let write_tx = write_tx.clone();
        tokio::spawn(async move {
            let output = OutputSender::new(write_tx.clone(), envelope.id);
            let response = handler(envelope.request, shutdown_tx, output).await;
            let msg = ServerMessage::Response {
                id: envelope.id,
                response,
            };
            match encode_server_message(&msg) {
                Ok(bytes) => {
                    let _ = write_tx.send(bytes).await;
                }
                Err(e) => {
                    error!("Failed to encode response: {}", e);
                }
            }
        });
    }

    drop(write_tx);
    let _ = writer_handle.await;
    Ok(())
}

#[cfg(test)]
mod tests;

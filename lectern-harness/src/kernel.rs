//! Kernel process lifecycle.
//!
//! Each harness invocation spawns one `lectern-kernel` process in its own
//! process group, serving a Unix socket inside a per-run temporary
//! directory. The process is exclusively owned by the invocation and is
//! torn down on every exit path.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use lectern_protocol::client::Client;
use lectern_protocol::protocol::Response;

use crate::errors::{HarnessError, Result};

/// Name of the kernel binary spawned per invocation
pub const KERNEL_BINARY: &str = "lectern-kernel";

/// Environment variable overriding kernel binary discovery
pub const KERNEL_PATH_ENV: &str = "LECTERN_KERNEL";

const SOCKET_WAIT: Duration = Duration::from_secs(10);
const PING_TIMEOUT: Duration = Duration::from_secs(5);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Cached result of kernel binary lookup.
/// `Some(path)` = found, `None` = not found.
static KERNEL_PATH: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Locate the `lectern-kernel` binary.
///
/// Checks the `LECTERN_KERNEL` env override first, then as a sibling of the
/// current executable, then the parent directory (handles the
/// `target/debug/deps/` layout during `cargo test`), then the workspace
/// `target/` directories, and finally PATH.
fn find_kernel_binary() -> Option<PathBuf> {
    KERNEL_PATH
        .get_or_init(|| {
            if let Ok(path) = std::env::var(KERNEL_PATH_ENV) {
                let path = PathBuf::from(path);
                if path.is_file() {
                    return Some(path);
                }
                warn!(
                    "{} points at {:?}, which is not a file",
                    KERNEL_PATH_ENV, path
                );
            }

            if let Ok(exe) = std::env::current_exe() {
                if let Some(dir) = exe.parent() {
                    let sibling = dir.join(KERNEL_BINARY);
                    if sibling.is_file() {
                        debug!("Found kernel binary at {:?}", sibling);
                        return Some(sibling);
                    }

                    if let Some(parent) = dir.parent() {
                        let path = parent.join(KERNEL_BINARY);
                        if path.is_file() {
                            debug!("Found kernel binary at {:?}", path);
                            return Some(path);
                        }
                    }
                }
            }

            // Check target/ relative to the workspace root during cargo test
            if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
                let workspace_root = PathBuf::from(&manifest_dir)
                    .parent()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| PathBuf::from(&manifest_dir));

                for profile in ["debug", "release"] {
                    let path = workspace_root.join("target").join(profile).join(KERNEL_BINARY);
                    if path.is_file() {
                        return Some(path);
                    }
                }
            }

            which::which(KERNEL_BINARY).ok()
        })
        .clone()
}

/// One running kernel process with a live client connection.
pub struct KernelProcess {
    child: Option<Child>,
    pid: Option<u32>,
    client: Arc<Client>,
    socket_path: PathBuf,
    _stdout_task: Option<JoinHandle<()>>,
    _stderr_task: Option<JoinHandle<()>>,
    _socket_dir: TempDir,
}

impl KernelProcess {
    /// Spawn a fresh kernel and connect to it. On any failure past the
    /// actual spawn, the child is killed before the error is returned so a
    /// half-launched kernel can never leak.
    pub async fn spawn() -> Result<Self> {
        let binary = find_kernel_binary().ok_or(HarnessError::KernelBinaryNotFound)?;
        let socket_dir = TempDir::new().map_err(HarnessError::KernelSpawn)?;
        let socket_path = socket_dir.path().join("kernel.sock");

        debug!("Spawning kernel: {:?} --socket {:?}", binary, socket_path);

        let mut cmd = Command::new(&binary);
        cmd.arg("--socket")
            .arg(&socket_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group so the whole kernel tree can be killed at once
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(HarnessError::KernelSpawn)?;
        let pid = child.id();
        debug!("Kernel spawned with PID {:?}", pid);

        // Drain the pipes so the kernel can never block on them; stderr
        // carries the kernel's tracing output.
        let stdout_task = child.stdout.take().map(|s| spawn_drain_task(s));
        let stderr_task = child.stderr.take().map(|s| spawn_log_task(s));

        if let Err(e) = wait_for_socket(&socket_path, SOCKET_WAIT).await {
            kill_kernel(&mut child, pid).await;
            return Err(e);
        }

        let client = match Client::connect(&socket_path).await {
            Ok(client) => Arc::new(client),
            Err(e) => {
                kill_kernel(&mut child, pid).await;
                return Err(e.into());
            }
        };

        if let Err(e) = confirm_alive(&client).await {
            kill_kernel(&mut child, pid).await;
            return Err(e);
        }

        Ok(Self {
            child: Some(child),
            pid,
            client,
            socket_path,
            _stdout_task: stdout_task,
            _stderr_task: stderr_task,
            _socket_dir: socket_dir,
        })
    }

    /// PID of the kernel process
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Wire connection to the kernel
    pub fn client(&self) -> Arc<Client> {
        Arc::clone(&self.client)
    }

    /// Path of the kernel's Unix socket
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Tear the kernel down. Asks politely first; SIGKILLs the process
    /// group if the kernel does not exit within the grace period. Safe to
    /// call at most once; later calls are no-ops.
    pub async fn shutdown(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        if let Ok((_events, response)) = self.client.shutdown() {
            let _ = timeout(SHUTDOWN_GRACE, response).await;
        }

        match timeout(SHUTDOWN_GRACE, child.wait()).await {
            Ok(Ok(status)) => debug!("Kernel exited with {:?}", status),
            Ok(Err(e)) => warn!("Failed to reap kernel: {}", e),
            Err(_) => {
                warn!("Kernel did not exit within grace period; killing");
                kill_kernel(&mut child, self.pid).await;
            }
        }
    }
}

impl Drop for KernelProcess {
    fn drop(&mut self) {
        // Last resort for panicking test bodies; shutdown() is the normal
        // teardown and leaves nothing for this to do.
        if let Some(child) = self.child.as_mut() {
            let _ = child.start_kill();
        }
    }
}

/// Spawn a task that reads and discards all lines from a stream.
/// Prevents the kernel from blocking on a full pipe buffer.
fn spawn_drain_task(stream: impl tokio::io::AsyncRead + Unpin + Send + 'static) -> JoinHandle<()> {
    tokio::spawn(async move {
        let reader = BufReader::new(stream);
        let mut lines = reader.lines();
        while let Ok(Some(_)) = lines.next_line().await {}
    })
}

/// Spawn a task that relays kernel stderr into our tracing output.
fn spawn_log_task(stream: impl tokio::io::AsyncRead + Unpin + Send + 'static) -> JoinHandle<()> {
    tokio::spawn(async move {
        let reader = BufReader::new(stream);
        let mut lines = reader.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(target: "kernel", "{}", line);
        }
    })
}

/// Wait for the kernel socket to be available
async fn wait_for_socket(socket_path: &Path, limit: Duration) -> Result<()> {
    let start = std::time::Instant::now();

    while start.elapsed() < limit {
        if socket_path.exists() {
            // Give the kernel a moment to start accepting connections
            tokio::time::sleep(Duration::from_millis(50)).await;
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    Err(HarnessError::KernelConnect(socket_path.to_path_buf()))
}

/// Confirm the kernel answers requests before handing it to the run loop
async fn confirm_alive(client: &Client) -> Result<()> {
    let (_events, response) = client.ping()?;
    match timeout(PING_TIMEOUT, response).await {
        Ok(Ok(Response::Pong)) => Ok(()),
        Ok(Ok(other)) => Err(HarnessError::Protocol(format!(
            "unexpected response to Ping: {:?}",
            other
        ))),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(HarnessError::Protocol(
            "kernel did not answer ping".to_string(),
        )),
    }
}

/// SIGKILL the kernel's process group and reap the child.
async fn kill_kernel(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pid) = pid {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;
        let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
    }
    let _ = child.kill().await;
    let _ = child.wait().await;
}

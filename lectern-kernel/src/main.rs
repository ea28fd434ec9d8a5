//! lectern-kernel: isolated notebook kernel process.
//!
//! Spawned by the harness with `--socket <path>`; serves cell execution
//! and inspection requests over the socket until told to shut down. One
//! process, one Lua state, one harness invocation.

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::info;

use lectern_kernel::session::{spawn_session, SessionHandle};
use lectern_kernel::KernelError;
use lectern_protocol::protocol::{CellResult, Request, Response};
use lectern_protocol::server::{OutputSender, Server, ShutdownTx};

/// Parse `--socket <path>` from argv. This binary is spawned by the
/// harness, not invoked by users, so argument handling stays minimal.
fn parse_args() -> PathBuf {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut socket: Option<PathBuf> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--socket" => {
                i += 1;
                match args.get(i) {
                    Some(path) => socket = Some(PathBuf::from(path)),
                    None => {
                        eprintln!("lectern-kernel: --socket requires a path");
                        process::exit(2);
                    }
                }
            }
            other => {
                eprintln!("lectern-kernel: unknown argument: {}", other);
                process::exit(2);
            }
        }
        i += 1;
    }

    match socket {
        Some(path) => path,
        None => {
            eprintln!("usage: lectern-kernel --socket <path>");
            process::exit(2);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let socket_path = parse_args();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let session = spawn_session()?;

    let handler = move |request: Request, shutdown_tx: ShutdownTx, output: OutputSender| {
        let session = session.clone();
        async move { handle_request(request, session, shutdown_tx, output).await }
    };

    let server = Server::new(socket_path.clone(), handler)?;
    info!("Kernel serving on {:?}", socket_path);

    // Blocks until a Shutdown request arrives
    server.run().await?;

    info!("Kernel exiting");
    Ok(())
}

async fn handle_request(
    request: Request,
    session: SessionHandle,
    shutdown_tx: ShutdownTx,
    output: OutputSender,
) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::ExecuteCell { index, source } => {
            let (line_tx, mut line_rx) = mpsc::unbounded_channel();

            // Forward output lines to the client while the cell runs. The
            // channel closes when the session drops its sender, so this
            // task ends exactly when the cell is done.
            let forwarder = tokio::spawn(async move {
                while let Some(line) = line_rx.recv().await {
                    output.send_line(line).await;
                }
            });

            let result = session.execute_cell(index, source, line_tx).await;
            let _ = forwarder.await;

            match result {
                Ok(outcome) => Response::CellDone(CellResult {
                    index,
                    outputs: outcome.outputs,
                    duration_ms: outcome.duration_ms,
                    finished_at: outcome.finished_at,
                }),
                Err(KernelError::Cell {
                    index,
                    message,
                    traceback,
                }) => Response::CellFailed {
                    index,
                    message,
                    traceback,
                },
                Err(e) => Response::error(e.to_string()),
            }
        }

        Request::Inspect { name } => match session.inspect(name).await {
            Ok(json) => Response::Value { json },
            Err(e) => Response::error(e.to_string()),
        },

        Request::ListGlobals => match session.list_globals().await {
            Ok(names) => Response::Globals(names),
            Err(e) => Response::error(e.to_string()),
        },

        Request::Shutdown => {
            info!("Shutdown requested");
            let _ = shutdown_tx.send(()).await;
            Response::ShuttingDown
        }
    }
}

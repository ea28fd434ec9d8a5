//! Session actor - the dedicated thread that owns the Lua state

use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::{KernelError, Result};
use crate::evaluator::CellEvaluator;

use super::command::SessionCommand;
use super::handle::SessionHandle;

/// Command channel capacity. The harness drives cells one at a time, so
/// this only needs headroom for control requests arriving mid-cell.
const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Spawn the session thread and return a handle to it.
///
/// Blocks until the Lua state has been initialized so construction
/// failures surface here rather than on the first command.
pub fn spawn_session() -> Result<SessionHandle> {
    let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let (init_tx, init_rx) = std::sync::mpsc::channel();

    std::thread::Builder::new()
        .name("lectern-session".into())
        .spawn(move || {
            let evaluator = match CellEvaluator::new() {
                Ok(evaluator) => {
                    let _ = init_tx.send(Ok(()));
                    evaluator
                }
                Err(e) => {
                    let _ = init_tx.send(Err(e));
                    return;
                }
            };
            run(rx, evaluator);
        })
        .map_err(KernelError::SessionSpawn)?;

    init_rx.recv().map_err(|_| KernelError::SessionClosed)??;
    Ok(SessionHandle::new(tx))
}

/// Actor loop: serve commands in arrival order until every handle is gone.
fn run(mut rx: mpsc::Receiver<SessionCommand>, evaluator: CellEvaluator) {
    debug!("session thread started");

    while let Some(command) = rx.blocking_recv() {
        match command {
            SessionCommand::Execute {
                index,
                source,
                stream,
                reply,
            } => {
                debug!(cell = index, "executing cell");
                let result = evaluator.execute_cell(index, &source, Some(stream));
                let _ = reply.send(result);
            }
            SessionCommand::Inspect { name, reply } => {
                let _ = reply.send(evaluator.inspect(&name));
            }
            SessionCommand::ListGlobals { reply } => {
                let _ = reply.send(evaluator.user_globals());
            }
        }
    }

    debug!("session thread exiting");
}

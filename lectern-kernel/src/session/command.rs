//! Commands for the session actor

use tokio::sync::{mpsc, oneshot};

use crate::errors::KernelError;
use crate::evaluator::CellOutcome;

type Reply<T> = oneshot::Sender<Result<T, KernelError>>;

pub enum SessionCommand {
    /// Execute one cell. Output lines are streamed on `stream` while the
    /// cell runs; the full outcome is returned on `reply`.
    Execute {
        index: usize,
        source: String,
        stream: mpsc::UnboundedSender<String>,
        reply: Reply<CellOutcome>,
    },
    /// Read a global binding as JSON (`None` when undefined)
    Inspect {
        name: String,
        reply: Reply<Option<String>>,
    },
    /// List globals defined by executed cells
    ListGlobals { reply: Reply<Vec<String>> },
}

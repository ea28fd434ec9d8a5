//! SessionHandle - async interface to the session thread

use tokio::sync::{mpsc, oneshot};

use crate::errors::{KernelError, Result};
use crate::evaluator::CellOutcome;

use super::command::SessionCommand;

/// Handle for sending commands to the session actor.
/// This is cheap to clone (just clones the channel sender).
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub(super) fn new(tx: mpsc::Sender<SessionCommand>) -> Self {
        Self { tx }
    }

    /// Execute one cell, streaming output lines on `stream` while it runs.
    pub async fn execute_cell(
        &self,
        index: usize,
        source: String,
        stream: mpsc::UnboundedSender<String>,
    ) -> Result<CellOutcome> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Execute {
                index,
                source,
                stream,
                reply: reply_tx,
            })
            .await
            .map_err(|_| KernelError::SessionClosed)?;
        reply_rx.await.map_err(|_| KernelError::SessionClosed)?
    }

    /// Read a global binding as JSON. `None` when the binding is undefined.
    pub async fn inspect(&self, name: impl Into<String>) -> Result<Option<String>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Inspect {
                name: name.into(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| KernelError::SessionClosed)?;
        reply_rx.await.map_err(|_| KernelError::SessionClosed)?
    }

    /// List globals defined by executed cells.
    pub async fn list_globals(&self) -> Result<Vec<String>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::ListGlobals { reply: reply_tx })
            .await
            .map_err(|_| KernelError::SessionClosed)?;
        reply_rx.await.map_err(|_| KernelError::SessionClosed)?
    }
}

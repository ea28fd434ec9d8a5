//! Read surface over one executed notebook.

use std::sync::Arc;

use serde_json::Value;

use lectern_protocol::client::Client;
use lectern_protocol::protocol::{Request, Response};

use crate::errors::{HarnessError, Result};

/// One executed code cell and everything it produced.
#[derive(Debug, Clone)]
pub struct ExecutedCell {
    /// Position in the notebook document (markdown cells count)
    pub index: usize,
    /// Tag from the notebook document, if the cell carried one
    pub tag: Option<String>,
    /// Captured output lines, in production order
    pub outputs: Vec<String>,
    /// Wall-clock execution time in milliseconds
    pub duration_ms: u64,
    /// Completion timestamp in milliseconds since Unix epoch
    pub finished_at: i64,
}

/// Handle a test body uses to inspect an executed notebook.
///
/// Cell records are a snapshot of the run; `value` and `globals` query the
/// now-idle kernel live. The handle is only valid inside the test body;
/// the kernel behind it is torn down when the harness invocation ends.
pub struct NotebookClient {
    wire: Arc<Client>,
    kernel_pid: Option<u32>,
    cells: Vec<ExecutedCell>,
}

impl NotebookClient {
    pub(crate) fn new(wire: Arc<Client>, kernel_pid: Option<u32>, cells: Vec<ExecutedCell>) -> Self {
        Self {
            wire,
            kernel_pid,
            cells,
        }
    }

    /// All executed cells, in execution order
    pub fn cells(&self) -> &[ExecutedCell] {
        &self.cells
    }

    /// Executed cell at the given document position
    pub fn cell(&self, index: usize) -> Option<&ExecutedCell> {
        self.cells.iter().find(|cell| cell.index == index)
    }

    /// Executed cell carrying the given tag
    pub fn cell_by_tag(&self, tag: &str) -> Option<&ExecutedCell> {
        self.cells.iter().find(|cell| cell.tag.as_deref() == Some(tag))
    }

    /// All output lines across every executed cell, in production order
    pub fn output_lines(&self) -> Vec<&str> {
        self.cells
            .iter()
            .flat_map(|cell| cell.outputs.iter().map(String::as_str))
            .collect()
    }

    /// PID of the kernel process backing this client
    pub fn kernel_pid(&self) -> Option<u32> {
        self.kernel_pid
    }

    /// Read a global binding from the kernel's final state.
    /// Returns `None` when the binding does not exist.
    pub async fn value(&self, name: &str) -> Result<Option<Value>> {
        let request = Request::Inspect {
            name: name.to_string(),
        };
        match self.roundtrip(request).await? {
            Response::Value { json } => match json {
                Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|e| {
                    HarnessError::Protocol(format!(
                        "kernel returned invalid JSON for '{}': {}",
                        name, e
                    ))
                }),
                None => Ok(None),
            },
            Response::Error { message } => Err(HarnessError::Protocol(message)),
            other => Err(HarnessError::Protocol(format!(
                "unexpected response to Inspect: {:?}",
                other
            ))),
        }
    }

    /// Names of globals defined by the notebook's cells, sorted
    pub async fn globals(&self) -> Result<Vec<String>> {
        match self.roundtrip(Request::ListGlobals).await? {
            Response::Globals(names) => Ok(names),
            Response::Error { message } => Err(HarnessError::Protocol(message)),
            other => Err(HarnessError::Protocol(format!(
                "unexpected response to ListGlobals: {:?}",
                other
            ))),
        }
    }

    async fn roundtrip(&self, request: Request) -> Result<Response> {
        let (_events, response) = self.wire.send_request(request)?;
        Ok(response.await?)
    }
}

//! The run loop: resolve, launch, execute, inspect, tear down.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use lectern_protocol::client::Client;
use lectern_protocol::protocol::{Response, ServerEvent};

use crate::client::{ExecutedCell, NotebookClient};
use crate::document::NotebookDocument;
use crate::errors::{HarnessError, Result};
use crate::kernel::KernelProcess;
use crate::resolve::resolve_notebook;
use crate::validate::ValidationError;

/// Configuration for one or more harness invocations.
#[derive(Debug, Clone)]
pub struct HarnessOptions {
    notebooks_dir: PathBuf,
    timeout: Duration,
}

impl HarnessOptions {
    /// Create options for the given notebooks directory and execution
    /// timeout. The timeout bounds cumulative execution of all cells and
    /// must be greater than zero.
    pub fn new(notebooks_dir: impl Into<PathBuf>, timeout_seconds: u64) -> Result<Self> {
        if timeout_seconds == 0 {
            return Err(HarnessError::InvalidTimeout);
        }
        Ok(Self {
            notebooks_dir: notebooks_dir.into(),
            timeout: Duration::from_secs(timeout_seconds),
        })
    }

    pub fn notebooks_dir(&self) -> &PathBuf {
        &self.notebooks_dir
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub identifier: String,
    /// Number of code cells executed
    pub cells_executed: usize,
    /// Wall-clock time from the first cell to test-body completion
    pub execution_time: Duration,
    pub started_at: DateTime<Utc>,
    /// PID of the (now torn down) kernel process
    pub kernel_pid: Option<u32>,
}

/// Execute a notebook and run a test body against its final state.
///
/// The explicit composition of the whole lifecycle: resolve the
/// identifier, parse the document, launch a kernel, execute every code
/// cell in document order under the configured timeout, hand the test
/// body a [`NotebookClient`], and tear the kernel down. Teardown happens
/// on every exit path and never masks the original error.
///
/// Failure modes, in the order they can occur:
/// - [`HarnessError::InvalidIdentifier`] / [`HarnessError::NotFound`] /
///   [`HarnessError::DocumentParse`]: before any kernel is launched
/// - [`HarnessError::KernelBinaryNotFound`] / [`HarnessError::KernelSpawn`] /
///   [`HarnessError::KernelConnect`]: launch failures
/// - [`HarnessError::CellFailed`]: a cell raised; later cells never ran
/// - [`HarnessError::Timeout`]: cumulative execution exceeded the bound,
///   distinct from `CellFailed` so "too slow" is never mistaken for "wrong"
/// - [`HarnessError::Validation`]: the test body rejected the final state
pub async fn run_notebook_test<F, Fut>(
    options: &HarnessOptions,
    identifier: &str,
    test_body: F,
) -> Result<RunReport>
where
    F: FnOnce(NotebookClient) -> Fut,
    Fut: Future<Output = std::result::Result<(), ValidationError>>,
{
    let path = resolve_notebook(&options.notebooks_dir, identifier)?;
    let document = NotebookDocument::load(&path)?;

    info!(
        notebook = identifier,
        cells = document.cells.len(),
        timeout_secs = options.timeout.as_secs(),
        "executing notebook"
    );

    let started_at = Utc::now();

    let mut kernel = KernelProcess::spawn().await?;
    let kernel_pid = kernel.pid();

    let started = Instant::now();
    let result = drive_run(&kernel, &document, options.timeout, test_body).await;
    let execution_time = started.elapsed();

    // Unconditional teardown; the run's own error (if any) propagates below.
    kernel.shutdown().await;

    let cells_executed = result?;

    let report = RunReport {
        identifier: identifier.to_string(),
        cells_executed,
        execution_time,
        started_at,
        kernel_pid,
    };
    info!(
        notebook = identifier,
        cells = report.cells_executed,
        elapsed_ms = report.execution_time.as_millis() as u64,
        "notebook run succeeded"
    );
    Ok(report)
}

/// Execute the document and run the test body. Split out so the caller can
/// tear the kernel down regardless of where this fails.
async fn drive_run<F, Fut>(
    kernel: &KernelProcess,
    document: &NotebookDocument,
    limit: Duration,
    test_body: F,
) -> Result<usize>
where
    F: FnOnce(NotebookClient) -> Fut,
    Fut: Future<Output = std::result::Result<(), ValidationError>>,
{
    let executed = match timeout(limit, execute_document(kernel.client(), document)).await {
        Ok(result) => result?,
        Err(_) => {
            warn!(
                timeout_secs = limit.as_secs(),
                "notebook execution timed out"
            );
            return Err(HarnessError::Timeout { limit });
        }
    };

    let cells_executed = executed.len();
    let client = NotebookClient::new(kernel.client(), kernel.pid(), executed);
    test_body(client).await?;

    Ok(cells_executed)
}

/// Execute every code cell in document order, stopping at the first
/// failure. A failed cell aborts the run before any later cell is sent to
/// the kernel.
async fn execute_document(
    wire: Arc<Client>,
    document: &NotebookDocument,
) -> Result<Vec<ExecutedCell>> {
    let mut executed = Vec::new();

    for (index, cell) in document.code_cells() {
        debug!(cell = index, tag = cell.tag.as_deref(), "executing cell");

        let (mut events, response) = wire.execute_cell(index, cell.source.clone())?;

        // Relay live output into our log; the channel closes with the response.
        let relay = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let ServerEvent::Output { line, .. } = event;
                debug!(target: "cell", "{}", line);
            }
        });

        let response = response.await?;
        let _ = relay.await;

        match response {
            Response::CellDone(result) => {
                debug!(
                    cell = index,
                    lines = result.outputs.len(),
                    elapsed_ms = result.duration_ms,
                    "cell done"
                );
                executed.push(ExecutedCell {
                    index,
                    tag: cell.tag.clone(),
                    outputs: result.outputs,
                    duration_ms: result.duration_ms,
                    finished_at: result.finished_at,
                });
            }
            Response::CellFailed {
                index,
                message,
                traceback,
            } => {
                return Err(HarnessError::CellFailed {
                    index,
                    tag: cell.tag.clone(),
                    message,
                    traceback,
                });
            }
            Response::Error { message } => {
                return Err(HarnessError::Protocol(message));
            }
            other => {
                return Err(HarnessError::Protocol(format!(
                    "unexpected response to ExecuteCell: {:?}",
                    other
                )));
            }
        }
    }

    Ok(executed)
}

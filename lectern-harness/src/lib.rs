//! Notebook execution test harness.
//!
//! Given a notebook identifier and a timeout, the harness resolves the
//! notebook document, launches an isolated kernel process, executes every
//! code cell in document order, and hands a [`NotebookClient`] bound to
//! the kernel's final state to a test body. The kernel is torn down on
//! every exit path: success, resolution failure, cell failure, timeout,
//! or a panicking test body.
//!
//! The entry point is [`run_notebook_test`]:
//!
//! ```no_run
//! use lectern_harness::{run_notebook_test, HarnessOptions, ValidationError};
//!
//! # async fn demo() -> Result<(), lectern_harness::HarnessError> {
//! let options = HarnessOptions::new("tests/notebooks", 1800)?;
//! run_notebook_test(&options, "rectangles_packing_grid", |client| async move {
//!     if client.cells().is_empty() {
//!         return Err(ValidationError::new("notebook produced no cells"));
//!     }
//!     Ok(())
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod document;
pub mod errors;
pub mod harness;
pub mod kernel;
pub mod resolve;
pub mod validate;

pub use client::{ExecutedCell, NotebookClient};
pub use document::{Cell, CellKind, NotebookDocument};
pub use errors::HarnessError;
pub use harness::{run_notebook_test, HarnessOptions, RunReport};
pub use kernel::KernelProcess;
pub use resolve::{resolve_notebook, NOTEBOOK_EXT};
pub use validate::{run_validators, ValidationError, Validator};

//! The lectern kernel: an isolated execution environment for notebook cells.
//!
//! One kernel process hosts one Lua state for its whole lifetime. Cells are
//! Lua source chunks executed strictly in order; globals defined by one
//! cell are visible to every later cell. The harness talks to the kernel
//! over the `lectern-protocol` Unix socket and owns the process
//! exclusively; the kernel never outlives the invocation that spawned it.

pub mod errors;
pub mod evaluator;
pub mod session;

pub use errors::KernelError;
pub use evaluator::{CellEvaluator, CellOutcome};
pub use session::{spawn_session, SessionHandle};

//! Session actor owning the kernel's Lua state.
//!
//! `mlua::Lua` is not `Send`, so the evaluator lives on a dedicated OS
//! thread and async request handlers talk to it through a command channel.
//! Commands are served strictly one at a time: a cell finishes (including
//! any suspension inside it) before the next command is looked at, which
//! is exactly the sequential state-accumulation semantics notebooks need.
//!
//! ## Module Structure
//!
//! - `actor` - the actor loop and the `spawn_session` factory
//! - `command` - SessionCommand enum (all command variants)
//! - `handle` - SessionHandle (cheap-to-clone async interface)

mod actor;
mod command;
mod handle;

pub use actor::spawn_session;
pub use command::SessionCommand;
pub use handle::SessionHandle;

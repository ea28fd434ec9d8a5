//! Test utilities for the lectern workspace
//!
//! This crate provides helper functions and builders for testing notebook
//! execution, kernel lifecycle, timeout enforcement, and teardown
//! guarantees.

pub mod helpers;

pub use helpers::marker_files::MarkerFileHelper;
pub use helpers::notebook_builder::NotebookBuilder;
pub use helpers::wait_utils::{count_child_kernels, process_alive, wait_for_process_exit};

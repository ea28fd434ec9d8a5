//! Timeout enforcement: "too slow" is always distinct from "wrong"

use std::time::Instant;

use lectern_harness::{run_notebook_test, HarnessError, HarnessOptions};
use lectern_tests::helpers::notebook_builder::{raising_cell, sleeping_cell, NotebookBuilder};
use tempfile::TempDir;

#[tokio::test]
async fn slow_notebook_fails_with_timeout() {
    let dir = TempDir::new().unwrap();
    NotebookBuilder::new()
        .code(&sleeping_cell(10_000))
        .write_to(dir.path(), "slow")
        .unwrap();

    let options = HarnessOptions::new(dir.path(), 1).unwrap();
    let started = Instant::now();
    let err = run_notebook_test(&options, "slow", |_client| async move { Ok(()) })
        .await
        .unwrap_err();

    match err {
        HarnessError::Timeout { limit } => assert_eq!(limit.as_secs(), 1),
        other => panic!("Expected Timeout, got {:?}", other),
    }
    // Expiry cancels the in-flight execution instead of waiting it out
    assert!(
        started.elapsed().as_secs() < 8,
        "timeout did not cancel execution"
    );
}

#[tokio::test]
async fn timeout_applies_to_cumulative_execution() {
    let dir = TempDir::new().unwrap();
    // Each cell is comfortably under the limit; together they exceed it
    NotebookBuilder::new()
        .code(&sleeping_cell(700))
        .code(&sleeping_cell(700))
        .code(&sleeping_cell(700))
        .write_to(dir.path(), "cumulative")
        .unwrap();

    let options = HarnessOptions::new(dir.path(), 1).unwrap();
    let err = run_notebook_test(&options, "cumulative", |_client| async move { Ok(()) })
        .await
        .unwrap_err();
    assert!(matches!(err, HarnessError::Timeout { .. }));
}

#[tokio::test]
async fn timeout_wins_over_a_failure_it_never_reached() {
    let dir = TempDir::new().unwrap();
    // The raising cell sits behind a sleep longer than the limit, so the
    // run must report Timeout, never CellFailed.
    NotebookBuilder::new()
        .code(&sleeping_cell(10_000))
        .code(&raising_cell("unreachable"))
        .write_to(dir.path(), "slow_then_failing")
        .unwrap();

    let options = HarnessOptions::new(dir.path(), 1).unwrap();
    let err = run_notebook_test(&options, "slow_then_failing", |_client| async move { Ok(()) })
        .await
        .unwrap_err();
    assert!(matches!(err, HarnessError::Timeout { .. }));
}

#[tokio::test]
async fn fast_notebook_is_unaffected_by_the_timeout() {
    let dir = TempDir::new().unwrap();
    NotebookBuilder::new()
        .code(&sleeping_cell(50))
        .code("print('made it')")
        .write_to(dir.path(), "fast")
        .unwrap();

    let options = HarnessOptions::new(dir.path(), 30).unwrap();
    let report = run_notebook_test(&options, "fast", |_client| async move { Ok(()) })
        .await
        .unwrap();
    assert_eq!(report.cells_executed, 2);
}

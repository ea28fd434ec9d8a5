//! End-to-end execution of clean notebooks

use std::sync::{Arc, Mutex};

use lectern_harness::{run_notebook_test, HarnessOptions, ValidationError};
use lectern_tests::helpers::notebook_builder::NotebookBuilder;
use tempfile::TempDir;

fn ensure(cond: bool, msg: &str) -> Result<(), ValidationError> {
    if cond {
        Ok(())
    } else {
        Err(ValidationError::new(msg))
    }
}

#[tokio::test]
async fn clean_notebook_exposes_exactly_its_outputs() {
    let dir = TempDir::new().unwrap();
    NotebookBuilder::new()
        .code("print('starting')")
        .code("rows = 3\ncols = 4\nprint(rows * cols)")
        .write_to(dir.path(), "grid")
        .unwrap();

    let options = HarnessOptions::new(dir.path(), 30).unwrap();
    let report = run_notebook_test(&options, "grid", |client| async move {
        ensure(client.cells().len() == 2, "expected two executed cells")?;
        ensure(
            client.output_lines() == vec!["starting", "12"],
            "unexpected output",
        )?;
        Ok(())
    })
    .await
    .unwrap();

    assert_eq!(report.cells_executed, 2);
    assert_eq!(report.identifier, "grid");
    assert!(report.kernel_pid.is_some());
}

#[tokio::test]
async fn state_accumulates_in_document_order() {
    let dir = TempDir::new().unwrap();
    NotebookBuilder::new()
        .code("placed = {}")
        .code("placed[#placed + 1] = 'a'")
        .code("placed[#placed + 1] = 'b'")
        .code("print(#placed)")
        .write_to(dir.path(), "accumulate")
        .unwrap();

    let options = HarnessOptions::new(dir.path(), 30).unwrap();
    run_notebook_test(&options, "accumulate", |client| async move {
        ensure(client.output_lines() == vec!["2"], "later cells must see earlier state")?;
        let placed = client.value("placed").await.map_err(|e| {
            ValidationError::new(format!("inspect failed: {}", e))
        })?;
        ensure(
            placed == Some(serde_json::json!(["a", "b"])),
            "final state mismatch",
        )?;
        Ok(())
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn markdown_cells_are_skipped() {
    let dir = TempDir::new().unwrap();
    NotebookBuilder::new()
        .markdown("# Rectangle packing")
        .code("print('only me')")
        .markdown("closing notes")
        .write_to(dir.path(), "mixed")
        .unwrap();

    let options = HarnessOptions::new(dir.path(), 30).unwrap();
    let report = run_notebook_test(&options, "mixed", |client| async move {
        ensure(client.cells().len() == 1, "only the code cell executes")?;
        // The executed cell keeps its document position, after the markdown cell
        ensure(client.cell(1).is_some(), "cell keeps document index")?;
        ensure(client.cell(0).is_none(), "markdown cell has no record")?;
        Ok(())
    })
    .await
    .unwrap();

    assert_eq!(report.cells_executed, 1);
}

#[tokio::test]
async fn empty_notebook_succeeds() {
    let dir = TempDir::new().unwrap();
    NotebookBuilder::new().write_to(dir.path(), "empty").unwrap();

    let options = HarnessOptions::new(dir.path(), 30).unwrap();
    let report = run_notebook_test(&options, "empty", |client| async move {
        ensure(client.cells().is_empty(), "no cells expected")?;
        Ok(())
    })
    .await
    .unwrap();

    assert_eq!(report.cells_executed, 0);
}

#[tokio::test]
async fn two_runs_produce_identical_outputs() {
    let dir = TempDir::new().unwrap();
    NotebookBuilder::new()
        .code("t = {}\nfor i = 1, 5 do t[i] = i * i end")
        .code("for _, v in ipairs(t) do print(v) end")
        .write_to(dir.path(), "deterministic")
        .unwrap();

    let options = HarnessOptions::new(dir.path(), 30).unwrap();

    let mut observed: Vec<Vec<String>> = Vec::new();
    for _ in 0..2 {
        let collected = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&collected);
        run_notebook_test(&options, "deterministic", |client| async move {
            let lines: Vec<String> = client
                .output_lines()
                .into_iter()
                .map(String::from)
                .collect();
            sink.lock().unwrap().extend(lines);
            Ok(())
        })
        .await
        .unwrap();
        observed.push(Arc::try_unwrap(collected).unwrap().into_inner().unwrap());
    }

    assert_eq!(observed[0], observed[1]);
    assert_eq!(observed[0], vec!["1", "4", "9", "16", "25"]);
}

#[tokio::test]
async fn each_run_gets_a_fresh_kernel() {
    let dir = TempDir::new().unwrap();
    NotebookBuilder::new()
        .code("leaked = (leaked or 0) + 1\nprint(leaked)")
        .write_to(dir.path(), "fresh")
        .unwrap();

    let options = HarnessOptions::new(dir.path(), 30).unwrap();
    for _ in 0..2 {
        run_notebook_test(&options, "fresh", |client| async move {
            // Were kernel state shared between runs, the counter would climb
            ensure(client.output_lines() == vec!["1"], "kernel state leaked between runs")?;
            Ok(())
        })
        .await
        .unwrap();
    }
}

use super::*;

#[test]
fn print_output_is_captured() {
    let eval = CellEvaluator::new().unwrap();

    let outcome = eval
        .execute_cell(0, r#"print("hello", "world")"#, None)
        .unwrap();
    assert_eq!(outcome.outputs, vec!["hello\tworld"]);
}

#[test]
fn io_write_assembles_lines() {
    let eval = CellEvaluator::new().unwrap();

    let outcome = eval
        .execute_cell(0, r#"io.write("a"); io.write("b\nc")"#, None)
        .unwrap();
    // "ab" completed by the embedded newline, "c" flushed at cell end
    assert_eq!(outcome.outputs, vec!["ab", "c"]);
}

#[test]
fn state_persists_across_cells() {
    let eval = CellEvaluator::new().unwrap();

    eval.execute_cell(0, "counter = 10", None).unwrap();
    let outcome = eval
        .execute_cell(1, "counter = counter + 5\nprint(counter)", None)
        .unwrap();
    assert_eq!(outcome.outputs, vec!["15"]);
}

#[test]
fn failing_cell_reports_index_and_message() {
    let eval = CellEvaluator::new().unwrap();

    let err = eval
        .execute_cell(3, "error('grid overflow')", None)
        .unwrap_err();
    match err {
        KernelError::Cell { index, message, .. } => {
            assert_eq!(index, 3);
            assert!(message.contains("grid overflow"), "message: {}", message);
            assert!(message.contains("cell[3]"), "message: {}", message);
        }
        other => panic!("Expected Cell error, got {:?}", other),
    }
}

#[test]
fn output_before_failure_is_discarded_from_outcome() {
    let eval = CellEvaluator::new().unwrap();

    // The failed cell produces no outcome at all; a later cell starts with
    // a clean sink.
    let _ = eval
        .execute_cell(0, "print('before'); error('boom')", None)
        .unwrap_err();
    let outcome = eval.execute_cell(1, "print('after')", None).unwrap();
    assert_eq!(outcome.outputs, vec!["after"]);
}

#[test]
fn inspect_returns_json_for_defined_globals() {
    let eval = CellEvaluator::new().unwrap();

    eval.execute_cell(0, "rows = 4", None).unwrap();
    eval.execute_cell(1, r#"label = "packed""#, None).unwrap();
    eval.execute_cell(2, "grid = {1, 2, 3}", None).unwrap();

    assert_eq!(eval.inspect("rows").unwrap(), Some("4".to_string()));
    assert_eq!(
        eval.inspect("label").unwrap(),
        Some("\"packed\"".to_string())
    );
    assert_eq!(eval.inspect("grid").unwrap(), Some("[1,2,3]".to_string()));
}

#[test]
fn inspect_missing_global_returns_none() {
    let eval = CellEvaluator::new().unwrap();
    assert_eq!(eval.inspect("nothing_here").unwrap(), None);
}

#[test]
fn inspect_function_fails_to_serialize() {
    let eval = CellEvaluator::new().unwrap();

    eval.execute_cell(0, "f = function() end", None).unwrap();
    let err = eval.inspect("f").unwrap_err();
    assert!(matches!(err, KernelError::Serialize { .. }));
}

#[test]
fn user_globals_excludes_baseline() {
    let eval = CellEvaluator::new().unwrap();

    assert!(eval.user_globals().unwrap().is_empty());

    eval.execute_cell(0, "width = 8\nheight = 6", None).unwrap();
    let names = eval.user_globals().unwrap();
    assert_eq!(names, vec!["height", "width"]);
}

#[test]
fn emit_hook_is_not_reachable_from_cells() {
    let eval = CellEvaluator::new().unwrap();

    let outcome = eval
        .execute_cell(0, "print(__emit == nil)", None)
        .unwrap();
    assert_eq!(outcome.outputs, vec!["true"]);
}

#[test]
fn output_streams_while_cell_runs() {
    let eval = CellEvaluator::new().unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let outcome = eval
        .execute_cell(0, "print('one'); print('two')", Some(tx))
        .unwrap();

    let mut streamed = Vec::new();
    while let Ok(line) = rx.try_recv() {
        streamed.push(line);
    }
    assert_eq!(streamed, outcome.outputs);
    assert_eq!(streamed, vec!["one", "two"]);
}

#[test]
fn duration_is_measured() {
    let eval = CellEvaluator::new().unwrap();

    let outcome = eval.execute_cell(0, "sleep_ms(30)", None).unwrap();
    assert!(outcome.duration_ms >= 25, "duration: {}", outcome.duration_ms);
}

#[test]
fn syntax_error_is_a_cell_failure() {
    let eval = CellEvaluator::new().unwrap();

    let err = eval.execute_cell(2, "this is not lua", None).unwrap_err();
    assert!(matches!(err, KernelError::Cell { index: 2, .. }));
}

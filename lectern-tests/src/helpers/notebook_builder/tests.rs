use super::*;
use lectern_harness::CellKind;

#[test]
fn builder_preserves_cell_order_and_tags() {
    let document = NotebookBuilder::new()
        .markdown("# Title")
        .code("a = 1")
        .code_tagged("check", "print(a)")
        .build();

    assert_eq!(document.cells.len(), 3);
    assert_eq!(document.cells[0].kind, CellKind::Markdown);
    assert_eq!(document.cells[1].source, "a = 1");
    assert_eq!(document.cells[2].tag.as_deref(), Some("check"));
}

#[test]
fn write_to_produces_a_loadable_document() {
    let tmp = tempfile::tempdir().unwrap();
    let path = NotebookBuilder::new()
        .code("x = 1")
        .write_to(tmp.path(), "sample")
        .unwrap();

    assert!(path.ends_with("sample.nb.json"));
    let document = NotebookDocument::load(&path).unwrap();
    assert_eq!(document.cells.len(), 1);
}

#[test]
fn cell_source_helpers() {
    assert_eq!(sleeping_cell(250), "sleep_ms(250)");
    assert_eq!(raising_cell("boom"), "error('boom')");
}

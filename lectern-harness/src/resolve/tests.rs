use super::*;

fn notebooks_dir() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join("packing.nb.json"),
        r#"{"cells": []}"#,
    )
    .unwrap();
    tmp
}

#[test]
fn resolves_existing_notebook() {
    let dir = notebooks_dir();
    let path = resolve_notebook(dir.path(), "packing").unwrap();
    assert_eq!(path, dir.path().join("packing.nb.json"));
}

#[test]
fn missing_notebook_is_not_found() {
    let dir = notebooks_dir();
    let err = resolve_notebook(dir.path(), "absent").unwrap_err();
    match err {
        HarnessError::NotFound { identifier, path } => {
            assert_eq!(identifier, "absent");
            assert_eq!(path, dir.path().join("absent.nb.json"));
        }
        other => panic!("Expected NotFound, got {:?}", other),
    }
}

#[test]
fn rejects_path_separators() {
    let dir = notebooks_dir();
    for bad in ["../packing", "sub/packing", "sub\\packing", "a..b", ""] {
        let err = resolve_notebook(dir.path(), bad).unwrap_err();
        assert!(
            matches!(err, HarnessError::InvalidIdentifier(_)),
            "identifier {:?} should be rejected",
            bad
        );
    }
}

#[test]
fn directory_with_matching_name_is_not_found() {
    let dir = notebooks_dir();
    std::fs::create_dir(dir.path().join("subdir.nb.json")).unwrap();
    let err = resolve_notebook(dir.path(), "subdir").unwrap_err();
    assert!(matches!(err, HarnessError::NotFound { .. }));
}

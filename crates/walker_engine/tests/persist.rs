use std::fs;

use tempfile::TempDir;
use walker_engine::{ensure_output_dir, AtomicFileWriter};

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("state").join("nested");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_checkpoint_in_place() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer
        .write("checkpoint.json", r#"{"page":1,"next_row_index":2}"#)
        .unwrap();
    assert_eq!(first.file_name().unwrap(), "checkpoint.json");

    let second = writer
        .write("checkpoint.json", r#"{"page":2,"next_row_index":0}"#)
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(
        fs::read_to_string(&second).unwrap(),
        r#"{"page":2,"next_row_index":0}"#
    );

    // Only the target remains; temp files are renamed away.
    let entries = fs::read_dir(temp.path()).unwrap().count();
    assert_eq!(entries, 1);
}

#[test]
fn no_partial_file_when_dir_is_a_file() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write("checkpoint.json", "{}");
    assert!(result.is_err());
    assert!(!file_path.with_file_name("checkpoint.json").exists());
}

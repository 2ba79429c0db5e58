use std::fs;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use walker_core::{Category, Checkpoint, DetailItem, OutputRow};
use walker_engine::{CheckpointStore, OutputStore};

#[test]
fn missing_checkpoint_starts_at_first_row() {
    let temp = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp.path().join("checkpoint.json"));
    assert_eq!(store.load(), Checkpoint::new(1, 0));
}

#[test]
fn checkpoint_round_trips_as_json() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state").join("checkpoint.json");
    let store = CheckpointStore::new(&path);

    store.save(Checkpoint::new(4, 17)).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json, serde_json::json!({"page": 4, "next_row_index": 17}));
    assert_eq!(store.load(), Checkpoint::new(4, 17));
}

#[test]
fn corrupt_checkpoint_falls_back_to_default() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("checkpoint.json");
    fs::write(&path, "{\"page\": \"two\"").unwrap();
    assert_eq!(CheckpointStore::new(&path).load(), Checkpoint::default());
}

#[test]
fn page_zero_is_clamped_on_load() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("checkpoint.json");
    fs::write(&path, r#"{"page":0,"next_row_index":3}"#).unwrap();
    assert_eq!(CheckpointStore::new(&path).load(), Checkpoint::new(1, 3));
}

#[test]
fn header_written_once_and_rows_appended() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("out").join("cid10.csv");
    let store = OutputStore::new(&path);

    let cholera = OutputRow::for_category(&Category::new("A00", "Cholera"), &[]);
    let typhoid = OutputRow::for_category(
        &Category::new("A01", "Typhoid"),
        &[DetailItem::new("A01.1", "Paratyphoid A")],
    );
    store.append_rows(&cholera).unwrap();
    store.append_rows(&typhoid).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "category_code,category_description,detail_code,detail_description\n\
         A00,Cholera,,\n\
         A01,Typhoid,A01.1,Paratyphoid A\n"
    );
}

#[test]
fn processed_codes_come_from_first_column() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("cid10.csv");
    fs::write(
        &path,
        "category_code,category_description,detail_code,detail_description\r\n\
         A00,Cholera,,\r\n\
         A01,\"Typhoid, enteric\",A01.1,Paratyphoid A\r\n\
         A01,\"Typhoid, enteric\",A01.2,Paratyphoid B\r\n\
         ,orphan,,\r\n",
    )
    .unwrap();

    let processed = OutputStore::new(&path).load_processed_codes().unwrap();
    assert_eq!(processed.iter().collect::<Vec<_>>(), vec!["A00", "A01"]);
}

#[test]
fn missing_output_means_nothing_processed() {
    let temp = TempDir::new().unwrap();
    let processed = OutputStore::new(temp.path().join("absent.csv"))
        .load_processed_codes()
        .unwrap();
    assert!(processed.is_empty());
}

#[test]
fn unfinished_last_line_is_not_processed() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("cid10.csv");
    fs::write(
        &path,
        "category_code,category_description,detail_code,detail_description\nA00,Cholera,,\nA0",
    )
    .unwrap();

    let processed = OutputStore::new(&path).load_processed_codes().unwrap();
    assert_eq!(processed.iter().collect::<Vec<_>>(), vec!["A00"]);
}

#[test]
fn unterminated_tail_is_kept_on_its_own_line_and_stays_unprocessed() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("cid10.csv");
    fs::write(
        &path,
        "category_code,category_description,detail_code,detail_description\nA00,Chol",
    )
    .unwrap();

    let store = OutputStore::new(&path);
    assert!(store.load_processed_codes().unwrap().is_empty());

    store
        .append_rows(&OutputRow::for_category(&Category::new("A01", "Typhoid"), &[]))
        .unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.ends_with("A00,Chol\nA01,Typhoid,,\n"), "{text}");
    let processed = store.load_processed_codes().unwrap();
    assert!(!processed.contains("A00"));
    assert!(processed.contains("A01"));
}

#[test]
fn descriptions_with_separators_survive_reload() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("cid10.csv");
    let store = OutputStore::new(&path);
    store
        .append_rows(&OutputRow::for_category(
            &Category::new("B15", "Hepatite aguda A, \"viral\""),
            &[],
        ))
        .unwrap();

    let processed = store.load_processed_codes().unwrap();
    assert_eq!(processed.len(), 1);
    assert!(processed.contains("B15"));
}

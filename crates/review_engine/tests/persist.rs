use std::fs;

use review_engine::{ensure_output_dir, AtomicFileWriter};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("exports").join("nested");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn rewriting_an_export_replaces_it() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("reviews_shop.test.csv", b"first run").unwrap();
    assert_eq!(first.file_name().unwrap(), "reviews_shop.test.csv");
    assert_eq!(fs::read(&first).unwrap(), b"first run");

    let second = writer.write("reviews_shop.test.csv", b"second").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "second");
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn no_partial_file_when_the_directory_is_a_file() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("reviews_shop.test.json", b"[]").is_err());
    assert!(!file_path.with_file_name("reviews_shop.test.json").exists());
}

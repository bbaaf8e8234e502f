use std::fs;
use std::path::Path;

use gutenpub_engine::{ensure_output_dir, AtomicFileWriter, PersistError};
use tempfile::TempDir;

#[test]
fn creates_missing_cache_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("temp_images").join("nested");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn file_in_place_of_dir_is_reported() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let err = ensure_output_dir(&file_path).unwrap_err();
    assert!(matches!(err, PersistError::Dir { .. }));
}

#[test]
fn atomic_write_replaces_existing_bytes() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("output.html", b"<html>one</html>").unwrap();
    assert_eq!(first.file_name().unwrap(), "output.html");
    assert_eq!(fs::read(&first).unwrap(), b"<html>one</html>");

    let second = writer.write("output.html", &[0xff, 0x00, 0x10]).unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), vec![0xff, 0x00, 0x10]);
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("doc.html", b"data").is_err());
    assert!(!file_path.with_file_name("doc.html").exists());
}

#[test]
fn writer_for_target_splits_dir_and_name() {
    let (_, name) = AtomicFileWriter::for_target(Path::new("out/book.epub")).unwrap();
    assert_eq!(name, "book.epub");

    let temp = TempDir::new().unwrap();
    let target = temp.path().join("deep").join("output.html");
    let (writer, name) = AtomicFileWriter::for_target(&target).unwrap();
    assert_eq!(writer.write(&name, b"x").unwrap(), target);

    assert!(AtomicFileWriter::for_target(Path::new("/")).is_none());
}

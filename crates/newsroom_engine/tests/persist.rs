use std::fs;

use newsroom_core::{Language, PostMetadata};
use newsroom_engine::{ensure_output_dir, AtomicFileWriter, DocumentWriter};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write_str("doc.md", "hello").unwrap();
    assert_eq!(fs::read_to_string(&first).unwrap(), "hello");

    let second = writer.write_str("doc.md", "world").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "world");
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write_str("doc.md", "data").is_err());
    assert!(!file_path.with_file_name("doc.md").exists());
}

#[test]
fn names_with_separators_are_rejected() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());
    assert!(writer.write_str("../escape.md", "x").is_err());
    assert!(writer.write_str("", "x").is_err());
}

fn metadata(title: &str, source: &str) -> PostMetadata {
    PostMetadata {
        title: title.to_string(),
        date: "2024-05-01T12:00:00+02:00".to_string(),
        source: source.to_string(),
        ..PostMetadata::default()
    }
}

#[test]
fn document_writer_is_idempotent_per_language() {
    let temp = TempDir::new().unwrap();
    let writer = DocumentWriter::new(temp.path().join("content"));
    let meta = metadata("Team X wins", "https://a.test/1");

    let path = writer.write(Language::En, "team-x-wins", &meta, "Body.").unwrap();
    assert_eq!(path, temp.path().join("content/en/posts/team-x-wins.md"));
    let first = fs::read(&path).unwrap();

    writer.write(Language::En, "team-x-wins", &meta, "Body.").unwrap();
    assert_eq!(fs::read(&path).unwrap(), first);
    assert!(!writer.namespace_dir(Language::El).exists());
}

#[test]
fn existing_slugs_remember_their_source() {
    let temp = TempDir::new().unwrap();
    let writer = DocumentWriter::new(temp.path().join("content"));
    writer
        .write(Language::En, "a", &metadata("A", "https://a.test/a"), "x")
        .unwrap();
    writer
        .write(Language::El, "b", &metadata("B", ""), "y")
        .unwrap();
    fs::write(writer.namespace_dir(Language::En).join("notes.txt"), "ignored").unwrap();

    let mut slugs = writer.existing_slugs();
    slugs.sort();
    assert_eq!(
        slugs,
        vec![
            ("a".to_string(), Some("https://a.test/a".to_string())),
            ("b".to_string(), None),
        ]
    );
}

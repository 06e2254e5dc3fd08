mod common;

use bytes::Bytes;
use common::TestWorld;
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use strata::Error;

#[test]
fn staging_a_file_records_a_blob_entry() {
    let world = TestWorld::new();
    world.write_file("notes.txt", "remember this\n");

    world.stage(&["notes.txt"]);

    let status = world.repo.status().unwrap();
    assert_eq!(status.staged, vec![PathBuf::from("notes.txt")]);
    assert!(status.untracked.is_empty());
}

#[test]
fn staging_a_directory_stages_all_files_below_it() {
    let world = TestWorld::new();
    world.write_file("src/a.rs", "fn a() {}\n");
    world.write_file("src/nested/b.rs", "fn b() {}\n");
    world.write_file("outside.txt", "not staged\n");

    world.stage(&["src"]);

    let status = world.repo.status().unwrap();
    assert_eq!(
        status.staged,
        vec![PathBuf::from("src/a.rs"), PathBuf::from("src/nested/b.rs")]
    );
    assert_eq!(status.untracked, vec![PathBuf::from("outside.txt")]);
}

#[test]
fn restaging_a_path_overwrites_the_prior_entry() {
    let world = TestWorld::new();
    world.write_file("f.txt", "first\n");
    world.stage(&["f.txt"]);

    world.write_file("f.txt", "second\n");
    world.stage(&["f.txt"]);

    let commit = world.repo.commit("keep second", world.author()).unwrap();
    let content = world.repo.file_at(commit.as_ref(), Path::new("f.txt")).unwrap();
    assert_eq!(content, Bytes::from_static(b"second\n"));
}

#[test]
fn staging_bytes_directly_bypasses_the_working_tree() {
    let world = TestWorld::new();

    world
        .repo
        .stage_bytes(Path::new("virtual.txt"), Bytes::from_static(b"from memory"))
        .unwrap();

    let commit = world.repo.commit("virtual", world.author()).unwrap();
    let content = world
        .repo
        .file_at(commit.as_ref(), Path::new("virtual.txt"))
        .unwrap();
    assert_eq!(content, Bytes::from_static(b"from memory"));
    assert!(!world.file_exists("virtual.txt"));
}

#[test]
fn unstaging_removes_the_entry() {
    let world = TestWorld::new();
    world.write_file("a.txt", "a\n");
    world.write_file("b.txt", "b\n");
    world.stage(&["a.txt", "b.txt"]);

    world.repo.unstage(&[Path::new("a.txt")]).unwrap();

    let status = world.repo.status().unwrap();
    assert_eq!(status.staged, vec![PathBuf::from("b.txt")]);
    assert_eq!(status.untracked, vec![PathBuf::from("a.txt")]);
}

#[test]
fn unstaging_an_unstaged_path_fails() {
    let world = TestWorld::new();
    world.write_file("a.txt", "a\n");
    world.stage(&["a.txt"]);

    let result = world.repo.unstage(&[Path::new("never-staged.txt")]);
    assert!(matches!(
        result,
        Err(Error::NotStaged(path)) if path == PathBuf::from("never-staged.txt")
    ));
}

#[test]
fn unstaging_a_directory_removes_everything_below_it() {
    let world = TestWorld::new();
    world.write_file("src/a.rs", "a\n");
    world.write_file("src/b.rs", "b\n");
    world.stage(&["src"]);

    world.repo.unstage(&[Path::new("src")]).unwrap();

    let status = world.repo.status().unwrap();
    assert!(status.staged.is_empty());
}

#[test]
fn the_index_survives_a_reload() {
    let world = TestWorld::new();
    world.write_file("persisted.txt", "on disk\n");
    world.stage(&["persisted.txt"]);

    // a second repository value over the same directory sees the entry
    let reopened = strata::Repository::open(world.temp_dir.path()).unwrap();
    let status = reopened.status().unwrap();
    assert_eq!(status.staged, vec![PathBuf::from("persisted.txt")]);
}

#[test]
fn modified_files_are_reported_as_modified() {
    let world = TestWorld::new();
    world.write_file("f.txt", "staged content\n");
    world.stage(&["f.txt"]);

    world.write_file("f.txt", "drifted content\n");

    let status = world.repo.status().unwrap();
    assert_eq!(status.modified, vec![PathBuf::from("f.txt")]);
    assert!(status.staged.is_empty());
    assert!(!status.is_clean());
}

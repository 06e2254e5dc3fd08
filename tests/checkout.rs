mod common;

use common::TestWorld;
use pretty_assertions::assert_eq;
use strata::Error;

#[test]
fn switching_branches_materializes_the_other_snapshot() {
    let world = TestWorld::new();
    world.commit_files(&[("shared.txt", "base\n")], "base");
    world.repo.create_branch("feature", None).unwrap();

    world.commit_files(&[("main-only.txt", "on main\n")], "advance main");

    world.repo.checkout("feature").unwrap();

    assert!(!world.file_exists("main-only.txt"));
    assert_eq!(world.read_file("shared.txt"), "base\n");

    world.repo.checkout("main").unwrap();
    assert_eq!(world.read_file("main-only.txt"), "on main\n");
}

#[test]
fn checkout_with_staged_changes_against_a_different_tree_fails() {
    let world = TestWorld::new();
    world.commit_files(&[("a.txt", "base\n")], "base");
    world.repo.create_branch("feature", None).unwrap();
    world.commit_files(&[("a.txt", "moved on\n")], "advance");

    world.write_file("pending.txt", "not committed\n");
    world.stage(&["pending.txt"]);

    let result = world.repo.checkout("feature");
    assert!(matches!(
        result,
        Err(Error::UncommittedChanges { target }) if target == "feature"
    ));

    // the guard fires before anything moves
    assert_eq!(world.read_file("a.txt"), "moved on\n");
}

#[test]
fn checkout_with_staged_changes_onto_the_same_tree_succeeds() {
    let world = TestWorld::new();
    let commit = world.commit_files(&[("a.txt", "base\n")], "base");
    world.repo.create_branch("twin", None).unwrap();

    world.write_file("pending.txt", "staged but safe\n");
    world.stage(&["pending.txt"]);

    // twin points at the same tree, so nothing can be lost
    world.repo.checkout("twin").unwrap();
    assert_eq!(world.repo.resolve("HEAD").unwrap(), commit);
}

#[test]
fn checking_out_a_bare_commit_id_detaches_head() {
    let world = TestWorld::new();
    let first = world.commit_files(&[("a.txt", "1\n")], "one");
    world.commit_files(&[("a.txt", "2\n")], "two");

    world.repo.checkout(first.as_ref()).unwrap();

    assert_eq!(world.repo.refs().current_branch().unwrap(), None);
    assert_eq!(world.repo.resolve("HEAD").unwrap(), first);
    assert_eq!(world.read_file("a.txt"), "1\n");
}

#[test]
fn checking_out_a_branch_tip_by_id_stays_attached() {
    let world = TestWorld::new();
    world.commit_files(&[("a.txt", "1\n")], "one");
    let tip = world.commit_files(&[("a.txt", "2\n")], "two");

    world.repo.checkout(tip.as_ref()).unwrap();

    let current = world.repo.refs().current_branch().unwrap();
    assert_eq!(current.map(|name| name.to_string()), Some("main".to_string()));
}

#[test]
fn commits_on_a_detached_head_advance_head_directly() {
    let world = TestWorld::new();
    let first = world.commit_files(&[("a.txt", "1\n")], "one");
    let main_tip = world.commit_files(&[("a.txt", "2\n")], "two");

    world.repo.checkout(first.as_ref()).unwrap();
    let detached = world.commit_files(&[("a.txt", "detached\n")], "off-branch");

    assert_eq!(world.repo.resolve("HEAD").unwrap(), detached);
    // the branch did not move
    assert_eq!(world.repo.resolve("main").unwrap(), main_tip);
}

#[test]
fn checkout_removes_files_absent_from_the_target() {
    let world = TestWorld::new();
    world.commit_files(&[("keep.txt", "kept\n")], "base");
    world.repo.create_branch("lean", None).unwrap();
    world.commit_files(&[("extra/nested/file.txt", "bulk\n")], "fatten");

    world.repo.checkout("lean").unwrap();

    assert!(!world.file_exists("extra/nested/file.txt"));
    assert!(!world.file_exists("extra"));
    assert_eq!(world.read_file("keep.txt"), "kept\n");
}

#[test]
fn checkout_tree_materializes_the_full_snapshot() {
    let world = TestWorld::new();
    let commit = world.commit_files(
        &[("a.txt", "alpha\n"), ("dir/b.txt", "beta\n")],
        "snapshot",
    );

    let files = world.repo.checkout_tree(&commit).unwrap();

    let paths: Vec<_> = files.keys().cloned().collect();
    assert_eq!(
        paths,
        vec![
            std::path::PathBuf::from("a.txt"),
            std::path::PathBuf::from("dir/b.txt")
        ]
    );
    assert_eq!(files[&std::path::PathBuf::from("a.txt")].as_ref(), b"alpha\n");
}

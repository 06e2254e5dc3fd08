mod common;

use common::TestWorld;
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use strata::artifacts::merge::MergeOutcome;
use strata::artifacts::objects::object::Object;

#[test]
fn linear_history_lists_newest_first() {
    let world = TestWorld::new();
    world.commit_files_at(&[("a.txt", "1\n")], "one", "2024-01-01T10:00:00Z");
    world.commit_files_at(&[("a.txt", "2\n")], "two", "2024-01-02T10:00:00Z");
    world.commit_files_at(&[("a.txt", "3\n")], "three", "2024-01-03T10:00:00Z");

    let messages: Vec<String> = world
        .repo
        .log("HEAD")
        .unwrap()
        .map(|commit| commit.short_message())
        .collect();

    assert_eq!(messages, vec!["three", "two", "one"]);
}

#[test]
fn log_from_an_older_revision_sees_only_its_ancestors() {
    let world = TestWorld::new();
    world.commit_files_at(&[("a.txt", "1\n")], "one", "2024-01-01T10:00:00Z");
    world.commit_files_at(&[("a.txt", "2\n")], "two", "2024-01-02T10:00:00Z");
    world.commit_files_at(&[("a.txt", "3\n")], "three", "2024-01-03T10:00:00Z");

    let messages: Vec<String> = world
        .repo
        .log("HEAD^")
        .unwrap()
        .map(|commit| commit.short_message())
        .collect();

    assert_eq!(messages, vec!["two", "one"]);
}

#[test]
fn each_log_call_restarts_the_traversal() {
    let world = TestWorld::new();
    world.commit_files_at(&[("a.txt", "1\n")], "one", "2024-01-01T10:00:00Z");
    world.commit_files_at(&[("a.txt", "2\n")], "two", "2024-01-02T10:00:00Z");

    let first: Vec<String> = world
        .repo
        .log("HEAD")
        .unwrap()
        .map(|commit| commit.short_message())
        .collect();
    let second: Vec<String> = world
        .repo
        .log("HEAD")
        .unwrap()
        .map(|commit| commit.short_message())
        .collect();

    assert_eq!(first, second);
}

#[test]
fn merge_history_interleaves_both_sides_by_timestamp() {
    let world = TestWorld::new();
    world.commit_files_at(&[("base.txt", "base\n")], "base", "2024-01-01T10:00:00Z");
    world.repo.create_branch("side", None).unwrap();

    world.commit_files_at(&[("main.txt", "m\n")], "on-main", "2024-01-02T10:00:00Z");

    world.repo.checkout("side").unwrap();
    world.commit_files_at(&[("side.txt", "s\n")], "on-side", "2024-01-03T10:00:00Z");

    world.repo.checkout("main").unwrap();
    let outcome = world
        .repo
        .merge("side", world.author_at("2024-01-04T10:00:00Z"), "join")
        .unwrap();
    assert!(matches!(outcome, MergeOutcome::Merged(_)));

    let messages: Vec<String> = world
        .repo
        .log("HEAD")
        .unwrap()
        .map(|commit| commit.short_message())
        .collect();

    assert_eq!(messages, vec!["join", "on-side", "on-main", "base"]);
}

#[test]
fn diamond_histories_yield_each_commit_once() {
    let world = TestWorld::new();
    world.commit_files_at(&[("base.txt", "base\n")], "base", "2024-01-01T10:00:00Z");
    world.repo.create_branch("side", None).unwrap();
    world.commit_files_at(&[("main.txt", "m\n")], "on-main", "2024-01-02T10:00:00Z");
    world.repo.checkout("side").unwrap();
    world.commit_files_at(&[("side.txt", "s\n")], "on-side", "2024-01-03T10:00:00Z");
    world.repo.checkout("main").unwrap();
    world
        .repo
        .merge("side", world.author_at("2024-01-04T10:00:00Z"), "join")
        .unwrap();

    let oids: Vec<String> = world
        .repo
        .log("HEAD")
        .unwrap()
        .map(|commit| commit.object_id().unwrap().to_string())
        .collect();

    let unique: HashSet<&String> = oids.iter().collect();
    assert_eq!(unique.len(), oids.len());
    assert_eq!(oids.len(), 4);
}

#[test]
fn no_commit_appears_in_its_own_ancestry() {
    let world = TestWorld::new();
    world.commit_files_at(&[("a.txt", "1\n")], "one", "2024-01-01T10:00:00Z");
    world.commit_files_at(&[("a.txt", "2\n")], "two", "2024-01-02T10:00:00Z");
    world.commit_files_at(&[("a.txt", "3\n")], "three", "2024-01-03T10:00:00Z");

    for commit in world.repo.log("HEAD").unwrap() {
        let oid = commit.object_id().unwrap();
        let ancestors: Vec<_> = world
            .repo
            .log(oid.as_ref())
            .unwrap()
            .skip(1) // the commit itself leads its own traversal
            .map(|ancestor| ancestor.object_id().unwrap())
            .collect();
        assert!(!ancestors.contains(&oid));
    }
}

#[test]
fn log_of_an_unknown_revision_fails() {
    let world = TestWorld::new();
    world.commit_files(&[("a.txt", "a\n")], "one");

    assert!(world.repo.log("no-such-branch").is_err());
}

#![allow(dead_code)] // not every suite exercises every helper

use assert_fs::TempDir;
use fake::Fake;
use fake::faker::internet::en::FreeEmail;
use fake::faker::lorem::en::Words;
use fake::faker::name::en::Name;
use strata::Repository;
use strata::artifacts::objects::commit::Author;
use strata::artifacts::objects::object_id::ObjectId;
use std::path::Path;

/// Shared world state for integration tests: a fresh repository in a
/// temporary directory plus helpers for the common stage/commit motions.
pub struct TestWorld {
    pub temp_dir: TempDir,
    pub repo: Repository,
}

impl TestWorld {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let repo = Repository::init(temp_dir.path()).expect("failed to init repository");
        TestWorld { temp_dir, repo }
    }

    pub fn author(&self) -> Author {
        Author::new(
            Name().fake::<String>(),
            FreeEmail().fake::<String>(),
        )
    }

    /// An author with an explicit timestamp, for tests that depend on
    /// commit ordering.
    pub fn author_at(&self, rfc3339: &str) -> Author {
        Author::new_with_timestamp(
            Name().fake::<String>(),
            FreeEmail().fake::<String>(),
            chrono::DateTime::parse_from_rfc3339(rfc3339).expect("bad timestamp"),
        )
    }

    pub fn random_message(&self) -> String {
        Words(3..7).fake::<Vec<String>>().join(" ")
    }

    pub fn write_file(&self, name: &str, content: &str) {
        let path = self.repo.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent directories");
        }
        std::fs::write(path, content).expect("failed to write file");
    }

    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.repo.path().join(name)).expect("failed to read file")
    }

    pub fn file_exists(&self, name: &str) -> bool {
        self.repo.path().join(name).exists()
    }

    pub fn stage(&self, names: &[&str]) {
        self.repo
            .stage(&names.iter().map(Path::new).collect::<Vec<_>>())
            .expect("failed to stage files");
    }

    /// Write, stage, and commit a set of files in one motion.
    pub fn commit_files(&self, files: &[(&str, &str)], message: &str) -> ObjectId {
        for (name, content) in files {
            self.write_file(name, content);
        }
        self.stage(&files.iter().map(|(name, _)| *name).collect::<Vec<_>>());
        self.repo
            .commit(message, self.author())
            .expect("failed to commit")
    }

    /// Same, but with a fixed commit timestamp.
    pub fn commit_files_at(
        &self,
        files: &[(&str, &str)],
        message: &str,
        rfc3339: &str,
    ) -> ObjectId {
        for (name, content) in files {
            self.write_file(name, content);
        }
        self.stage(&files.iter().map(|(name, _)| *name).collect::<Vec<_>>());
        self.repo
            .commit(message, self.author_at(rfc3339))
            .expect("failed to commit")
    }
}

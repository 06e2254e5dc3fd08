//! Failure kinds crossing the engine boundary.
//!
//! Every operation on the repository and its engines fails with exactly one
//! of these kinds, carrying the offending path, ref, or object id. Internal
//! faults (I/O, malformed on-disk data) are translated into [`Error::Storage`]
//! at the component that observed them; nothing rawer escapes.

use crate::artifacts::merge::Conflict;
use crate::artifacts::objects::object_id::ObjectId;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// An object id that should be present in the store is not.
    #[error("object {0} not found")]
    NotFound(ObjectId),

    /// The named branch does not exist.
    #[error("branch '{0}' does not exist")]
    NoSuchBranch(String),

    /// A branch with this name already exists.
    #[error("a branch named '{0}' already exists")]
    BranchExists(String),

    /// The given revision does not identify an existing commit.
    #[error("'{0}' does not name a commit")]
    NoSuchCommit(String),

    /// A ref, revision expression, or abbreviated id could not be resolved.
    #[error("'{0}' cannot be resolved to a commit")]
    UnresolvedRef(String),

    /// The path has no entry in the staging index.
    #[error("'{}' is not staged", .0.display())]
    NotStaged(PathBuf),

    /// Nothing is staged, or the snapshot equals the sole parent's tree.
    #[error("nothing to commit")]
    EmptyCommit,

    /// Staged changes would be lost by moving HEAD to a different tree.
    #[error("staged changes would be overwritten by checking out '{target}'")]
    UncommittedChanges { target: String },

    /// The path does not exist in the named snapshot.
    #[error("'{}' does not exist in '{rev}'", .path.display())]
    PathNotFound { rev: String, path: PathBuf },

    /// Both sides changed the same paths in different ways.
    #[error("automatic merge failed: {} conflicting path(s)", .conflicts.len())]
    MergeConflict { conflicts: Vec<Conflict> },

    /// An underlying storage fault (I/O, corrupt object, bad index file).
    #[error("storage fault: {0}")]
    Storage(String),
}

impl Error {
    pub fn storage(detail: impl std::fmt::Display) -> Self {
        Error::Storage(detail.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

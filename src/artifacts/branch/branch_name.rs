//! Validated branch names.
//!
//! Names may be hierarchical (`feature/login`). Rejected: empty names,
//! leading `.` or `/`, trailing `/` or `.lock`, `..`, `@{`, control
//! characters, and the glob/ref metacharacters `*:?[\^~`.

use crate::artifacts::branch::INVALID_BRANCH_NAME_REGEX;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BranchName(String);

/// Name under which the current-branch pointer is stored.
pub const HEAD: &str = "HEAD";

impl BranchName {
    pub fn try_parse(name: String) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::UnresolvedRef(name));
        }
        if regex::Regex::new(INVALID_BRANCH_NAME_REGEX)?.is_match(&name) {
            return Err(Error::UnresolvedRef(name));
        }

        Ok(BranchName(name))
    }

    /// Whether this name is the symbolic HEAD pointer rather than a branch.
    pub fn is_head(&self) -> bool {
        self.0 == HEAD
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

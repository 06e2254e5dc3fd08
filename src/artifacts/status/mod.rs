//! Working-tree status classification.
//!
//! Compares the files present in the working tree against the staging
//! index: a tracked file whose content hash still matches its entry is
//! `staged`, one that diverged is `modified`, and a file with no entry at
//! all is `untracked`.

use std::path::PathBuf;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Tracked paths whose working-tree content matches the staged blob
    pub staged: Vec<PathBuf>,
    /// Tracked paths whose working-tree content diverged since staging
    pub modified: Vec<PathBuf>,
    /// Working-tree paths with no staging entry
    pub untracked: Vec<PathBuf>,
}

impl StatusReport {
    pub fn is_clean(&self) -> bool {
        self.modified.is_empty() && self.untracked.is_empty()
    }
}

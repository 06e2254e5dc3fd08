//! Three-way classification of two change sets against a common base.
//!
//! Both sides are expressed as tree-level change sets relative to the merge
//! base. Per path:
//!
//! - unchanged on both sides: the base version carries over
//! - changed on one side: that side's version wins
//! - changed identically on both sides: either version (they are equal)
//! - changed differently on both sides: a [`Conflict`]
//!
//! The classification is pure; applying the resolutions and writing the
//! merged tree is the repository's job, and only happens when the conflict
//! set is empty.

use crate::artifacts::diff::tree_diff::ChangeSet;
use crate::artifacts::merge::Conflict;
use crate::artifacts::objects::tree::TreeEntry;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Winning version per touched path; `None` means the path is deleted.
pub type Resolutions = BTreeMap<PathBuf, Option<TreeEntry>>;

pub fn classify(ours: &ChangeSet, theirs: &ChangeSet) -> (Resolutions, Vec<Conflict>) {
    let paths: BTreeSet<&PathBuf> = ours.keys().chain(theirs.keys()).collect();

    let mut resolutions = Resolutions::new();
    let mut conflicts = Vec::new();

    for path in paths {
        match (ours.get(path), theirs.get(path)) {
            (Some(our_change), None) => {
                resolutions.insert(path.clone(), our_change.new_entry().cloned());
            }
            (None, Some(their_change)) => {
                resolutions.insert(path.clone(), their_change.new_entry().cloned());
            }
            (Some(our_change), Some(their_change)) => {
                if our_change.new_entry() == their_change.new_entry() {
                    resolutions.insert(path.clone(), our_change.new_entry().cloned());
                } else {
                    conflicts.push(Conflict {
                        path: path.clone(),
                        base: our_change.old_entry().map(|entry| entry.oid.clone()),
                        ours: our_change.new_entry().map(|entry| entry.oid.clone()),
                        theirs: their_change.new_entry().map(|entry| entry.oid.clone()),
                    });
                }
            }
            (None, None) => unreachable!("path came from one of the two change sets"),
        }
    }

    (resolutions, conflicts)
}

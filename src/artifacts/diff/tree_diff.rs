//! Path-level diff between two stored snapshots.
//!
//! Walks two trees side by side, descending only into subtrees whose ids
//! differ, and records every blob-level change as added, deleted, or
//! modified. Paths present on both sides with differing blob ids are
//! `Modified`; a renamed file always shows up as `Deleted` plus `Added`.

use crate::areas::database::Database;
use crate::artifacts::objects::object::ObjectBox;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::{Tree, TreeEntry};
use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeChange {
    Added(TreeEntry),
    Deleted(TreeEntry),
    Modified { old: TreeEntry, new: TreeEntry },
}

impl TreeChange {
    pub fn from_entries(old: Option<TreeEntry>, new: Option<TreeEntry>) -> Option<Self> {
        match (old, new) {
            (None, Some(new)) => Some(TreeChange::Added(new)),
            (Some(old), None) => Some(TreeChange::Deleted(old)),
            (Some(old), Some(new)) if old != new => Some(TreeChange::Modified { old, new }),
            _ => None,
        }
    }

    pub fn old_entry(&self) -> Option<&TreeEntry> {
        match self {
            TreeChange::Deleted(entry) => Some(entry),
            TreeChange::Modified { old, .. } => Some(old),
            TreeChange::Added(_) => None,
        }
    }

    pub fn new_entry(&self) -> Option<&TreeEntry> {
        match self {
            TreeChange::Added(entry) => Some(entry),
            TreeChange::Modified { new, .. } => Some(new),
            TreeChange::Deleted(_) => None,
        }
    }
}

/// All blob-level changes between two snapshots, keyed by full path.
pub type ChangeSet = BTreeMap<PathBuf, TreeChange>;

type TreeEntryMap = BTreeMap<String, TreeEntry>;

#[derive(Debug)]
pub struct TreeDiff<'r> {
    database: &'r Database,
    change_set: ChangeSet,
}

impl<'r> TreeDiff<'r> {
    pub fn new(database: &'r Database) -> Self {
        TreeDiff {
            database,
            change_set: BTreeMap::new(),
        }
    }

    pub fn into_changes(self) -> ChangeSet {
        self.change_set
    }

    /// Compare two snapshots given by tree or commit ids. `None` stands for
    /// the empty snapshot.
    pub fn compare_oids(
        &mut self,
        old: Option<&ObjectId>,
        new: Option<&ObjectId>,
        prefix: &Path,
    ) -> Result<()> {
        if old == new {
            return Ok(());
        }

        let old_entries = self.tree_entries_of(old)?;
        let new_entries = self.tree_entries_of(new)?;

        self.compare_entries(&old_entries, &new_entries, prefix)
    }

    fn compare_entries(
        &mut self,
        old: &TreeEntryMap,
        new: &TreeEntryMap,
        prefix: &Path,
    ) -> Result<()> {
        let names: BTreeSet<&String> = old.keys().chain(new.keys()).collect();

        for name in names {
            let path = prefix.join(name);
            let (before, after) = (old.get(name), new.get(name));
            if before == after {
                continue;
            }

            // recurse into whichever side is a subtree
            let subtree_old = before.filter(|entry| entry.is_tree()).map(|entry| &entry.oid);
            let subtree_new = after.filter(|entry| entry.is_tree()).map(|entry| &entry.oid);
            if subtree_old.is_some() || subtree_new.is_some() {
                self.compare_oids(subtree_old, subtree_new, &path)?;
            }

            let blob_old = before.filter(|entry| !entry.is_tree()).cloned();
            let blob_new = after.filter(|entry| !entry.is_tree()).cloned();
            if let Some(change) = TreeChange::from_entries(blob_old, blob_new) {
                self.change_set.insert(path, change);
            }
        }

        Ok(())
    }

    fn tree_entries_of(&self, oid: Option<&ObjectId>) -> Result<TreeEntryMap> {
        match oid {
            None => Ok(BTreeMap::new()),
            Some(oid) => Ok(self.resolve_to_tree(oid)?.into_entries().collect()),
        }
    }

    fn resolve_to_tree(&self, oid: &ObjectId) -> Result<Tree> {
        match self.database.parse_object(oid)? {
            ObjectBox::Tree(tree) => Ok(*tree),
            ObjectBox::Commit(commit) => self.resolve_to_tree(commit.tree_oid()),
            ObjectBox::Blob(_) => Err(Error::storage(format!("object {oid} is not a tree"))),
        }
    }
}

/// Classify the differences between two flat `path → entry` maps.
///
/// Used where one side is not a stored tree, e.g. the working tree.
pub fn compare_entry_maps(
    old: &BTreeMap<PathBuf, TreeEntry>,
    new: &BTreeMap<PathBuf, TreeEntry>,
) -> ChangeSet {
    let paths: BTreeSet<&PathBuf> = old.keys().chain(new.keys()).collect();

    paths
        .into_iter()
        .filter_map(|path| {
            TreeChange::from_entries(old.get(path).cloned(), new.get(path).cloned())
                .map(|change| (path.clone(), change))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::index::entry_mode::EntryMode;
    use pretty_assertions::assert_eq;
    use sha1::{Digest, Sha1};

    fn entry(data: &str) -> TreeEntry {
        let mut hasher = Sha1::new();
        hasher.update(data.as_bytes());
        let oid = ObjectId::try_parse(format!("{:x}", hasher.finalize())).unwrap();
        TreeEntry::new(EntryMode::Regular, oid)
    }

    #[test]
    fn map_comparison_classifies_all_three_kinds() {
        let old = BTreeMap::from([
            (PathBuf::from("kept"), entry("same")),
            (PathBuf::from("gone"), entry("old")),
            (PathBuf::from("changed"), entry("v1")),
        ]);
        let new = BTreeMap::from([
            (PathBuf::from("kept"), entry("same")),
            (PathBuf::from("fresh"), entry("new")),
            (PathBuf::from("changed"), entry("v2")),
        ]);

        let changes = compare_entry_maps(&old, &new);

        assert_eq!(changes.len(), 3);
        assert!(matches!(
            changes.get(Path::new("fresh")),
            Some(TreeChange::Added(_))
        ));
        assert!(matches!(
            changes.get(Path::new("gone")),
            Some(TreeChange::Deleted(_))
        ));
        assert!(matches!(
            changes.get(Path::new("changed")),
            Some(TreeChange::Modified { .. })
        ));
        assert!(!changes.contains_key(Path::new("kept")));
    }

    #[test]
    fn change_accessors_expose_the_right_sides() {
        let change = TreeChange::from_entries(Some(entry("a")), Some(entry("b"))).unwrap();
        assert_eq!(change.old_entry(), Some(&entry("a")));
        assert_eq!(change.new_entry(), Some(&entry("b")));

        assert!(TreeChange::from_entries(Some(entry("a")), Some(entry("a"))).is_none());
        assert!(TreeChange::from_entries(None, None).is_none());
    }
}

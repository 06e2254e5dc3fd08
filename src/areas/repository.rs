//! The repository: one value aggregating all four engines.
//!
//! Owns the object store, staging index, refs, and working tree of a single
//! repository rooted at one directory. Every user-visible operation (stage,
//! commit, branch, checkout, log, diff, merge, restore) is a method here,
//! and the caller threads the repository value through explicitly; there is
//! no process-wide state.
//!
//! Execution is single-writer and runs each operation to completion;
//! concurrent processes must serialize access externally.

use crate::areas::database::{CommitCache, Database};
use crate::areas::index::Index;
use crate::areas::refs::Refs;
use crate::areas::workspace::{Ignore, IgnoreNothing, Workspace};
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::revision::Revision;
use crate::artifacts::diff::diff_algorithm::{Edit, diff_lines};
use crate::artifacts::diff::tree_diff::{ChangeSet, TreeChange, compare_entry_maps};
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::index::staging_entry::StagingEntry;
use crate::artifacts::log::rev_list::{RevList, RevListIter};
use crate::artifacts::merge::ancestor_finder::AncestorFinder;
use crate::artifacts::merge::three_way::{Resolutions, classify};
use crate::artifacts::merge::MergeOutcome;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::{Author, Commit};
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::{Tree, TreeBuilder, TreeEntry};
use crate::artifacts::status::StatusReport;
use crate::error::{Error, Result};
use bytes::Bytes;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name of the repository metadata directory
pub const REPO_DIR: &str = ".strata";

/// Branch HEAD is attached to right after `init`
pub const DEFAULT_BRANCH: &str = "main";

pub struct Repository {
    path: Box<Path>,
    database: Database,
    index: RefCell<Index>,
    refs: Refs,
    workspace: Workspace,
    ignore: Box<dyn Ignore>,
}

impl Repository {
    /// Create a new, empty repository at `path`.
    ///
    /// Lays out the metadata directory with an empty object store, no
    /// branches, and HEAD attached to the unborn default branch: the first
    /// commit becomes the root commit of that branch.
    pub fn init(path: &Path) -> Result<Self> {
        let meta_path = path.join(REPO_DIR);
        std::fs::create_dir_all(meta_path.join("objects"))?;
        std::fs::create_dir_all(meta_path.join("refs").join("heads"))?;

        let head_path = meta_path.join("HEAD");
        if !head_path.exists() {
            std::fs::write(&head_path, format!("ref: refs/heads/{DEFAULT_BRANCH}"))?;
        }

        Self::open(path)
    }

    /// Open an existing repository rooted at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let path = path.canonicalize()?;
        let meta_path = path.join(REPO_DIR);
        if !meta_path.is_dir() {
            return Err(Error::storage(format!(
                "{path:?} is not a strata repository"
            )));
        }

        Ok(Repository {
            database: Database::new(meta_path.join("objects").into_boxed_path()),
            index: RefCell::new(Index::new(meta_path.join("index").into_boxed_path())),
            refs: Refs::new(meta_path.into_boxed_path()),
            workspace: Workspace::new(path.clone().into_boxed_path(), REPO_DIR),
            ignore: Box::new(IgnoreNothing),
            path: path.into_boxed_path(),
        })
    }

    /// Replace the ignore predicate consulted when staging directories.
    pub fn with_ignore(mut self, ignore: Box<dyn Ignore>) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Resolve a revision expression to a commit id.
    pub fn resolve(&self, rev: &str) -> Result<ObjectId> {
        Revision::try_parse(rev)?.resolve(self)
    }

    /// Stage files or directories from the working tree.
    ///
    /// Directories are staged recursively, skipping ignored paths; each file
    /// is hashed into a blob and its entry overwrites any prior one.
    pub fn stage(&self, paths: &[impl AsRef<Path>]) -> Result<()> {
        let mut index = self.index.borrow_mut();
        index.rehydrate()?;

        for path in paths {
            let path = path.as_ref();
            if self.workspace.is_dir(path) {
                for file in self.workspace.list_files(Some(path))? {
                    if !self.ignore.is_ignored(&file) {
                        self.stage_file(&mut index, &file)?;
                    }
                }
            } else {
                self.stage_file(&mut index, path)?;
            }
        }

        index.write_updates()
    }

    /// Stage explicit content at a path, bypassing the working tree.
    pub fn stage_bytes(&self, path: &Path, content: Bytes) -> Result<()> {
        let mut index = self.index.borrow_mut();
        index.rehydrate()?;

        let oid = self.database.store(Blob::new(content))?;
        index.add(StagingEntry::new(
            path.to_path_buf(),
            oid,
            EntryMode::Regular,
        ));

        index.write_updates()
    }

    /// Remove staging entries for the given paths.
    pub fn unstage(&self, paths: &[impl AsRef<Path>]) -> Result<()> {
        let mut index = self.index.borrow_mut();
        index.rehydrate()?;

        for path in paths {
            let path = path.as_ref();
            if index.entry_by_path(path).is_some() {
                index.remove(path)?;
                continue;
            }

            // allow unstaging a directory by removing everything under it
            let under = index.entries_under_path(path);
            if under.is_empty() {
                return Err(Error::NotStaged(path.to_path_buf()));
            }
            for staged in under {
                index.remove(&staged)?;
            }
        }

        index.write_updates()
    }

    /// Snapshot the staging index into a commit on the current branch.
    ///
    /// Fails with [`Error::EmptyCommit`] when nothing is staged, or when the
    /// snapshot tree equals the sole parent's tree (no-op commit). The index
    /// is cleared only after the commit is stored.
    pub fn commit(&self, message: &str, author: Author) -> Result<ObjectId> {
        let mut index = self.index.borrow_mut();
        index.rehydrate()?;

        if index.is_empty() {
            return Err(Error::EmptyCommit);
        }

        let tree_oid = index.snapshot(&mut |tree: &Tree| self.database.store(tree.clone()))?;

        let parents: Vec<ObjectId> = self.refs.read_head()?.into_iter().collect();
        let commit_oid = self.write_commit(parents, tree_oid, author, message)?;

        index.clear();
        index.write_updates()?;

        Ok(commit_oid)
    }

    /// Store a commit and advance HEAD (through its branch when attached).
    ///
    /// Enforces the graph invariants: parent ids must already exist, and a
    /// single-parent commit may not repeat its parent's tree.
    fn write_commit(
        &self,
        parents: Vec<ObjectId>,
        tree_oid: ObjectId,
        author: Author,
        message: &str,
    ) -> Result<ObjectId> {
        for parent in &parents {
            if !self.database.exists(parent) {
                return Err(Error::NoSuchCommit(parent.to_string()));
            }
        }

        if let [parent] = parents.as_slice() {
            let parent_tree = self.tree_of(parent)?;
            if parent_tree == tree_oid {
                return Err(Error::EmptyCommit);
            }
        }

        let commit = Commit::new(parents, tree_oid, author, message.trim().to_string());
        let commit_oid = self.database.store(commit)?;
        self.refs.update_head(commit_oid.clone())?;

        Ok(commit_oid)
    }

    /// Create a branch at a revision (HEAD when `None`).
    pub fn create_branch(&self, name: &str, start: Option<&str>) -> Result<()> {
        let name = BranchName::try_parse(name.to_string())?;

        let oid = match start {
            Some(rev) => self.resolve(rev).map_err(|err| match err {
                Error::UnresolvedRef(rev) => Error::NoSuchCommit(rev),
                other => other,
            })?,
            None => self
                .refs
                .read_head()?
                .ok_or_else(|| Error::NoSuchCommit("HEAD".to_string()))?,
        };

        self.refs.create_branch(&name, oid)
    }

    /// Delete a branch pointer; the commits it pointed at remain.
    pub fn delete_branch(&self, name: &str) -> Result<ObjectId> {
        let name = BranchName::try_parse(name.to_string())?;
        self.refs.delete_branch(&name)
    }

    pub fn list_branches(&self) -> Result<Vec<BranchName>> {
        self.refs.list_branches()
    }

    /// Move HEAD to a revision and materialize its snapshot.
    ///
    /// Refuses with [`Error::UncommittedChanges`] when the staging index
    /// holds entries and the target tree differs from the current one. HEAD
    /// attaches to the branch when the revision names one (or a branch tip),
    /// and detaches onto the bare commit id otherwise.
    pub fn checkout(&self, rev: &str) -> Result<()> {
        let target_oid = self.resolve(rev)?;
        let target_tree = self.tree_of(&target_oid)?;

        let current_oid = self.refs.read_head()?;
        let current_tree = match &current_oid {
            Some(oid) => Some(self.tree_of(oid)?),
            None => None,
        };

        let mut index = self.index.borrow_mut();
        index.rehydrate()?;
        if !index.is_empty() && current_tree.as_ref() != Some(&target_tree) {
            return Err(Error::UncommittedChanges {
                target: rev.to_string(),
            });
        }

        let changes = self
            .database
            .tree_diff(current_tree.as_ref(), Some(&target_tree))?;
        self.apply_changes_to_workspace(&changes)?;

        // prefer attaching to the branch the revision names, then to any
        // branch whose tip this is; otherwise detach onto the bare id
        if let Ok(name) = BranchName::try_parse(rev.to_string())
            && !name.is_head()
            && self.refs.read_branch(&name)?.is_some()
        {
            return self.refs.attach_head(&name);
        }

        match self.refs.branch_with_tip(&target_oid)? {
            Some(branch) => self.refs.attach_head(&branch),
            None => self.refs.detach_head(&target_oid),
        }
    }

    /// Lazy history walk from a revision, newest first.
    ///
    /// Each call starts a fresh traversal; the iterator pulls one commit at
    /// a time from the store.
    pub fn log(&self, rev: &str) -> Result<RevListIter<'_>> {
        RevList::new(self, Revision::try_parse(rev)?).into_iter()
    }

    /// Path-level changes between a revision and another revision or, for
    /// `None`, the working tree.
    pub fn diff(&self, from: &str, to: Option<&str>) -> Result<ChangeSet> {
        let from_tree = self.tree_of(&self.resolve(from)?)?;

        match to {
            Some(rev) => {
                let to_tree = self.tree_of(&self.resolve(rev)?)?;
                self.database.tree_diff(Some(&from_tree), Some(&to_tree))
            }
            None => {
                let old = self.database.flatten_tree(&from_tree)?;
                let new = self.working_tree_entries()?;
                Ok(compare_entry_maps(&old, &new))
            }
        }
    }

    /// Line-level edit script between two stored blobs.
    pub fn diff_blobs(&self, old: &ObjectId, new: &ObjectId) -> Result<Vec<Edit<String>>> {
        let old_blob = self
            .database
            .parse_object_as_blob(old)?
            .ok_or_else(|| Error::NotFound(old.clone()))?;
        let new_blob = self
            .database
            .parse_object_as_blob(new)?
            .ok_or_else(|| Error::NotFound(new.clone()))?;

        Ok(diff_lines(
            &String::from_utf8_lossy(old_blob.content()),
            &String::from_utf8_lossy(new_blob.content()),
        ))
    }

    /// Merge another branch into the current one.
    ///
    /// Fast-forwards when the merge base is the current tip; otherwise runs
    /// a three-way merge against the base snapshot and commits with two
    /// parents. Conflicting paths abort the merge with the full conflict set
    /// and leave branches, HEAD, and the working tree untouched.
    pub fn merge(&self, branch: &str, author: Author, message: &str) -> Result<MergeOutcome> {
        let ours = self
            .refs
            .read_head()?
            .ok_or_else(|| Error::UnresolvedRef("HEAD".to_string()))?;
        let theirs = self.resolve(branch)?;

        if ours == theirs {
            return Ok(MergeOutcome::AlreadyUpToDate);
        }

        let cache = CommitCache::new();
        let finder = AncestorFinder::new(|oid: &ObjectId| cache.get_or_load(&self.database, oid));
        let base = finder.find_merge_base(&ours, &theirs)?;

        if base.as_ref() == Some(&theirs) {
            return Ok(MergeOutcome::AlreadyUpToDate);
        }

        let ours_tree = self.tree_of(&ours)?;
        let theirs_tree = self.tree_of(&theirs)?;

        if base.as_ref() == Some(&ours) {
            // fast-forward: move the pointer, no new commit
            let changes = self
                .database
                .tree_diff(Some(&ours_tree), Some(&theirs_tree))?;
            self.apply_changes_to_workspace(&changes)?;
            self.refs.update_head(theirs.clone())?;

            return Ok(MergeOutcome::FastForward(theirs));
        }

        let base_tree = match &base {
            Some(oid) => Some(self.tree_of(oid)?),
            None => None, // unrelated histories merge against the empty snapshot
        };

        let ours_changes = self
            .database
            .tree_diff(base_tree.as_ref(), Some(&ours_tree))?;
        let theirs_changes = self
            .database
            .tree_diff(base_tree.as_ref(), Some(&theirs_tree))?;

        let (resolutions, conflicts) = classify(&ours_changes, &theirs_changes);
        if !conflicts.is_empty() {
            return Err(Error::MergeConflict { conflicts });
        }

        let merged_tree = self.build_merged_tree(base_tree.as_ref(), resolutions)?;
        let commit_oid =
            self.write_commit(vec![ours, theirs], merged_tree.clone(), author, message)?;

        let changes = self
            .database
            .tree_diff(Some(&ours_tree), Some(&merged_tree))?;
        self.apply_changes_to_workspace(&changes)?;

        Ok(MergeOutcome::Merged(commit_oid))
    }

    /// Bytes of one file at one snapshot.
    pub fn file_at(&self, rev: &str, path: &Path) -> Result<Bytes> {
        let entry = self.blob_entry_at(rev, path)?;
        let blob = self
            .database
            .parse_object_as_blob(&entry.oid)?
            .ok_or_else(|| Error::NotFound(entry.oid.clone()))?;

        Ok(blob.into_content())
    }

    /// Bring one historical file back: write it to the working tree and
    /// re-stage it, leaving every other path alone.
    pub fn restore(&self, rev: &str, path: &Path) -> Result<()> {
        let entry = self.blob_entry_at(rev, path)?;
        let blob = self
            .database
            .parse_object_as_blob(&entry.oid)?
            .ok_or_else(|| Error::NotFound(entry.oid.clone()))?;

        self.workspace.write_file(path, blob.content(), entry.mode)?;

        let mut index = self.index.borrow_mut();
        index.rehydrate()?;
        index.add(StagingEntry::new(path.to_path_buf(), entry.oid, entry.mode));
        index.write_updates()
    }

    /// Materialize a full snapshot as a `path → bytes` mapping.
    pub fn checkout_tree(&self, oid: &ObjectId) -> Result<BTreeMap<PathBuf, Bytes>> {
        self.database
            .flatten_tree(oid)?
            .into_iter()
            .map(|(path, entry)| {
                let blob = self
                    .database
                    .parse_object_as_blob(&entry.oid)?
                    .ok_or_else(|| Error::NotFound(entry.oid.clone()))?;
                Ok((path, blob.into_content()))
            })
            .collect()
    }

    /// Classify working-tree files against the staging index.
    pub fn status(&self) -> Result<StatusReport> {
        let mut index = self.index.borrow_mut();
        index.rehydrate()?;

        let mut report = StatusReport::default();
        for path in self.workspace.list_files(None)? {
            if self.ignore.is_ignored(&path) {
                continue;
            }

            match index.entry_by_path(&path) {
                Some(entry) => {
                    let content = self.workspace.read_file(&path)?;
                    if Blob::new(content).object_id()? == entry.oid {
                        report.staged.push(path);
                    } else {
                        report.modified.push(path);
                    }
                }
                None => report.untracked.push(path),
            }
        }

        Ok(report)
    }

    /// Hash every working-tree file into a virtual entry map, storing nothing.
    fn working_tree_entries(&self) -> Result<BTreeMap<PathBuf, TreeEntry>> {
        let mut entries = BTreeMap::new();
        for path in self.workspace.list_files(None)? {
            if self.ignore.is_ignored(&path) {
                continue;
            }

            let content = self.workspace.read_file(&path)?;
            let mode = self.workspace.file_mode(&path);
            entries.insert(path, TreeEntry::new(mode, Blob::new(content).object_id()?));
        }

        Ok(entries)
    }

    fn stage_file(&self, index: &mut Index, path: &Path) -> Result<()> {
        let content = self.workspace.read_file(path)?;
        let mode = self.workspace.file_mode(path);
        let oid = self.database.store(Blob::new(content))?;

        index.add(StagingEntry::new(path.to_path_buf(), oid, mode));
        Ok(())
    }

    /// Tree id a commit snapshots.
    fn tree_of(&self, commit_oid: &ObjectId) -> Result<ObjectId> {
        let commit = self
            .database
            .parse_object_as_commit(commit_oid)?
            .ok_or_else(|| Error::NoSuchCommit(commit_oid.to_string()))?;

        Ok(commit.tree_oid().clone())
    }

    fn blob_entry_at(&self, rev: &str, path: &Path) -> Result<TreeEntry> {
        let commit_oid = self.resolve(rev)?;

        match self.database.tree_entry_at(&commit_oid, path)? {
            Some(entry) if !entry.is_tree() => Ok(entry),
            _ => Err(Error::PathNotFound {
                rev: rev.to_string(),
                path: path.to_path_buf(),
            }),
        }
    }

    /// Apply a change set to the working tree: deletions first, then writes.
    fn apply_changes_to_workspace(&self, changes: &ChangeSet) -> Result<()> {
        for (path, change) in changes {
            if matches!(change, TreeChange::Deleted(_)) {
                self.workspace.remove_file(path)?;
            }
        }

        for (path, change) in changes {
            if let Some(entry) = change.new_entry() {
                let blob = self
                    .database
                    .parse_object_as_blob(&entry.oid)?
                    .ok_or_else(|| Error::NotFound(entry.oid.clone()))?;
                self.workspace.write_file(path, blob.content(), entry.mode)?;
            }
        }

        Ok(())
    }

    /// Base snapshot plus per-path resolutions, stored as a new tree.
    fn build_merged_tree(
        &self,
        base_tree: Option<&ObjectId>,
        resolutions: Resolutions,
    ) -> Result<ObjectId> {
        let mut entries = match base_tree {
            Some(oid) => self.database.flatten_tree(oid)?,
            None => BTreeMap::new(),
        };

        for (path, resolution) in resolutions {
            match resolution {
                Some(entry) => {
                    entries.insert(path, entry);
                }
                None => {
                    entries.remove(&path);
                }
            }
        }

        let mut builder = TreeBuilder::new();
        for (path, entry) in entries {
            builder.insert(&path, entry)?;
        }

        builder.write_to(&mut |tree: &Tree| self.database.store(tree.clone()))
    }
}

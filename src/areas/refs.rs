//! Branch pointers and HEAD.
//!
//! A branch is a file under `refs/heads/` holding a commit id; branch names
//! may be hierarchical, mapping onto subdirectories. HEAD is either
//! *attached* (`ref: refs/heads/<name>`) and advances through the named
//! branch, or *detached*, holding a bare commit id.
//!
//! Ref files are written under an exclusive file lock so cooperating
//! processes never interleave partial writes.

use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::objects::object_id::ObjectId;
use crate::error::{Error, Result};
use derive_new::new;
use file_guard::Lock;
use std::collections::BTreeMap;
use std::io::Write;
use std::ops::DerefMut;
use std::path::Path;
use walkdir::WalkDir;

/// Pattern of an attached-HEAD file
const SYMREF_REGEX: &str = r"^ref: refs/heads/(.+)$";

/// Content of a ref file: either an attached-branch pointer or a commit id.
#[derive(Debug, Clone)]
enum RefContent {
    SymRef(BranchName),
    Oid(ObjectId),
}

impl RefContent {
    fn read_from(path: &Path) -> Result<Option<RefContent>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        let content = content.trim();
        if content.is_empty() {
            return Ok(None);
        }

        if let Some(captures) = regex::Regex::new(SYMREF_REGEX)?.captures(content) {
            Ok(Some(RefContent::SymRef(BranchName::try_parse(
                captures[1].to_string(),
            )?)))
        } else {
            Ok(Some(RefContent::Oid(ObjectId::try_parse(
                content.to_string(),
            )?)))
        }
    }
}

#[derive(Debug, new)]
pub struct Refs {
    /// The repository metadata directory
    path: Box<Path>,
}

impl Refs {
    /// Commit id HEAD points at, following an attached branch.
    ///
    /// `None` when HEAD is attached to a branch with no commits yet.
    pub fn read_head(&self) -> Result<Option<ObjectId>> {
        match RefContent::read_from(&self.head_path())? {
            Some(RefContent::SymRef(branch)) => self.read_branch(&branch),
            Some(RefContent::Oid(oid)) => Ok(Some(oid)),
            None => Ok(None),
        }
    }

    /// Branch HEAD is attached to, or `None` when detached.
    pub fn current_branch(&self) -> Result<Option<BranchName>> {
        match RefContent::read_from(&self.head_path())? {
            Some(RefContent::SymRef(branch)) => Ok(Some(branch)),
            _ => Ok(None),
        }
    }

    /// Advance HEAD to a new commit: through the attached branch if there is
    /// one, directly otherwise.
    pub fn update_head(&self, oid: ObjectId) -> Result<()> {
        match RefContent::read_from(&self.head_path())? {
            Some(RefContent::SymRef(branch)) => {
                self.update_ref_file(&self.branch_path(&branch), oid.as_ref())
            }
            _ => self.update_ref_file(&self.head_path(), oid.as_ref()),
        }
    }

    /// Attach HEAD to a branch.
    pub fn attach_head(&self, branch: &BranchName) -> Result<()> {
        self.update_ref_file(&self.head_path(), &format!("ref: refs/heads/{branch}"))
    }

    /// Detach HEAD onto a bare commit id.
    pub fn detach_head(&self, oid: &ObjectId) -> Result<()> {
        self.update_ref_file(&self.head_path(), oid.as_ref())
    }

    pub fn read_branch(&self, name: &BranchName) -> Result<Option<ObjectId>> {
        match RefContent::read_from(&self.branch_path(name))? {
            Some(RefContent::Oid(oid)) => Ok(Some(oid)),
            Some(RefContent::SymRef(_)) => Err(Error::storage(format!(
                "branch file for '{name}' holds a symbolic ref"
            ))),
            None => Ok(None),
        }
    }

    pub fn create_branch(&self, name: &BranchName, oid: ObjectId) -> Result<()> {
        let branch_path = self.branch_path(name);
        if branch_path.exists() {
            return Err(Error::BranchExists(name.to_string()));
        }

        self.update_ref_file(&branch_path, oid.as_ref())
    }

    /// Delete a branch and return the commit it pointed at.
    ///
    /// The commit itself stays in the store; only the pointer goes away.
    pub fn delete_branch(&self, name: &BranchName) -> Result<ObjectId> {
        let branch_path = self.branch_path(name);
        let oid = self
            .read_branch(name)?
            .ok_or_else(|| Error::NoSuchBranch(name.to_string()))?;

        std::fs::remove_file(&branch_path)?;
        self.prune_empty_parent_dirs(&branch_path)?;

        Ok(oid)
    }

    pub fn list_branches(&self) -> Result<Vec<BranchName>> {
        let heads = self.heads_path();
        let mut branches = Vec::new();

        for entry in WalkDir::new(&heads).into_iter().filter_map(|e| e.ok()) {
            if entry.path().is_file() {
                let relative = entry
                    .path()
                    .strip_prefix(&heads)
                    .map_err(|err| Error::storage(err))?;
                branches.push(BranchName::try_parse(
                    relative.to_string_lossy().to_string(),
                )?);
            }
        }

        branches.sort();
        Ok(branches)
    }

    /// First branch (by name) whose tip is the given commit, if any.
    pub fn branch_with_tip(&self, oid: &ObjectId) -> Result<Option<BranchName>> {
        let tips: BTreeMap<BranchName, Option<ObjectId>> = self
            .list_branches()?
            .into_iter()
            .map(|branch| {
                let tip = self.read_branch(&branch)?;
                Ok((branch, tip))
            })
            .collect::<Result<_>>()?;

        Ok(tips
            .into_iter()
            .find(|(_, tip)| tip.as_ref() == Some(oid))
            .map(|(branch, _)| branch))
    }

    fn update_ref_file(&self, path: &Path, content: &str) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::storage(format!("invalid ref path {path:?}")))?;
        std::fs::create_dir_all(parent)?;

        let mut ref_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let mut lock = file_guard::lock(&mut ref_file, Lock::Exclusive, 0, 1)?;
        lock.deref_mut().write_all(content.as_bytes())?;

        Ok(())
    }

    fn prune_empty_parent_dirs(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && parent != self.heads_path().as_ref()
            && parent.read_dir()?.next().is_none()
        {
            std::fs::remove_dir(parent)?;
            self.prune_empty_parent_dirs(parent)?;
        }

        Ok(())
    }

    pub fn head_path(&self) -> Box<Path> {
        self.path.join("HEAD").into_boxed_path()
    }

    pub fn heads_path(&self) -> Box<Path> {
        self.path.join("refs").join("heads").into_boxed_path()
    }

    fn branch_path(&self, name: &BranchName) -> Box<Path> {
        self.heads_path().join(name.as_ref()).into_boxed_path()
    }
}

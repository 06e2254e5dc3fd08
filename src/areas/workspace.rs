//! Working-tree I/O.
//!
//! Reads and writes files under the repository root, always addressed by
//! repository-relative paths. The metadata directory is never listed, and
//! directory listings consult the caller-supplied ignore predicate so the
//! staging engine can skip ignored files without knowing how patterns work.

use crate::artifacts::index::entry_mode::EntryMode;
use crate::error::{Error, Result};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Predicate deciding whether a working-tree path is ignored.
///
/// Pattern matching itself is a front-end concern; the engine only consumes
/// the boolean answer when staging directories.
pub trait Ignore {
    fn is_ignored(&self, path: &Path) -> bool;
}

/// Default predicate: nothing is ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreNothing;

impl Ignore for IgnoreNothing {
    fn is_ignored(&self, _path: &Path) -> bool {
        false
    }
}

#[derive(Debug)]
pub struct Workspace {
    /// Repository root
    path: Box<Path>,
    /// Name of the metadata directory to skip when listing
    metadata_dir: &'static str,
}

impl Workspace {
    pub fn new(path: Box<Path>, metadata_dir: &'static str) -> Self {
        Workspace { path, metadata_dir }
    }

    pub fn root(&self) -> &Path {
        &self.path
    }

    pub fn is_dir(&self, relative: &Path) -> bool {
        self.path.join(relative).is_dir()
    }

    /// All files below `within` (the whole tree for `None`), as
    /// repository-relative paths, metadata directory excluded.
    pub fn list_files(&self, within: Option<&Path>) -> Result<Vec<PathBuf>> {
        let start = match within {
            Some(relative) => self.path.join(relative),
            None => self.path.to_path_buf(),
        };
        if !start.exists() {
            return Err(Error::storage(format!("path {start:?} does not exist")));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&start) {
            let entry = entry?;
            if !entry.path().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(self.path.as_ref())
                .map_err(Error::storage)?;
            if relative
                .components()
                .any(|c| c.as_os_str() == self.metadata_dir)
            {
                continue;
            }

            files.push(relative.to_path_buf());
        }

        files.sort();
        Ok(files)
    }

    pub fn read_file(&self, relative: &Path) -> Result<Bytes> {
        let content = std::fs::read(self.path.join(relative))?;
        Ok(Bytes::from(content))
    }

    /// Mode of an existing working-tree file.
    pub fn file_mode(&self, relative: &Path) -> EntryMode {
        EntryMode::for_file(&self.path.join(relative))
    }

    /// Write a file, creating parent directories and applying the mode.
    pub fn write_file(&self, relative: &Path, content: &[u8], mode: EntryMode) -> Result<()> {
        let full_path = self.path.join(relative);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&full_path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(match mode {
                EntryMode::Executable => 0o755,
                _ => 0o644,
            });
            std::fs::set_permissions(&full_path, permissions)?;
        }

        Ok(())
    }

    /// Remove a file and any directories the removal leaves empty.
    pub fn remove_file(&self, relative: &Path) -> Result<()> {
        let full_path = self.path.join(relative);
        if full_path.exists() {
            std::fs::remove_file(&full_path)?;
            self.prune_empty_parent_dirs(&full_path)?;
        }

        Ok(())
    }

    fn prune_empty_parent_dirs(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && parent != self.path.as_ref()
            && parent.exists()
            && parent.read_dir()?.next().is_none()
        {
            std::fs::remove_dir(parent)?;
            self.prune_empty_parent_dirs(parent)?;
        }

        Ok(())
    }
}

use crate::error::{Error, Result};
use is_executable::IsExecutable;
use std::path::Path;

/// File mode of a tree or staging entry.
///
/// `Directory` marks an entry as a subtree; the two file variants carry the
/// executable bit. Octal values follow the conventional on-disk encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum EntryMode {
    #[default]
    Regular,
    Executable,
    Directory,
}

impl EntryMode {
    pub fn as_u32(self) -> u32 {
        match self {
            EntryMode::Regular => 0o100644,
            EntryMode::Executable => 0o100755,
            EntryMode::Directory => 0o40000,
        }
    }

    pub fn from_u32(mode: u32) -> Result<Self> {
        match mode {
            0o100644 => Ok(EntryMode::Regular),
            0o100755 => Ok(EntryMode::Executable),
            0o40000 => Ok(EntryMode::Directory),
            other => Err(Error::storage(format!("unknown entry mode {other:o}"))),
        }
    }

    pub fn from_octal_str(mode: &str) -> Result<Self> {
        let mode = u32::from_str_radix(mode, 8)
            .map_err(|_| Error::storage(format!("malformed entry mode '{mode}'")))?;
        Self::from_u32(mode)
    }

    pub fn is_tree(self) -> bool {
        matches!(self, EntryMode::Directory)
    }

    /// Derive the mode of a working-tree file from its permission bits.
    pub fn for_file(path: &Path) -> Self {
        if path.is_executable() {
            EntryMode::Executable
        } else {
            EntryMode::Regular
        }
    }
}

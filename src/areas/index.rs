//! Staging index: the mutable record of what goes into the next commit.
//!
//! Maps working-tree paths to staged blob ids. Entries overwrite any prior
//! entry for their path; staging a path also evicts entries it conflicts
//! with (a staged file where a directory now goes, or staged children of a
//! path that is now a file). Snapshotting builds the tree objects for the
//! current entries and is a pure function of them.
//!
//! The index persists to a checksummed binary file (see
//! [`crate::artifacts::index`]) and is re-read before every operation, with
//! file locks guarding concurrent access from cooperating processes.

use crate::artifacts::index::checksum::Checksum;
use crate::artifacts::index::staging_entry::{ENTRY_BLOCK, ENTRY_MIN_SIZE, StagingEntry};
use crate::artifacts::index::{HEADER_SIZE, SIGNATURE, VERSION};
use crate::artifacts::objects::object::{Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::{Tree, TreeBuilder};
use crate::error::{Error, Result};
use byteorder::{ByteOrder, NetworkEndian, WriteBytesExt};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::ops::DerefMut;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Index {
    /// Path of the index file
    path: Box<Path>,
    /// Staged entries by repository-relative path
    entries: BTreeMap<PathBuf, StagingEntry>,
    /// Whether the in-memory table diverged from the file
    changed: bool,
}

impl Index {
    pub fn new(path: Box<Path>) -> Self {
        Index {
            path,
            entries: BTreeMap::new(),
            changed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry_by_path(&self, path: &Path) -> Option<&StagingEntry> {
        self.entries.get(path)
    }

    pub fn entries(&self) -> impl Iterator<Item = &StagingEntry> {
        self.entries.values()
    }

    /// Staged paths equal to or below the given path.
    pub fn entries_under_path(&self, path: &Path) -> Vec<PathBuf> {
        self.entries
            .keys()
            .filter(|entry_path| entry_path.starts_with(path) || entry_path.as_path() == path)
            .cloned()
            .collect()
    }

    /// Record an entry, overwriting any prior entry for the path and
    /// evicting entries the path conflicts with.
    pub fn add(&mut self, entry: StagingEntry) {
        self.discard_conflicts(&entry.path);
        self.entries.insert(entry.path.clone(), entry);
        self.changed = true;
    }

    /// Remove the entry for a path.
    pub fn remove(&mut self, path: &Path) -> Result<()> {
        if self.entries.remove(path).is_none() {
            return Err(Error::NotStaged(path.to_path_buf()));
        }
        self.changed = true;

        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.changed = true;
    }

    /// Build and store the tree snapshot of the current entries.
    ///
    /// Purely a function of the entries: staging the same paths with the
    /// same content always yields the same root id.
    pub fn snapshot<F>(&self, store: &mut F) -> Result<ObjectId>
    where
        F: FnMut(&Tree) -> Result<ObjectId>,
    {
        TreeBuilder::from_entries(self.entries())?.write_to(store)
    }

    /// Drop entries that cannot coexist with a new entry at `path`: a staged
    /// file at any of its ancestor paths, and any staged entries below it.
    fn discard_conflicts(&mut self, path: &Path) {
        for ancestor in path.ancestors().skip(1) {
            if !ancestor.as_os_str().is_empty() {
                self.entries.remove(ancestor);
            }
        }

        let children: Vec<PathBuf> = self
            .entries
            .keys()
            .filter(|staged| staged.starts_with(path) && staged.as_path() != path)
            .cloned()
            .collect();
        for child in children {
            self.entries.remove(&child);
        }
    }

    /// Reload the table from disk, creating an empty index file on first use.
    pub fn rehydrate(&mut self) -> Result<()> {
        if !self.path.exists() {
            std::fs::File::create(&self.path)?;
        }

        let mut index_file = std::fs::OpenOptions::new().read(true).open(&self.path)?;
        let mut lock = file_guard::lock(&mut index_file, file_guard::Lock::Shared, 0, 1)?;

        self.entries.clear();
        self.changed = false;

        if lock.deref_mut().metadata()?.len() == 0 {
            return Ok(());
        }

        let mut reader = Checksum::new(lock);
        let entry_count = self.parse_header(&mut reader)?;
        self.parse_entries(entry_count, &mut reader)?;

        reader.verify()
    }

    /// Persist the table if it changed since the last load.
    pub fn write_updates(&mut self) -> Result<()> {
        if !self.changed {
            return Ok(());
        }

        let mut index_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        let lock = file_guard::lock(&mut index_file, file_guard::Lock::Exclusive, 0, 1)?;

        let mut writer = Checksum::new(lock);

        let mut header = Vec::with_capacity(HEADER_SIZE);
        header.extend_from_slice(SIGNATURE.as_bytes());
        header.write_u32::<NetworkEndian>(VERSION)?;
        header.write_u32::<NetworkEndian>(self.entries.len() as u32)?;
        writer.write(&header)?;

        for entry in self.entries.values() {
            writer.write(&entry.serialize()?)?;
        }

        writer.write_checksum()?;
        self.changed = false;

        Ok(())
    }

    fn parse_header(&self, reader: &mut Checksum) -> Result<u32> {
        let header = reader.read(HEADER_SIZE)?;

        let signature = std::str::from_utf8(&header[0..4])?;
        if signature != SIGNATURE {
            return Err(Error::storage(format!(
                "bad staging-index signature '{signature}'"
            )));
        }

        let version = NetworkEndian::read_u32(&header[4..8]);
        if version != VERSION {
            return Err(Error::storage(format!(
                "unsupported staging-index version {version}"
            )));
        }

        Ok(NetworkEndian::read_u32(&header[8..12]))
    }

    fn parse_entries(&mut self, entry_count: u32, reader: &mut Checksum) -> Result<()> {
        for _ in 0..entry_count {
            let mut entry_bytes = reader.read(ENTRY_MIN_SIZE)?.to_vec();

            // entries are block-aligned and NUL-padded; keep reading blocks
            // until the terminator shows up
            while entry_bytes.last() != Some(&0) {
                entry_bytes.extend_from_slice(&reader.read(ENTRY_BLOCK)?);
            }

            let entry =
                StagingEntry::deserialize(std::io::Cursor::new(Bytes::from(entry_bytes)))?;
            self.entries.insert(entry.path.clone(), entry);
        }

        Ok(())
    }
}

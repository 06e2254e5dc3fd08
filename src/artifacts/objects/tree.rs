//! Tree object: one directory snapshot.
//!
//! A tree maps entry names to `(mode, object id)` pairs; an entry whose mode
//! is `Directory` references another tree, everything else references a blob.
//! Entries are kept sorted by name so the serialized form, and therefore the
//! id, is a pure function of the contents.
//!
//! ## Format
//!
//! On disk: `tree <size>\0<entries>`, each entry `<octal mode> <name>\0<20-byte id>`.
//!
//! Trees are immutable once built. [`TreeBuilder`] assembles a nested
//! snapshot from flat staging entries and stores subtrees before the trees
//! that reference them, so no stored tree ever points at a missing id.

use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::index::staging_entry::StagingEntry;
use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::error::{Error, Result};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::{Component, Path};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: EntryMode,
    pub oid: ObjectId,
}

impl TreeEntry {
    pub fn new(mode: EntryMode, oid: ObjectId) -> Self {
        TreeEntry { mode, oid }
    }

    pub fn is_tree(&self) -> bool {
        self.mode.is_tree()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: BTreeMap<String, TreeEntry>,
}

impl Tree {
    pub fn insert(&mut self, name: String, entry: TreeEntry) {
        self.entries.insert(name, entry);
    }

    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.get(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &TreeEntry)> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> impl Iterator<Item = (String, TreeEntry)> {
        self.entries.into_iter()
    }
}

impl Packable for Tree {
    fn serialize(&self) -> Result<Bytes> {
        let mut content_bytes = Vec::new();
        for (name, entry) in &self.entries {
            let header = format!("{:o} {}", entry.mode.as_u32(), name);
            content_bytes.write_all(header.as_bytes())?;
            content_bytes.push(0);
            entry.oid.write_binary_to(&mut content_bytes)?;
        }

        let mut tree_bytes = Vec::with_capacity(content_bytes.len() + 16);
        let header = format!("{} {}\0", self.object_type().as_str(), content_bytes.len());
        tree_bytes.write_all(header.as_bytes())?;
        tree_bytes.write_all(&content_bytes)?;

        Ok(Bytes::from(tree_bytes))
    }
}

impl Unpackable for Tree {
    fn deserialize(mut reader: impl BufRead) -> Result<Self> {
        let mut entries = BTreeMap::new();

        // Reuse scratch buffers across entries
        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            let n = reader.read_until(b' ', &mut mode_bytes)?;
            if n == 0 {
                break; // clean EOF: no more entries
            }
            if mode_bytes.last() != Some(&b' ') {
                return Err(Error::storage("unexpected EOF in tree entry mode"));
            }
            mode_bytes.pop();
            let mode = EntryMode::from_octal_str(std::str::from_utf8(&mode_bytes)?)?;

            name_bytes.clear();
            let n = reader.read_until(b'\0', &mut name_bytes)?;
            if n == 0 || name_bytes.last() != Some(&0) {
                return Err(Error::storage("unexpected EOF in tree entry name"));
            }
            name_bytes.pop();
            let name = std::str::from_utf8(&name_bytes)?.to_owned();

            let oid = ObjectId::read_binary_from(&mut reader)
                .map_err(|_| Error::storage("unexpected EOF in tree entry id"))?;

            entries.insert(name, TreeEntry::new(mode, oid));
        }

        Ok(Tree { entries })
    }
}

impl Object for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }
}

/// Node of a snapshot under construction.
#[derive(Debug, Clone)]
enum Node {
    Leaf(TreeEntry),
    Dir(TreeBuilder),
}

/// Assembles a nested tree from flat `path → entry` records.
///
/// Intermediate directories are created on demand; [`TreeBuilder::write_to`]
/// then stores the snapshot bottom-up and returns the root id. Building is a
/// pure function of the inserted entries, so identical inputs always produce
/// the identical root id.
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    nodes: BTreeMap<String, Node>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<'e>(entries: impl Iterator<Item = &'e StagingEntry>) -> Result<Self> {
        let mut builder = Self::new();
        for entry in entries {
            builder.insert(&entry.path, TreeEntry::new(entry.mode, entry.oid.clone()))?;
        }

        Ok(builder)
    }

    pub fn insert(&mut self, path: &Path, entry: TreeEntry) -> Result<()> {
        let mut components = path.components();
        let name = match components.next() {
            Some(Component::Normal(name)) => name
                .to_str()
                .ok_or_else(|| Error::storage(format!("non-UTF-8 path {path:?}")))?
                .to_owned(),
            _ => return Err(Error::storage(format!("unrepresentable path {path:?}"))),
        };

        let rest = components.as_path();
        if rest.as_os_str().is_empty() {
            self.nodes.insert(name, Node::Leaf(entry));
            return Ok(());
        }

        match self
            .nodes
            .entry(name)
            .or_insert_with(|| Node::Dir(TreeBuilder::new()))
        {
            Node::Dir(subtree) => subtree.insert(rest, entry),
            Node::Leaf(_) => Err(Error::storage(format!(
                "path {path:?} passes through a staged file"
            ))),
        }
    }

    /// Store the snapshot bottom-up through `store` and return the root id.
    ///
    /// `store` receives each finished tree exactly once, children before the
    /// tree referencing them.
    pub fn write_to<F>(&self, store: &mut F) -> Result<ObjectId>
    where
        F: FnMut(&Tree) -> Result<ObjectId>,
    {
        let mut tree = Tree::default();
        for (name, node) in &self.nodes {
            let entry = match node {
                Node::Leaf(entry) => entry.clone(),
                Node::Dir(subtree) => {
                    TreeEntry::new(EntryMode::Directory, subtree.write_to(store)?)
                }
            };
            tree.insert(name.clone(), entry);
        }

        store(&tree)
    }
}

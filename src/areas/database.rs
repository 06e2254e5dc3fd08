//! Content-addressed object store.
//!
//! Objects live zlib-compressed under `objects/<2-char>/<38-char>`, keyed by
//! the SHA-1 of their serialized form. Storage is append-only: storing an
//! object that already exists is a no-op (identical content hashes to the
//! identical path), and nothing here ever updates or deletes an object.
//! Writes go through a temporary file renamed into place, so a reader never
//! observes a half-written object.

use crate::artifacts::diff::tree_diff::{ChangeSet, TreeDiff};
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::{Commit, SlimCommit};
use crate::artifacts::objects::object::{Object, ObjectBox, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::{Tree, TreeEntry};
use crate::error::{Error, Result};
use bytes::Bytes;
use fake::rand;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, Cursor, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct Database {
    path: Box<Path>,
}

impl Database {
    pub fn new(path: Box<Path>) -> Self {
        Database { path }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    /// Store an object and return its id. Idempotent: an object already in
    /// the store is not rewritten.
    pub fn store(&self, object: impl Object) -> Result<ObjectId> {
        let object_id = object.object_id()?;
        let object_path = self.path.join(object_id.to_path());

        if !object_path.exists() {
            let parent = object_path
                .parent()
                .ok_or_else(|| Error::storage(format!("invalid object path {object_path:?}")))?;
            std::fs::create_dir_all(parent)?;

            self.write_object(object_path, object.serialize()?)?;
        }

        Ok(object_id)
    }

    pub fn exists(&self, object_id: &ObjectId) -> bool {
        self.path.join(object_id.to_path()).exists()
    }

    /// Raw decompressed payload of an object, header included.
    pub fn load(&self, object_id: &ObjectId) -> Result<Bytes> {
        self.read_object(object_id)
    }

    pub fn parse_object(&self, object_id: &ObjectId) -> Result<ObjectBox> {
        let (object_type, reader) = self.parse_object_as_bytes(object_id)?;

        match object_type {
            ObjectType::Blob => Ok(ObjectBox::Blob(Box::new(Blob::deserialize(reader)?))),
            ObjectType::Tree => Ok(ObjectBox::Tree(Box::new(Tree::deserialize(reader)?))),
            ObjectType::Commit => Ok(ObjectBox::Commit(Box::new(Commit::deserialize(reader)?))),
        }
    }

    pub fn parse_object_as_blob(&self, object_id: &ObjectId) -> Result<Option<Blob>> {
        let (object_type, reader) = self.parse_object_as_bytes(object_id)?;

        match object_type {
            ObjectType::Blob => Ok(Some(Blob::deserialize(reader)?)),
            _ => Ok(None),
        }
    }

    pub fn parse_object_as_tree(&self, object_id: &ObjectId) -> Result<Option<Tree>> {
        let (object_type, reader) = self.parse_object_as_bytes(object_id)?;

        match object_type {
            ObjectType::Tree => Ok(Some(Tree::deserialize(reader)?)),
            _ => Ok(None),
        }
    }

    pub fn parse_object_as_commit(&self, object_id: &ObjectId) -> Result<Option<Commit>> {
        let (object_type, reader) = self.parse_object_as_bytes(object_id)?;

        match object_type {
            ObjectType::Commit => Ok(Some(Commit::deserialize(reader)?)),
            _ => Ok(None),
        }
    }

    pub fn object_type_of(&self, object_id: &ObjectId) -> Result<ObjectType> {
        let (object_type, _) = self.parse_object_as_bytes(object_id)?;
        Ok(object_type)
    }

    /// Path-level diff between two snapshots (tree or commit ids; `None` is
    /// the empty snapshot).
    pub fn tree_diff(&self, old: Option<&ObjectId>, new: Option<&ObjectId>) -> Result<ChangeSet> {
        let mut tree_diff = TreeDiff::new(self);
        tree_diff.compare_oids(old, new, Path::new(""))?;
        Ok(tree_diff.into_changes())
    }

    /// Flatten a snapshot into a `path → entry` map of its blobs.
    pub fn flatten_tree(&self, oid: &ObjectId) -> Result<BTreeMap<PathBuf, TreeEntry>> {
        let mut entries = BTreeMap::new();
        self.flatten_tree_into(oid, Path::new(""), &mut entries)?;
        Ok(entries)
    }

    fn flatten_tree_into(
        &self,
        oid: &ObjectId,
        prefix: &Path,
        entries: &mut BTreeMap<PathBuf, TreeEntry>,
    ) -> Result<()> {
        match self.parse_object(oid)? {
            ObjectBox::Commit(commit) => {
                self.flatten_tree_into(commit.tree_oid(), prefix, entries)
            }
            ObjectBox::Tree(tree) => {
                for (name, entry) in tree.into_entries() {
                    let path = prefix.join(&name);
                    if entry.is_tree() {
                        self.flatten_tree_into(&entry.oid, &path, entries)?;
                    } else {
                        entries.insert(path, entry);
                    }
                }
                Ok(())
            }
            ObjectBox::Blob(_) => Err(Error::storage(format!("object {oid} is not a tree"))),
        }
    }

    /// Walk a snapshot to the entry at `path`, if any.
    pub fn tree_entry_at(&self, oid: &ObjectId, path: &Path) -> Result<Option<TreeEntry>> {
        let mut components = path
            .components()
            .map(|component| {
                component
                    .as_os_str()
                    .to_str()
                    .ok_or_else(|| Error::storage(format!("non-UTF-8 path {path:?}")))
            })
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .peekable();

        let mut current = match self.parse_object(oid)? {
            ObjectBox::Commit(commit) => self
                .parse_object_as_tree(commit.tree_oid())?
                .ok_or_else(|| Error::storage(format!("commit {oid} has no tree")))?,
            ObjectBox::Tree(tree) => *tree,
            ObjectBox::Blob(_) => return Err(Error::storage(format!("object {oid} is not a tree"))),
        };

        while let Some(name) = components.next() {
            let Some(entry) = current.get(name) else {
                return Ok(None);
            };

            if components.peek().is_none() {
                return Ok(Some(entry.clone()));
            }
            if !entry.is_tree() {
                return Ok(None); // a file where a directory is needed
            }

            current = self
                .parse_object_as_tree(&entry.oid)?
                .ok_or_else(|| Error::NotFound(entry.oid.clone()))?;
        }

        Ok(None)
    }

    /// All object ids starting with the given hexadecimal prefix.
    ///
    /// The caller guarantees a prefix of at least two characters, so only a
    /// single fan-out directory has to be scanned.
    pub fn find_objects_by_prefix(&self, prefix: &str) -> Result<Vec<ObjectId>> {
        let mut matches = Vec::new();
        if prefix.len() < 2 {
            return Ok(matches);
        }

        let (dir_name, file_prefix) = prefix.split_at(2);
        let dir_path = self.path.join(dir_name);
        if !dir_path.is_dir() {
            return Ok(matches);
        }

        for entry in std::fs::read_dir(&dir_path)? {
            let file_name = entry?.file_name();
            let file_name = file_name.to_string_lossy();

            if file_name.starts_with(file_prefix)
                && let Ok(oid) = ObjectId::try_parse(format!("{dir_name}{file_name}"))
            {
                matches.push(oid);
            }
        }

        Ok(matches)
    }

    fn parse_object_as_bytes(&self, object_id: &ObjectId) -> Result<(ObjectType, impl BufRead)> {
        let content = self.read_object(object_id)?;
        let mut reader = Cursor::new(content);

        let object_type = ObjectType::parse_header(&mut reader)?;

        Ok((object_type, reader))
    }

    fn read_object(&self, object_id: &ObjectId) -> Result<Bytes> {
        let object_path = self.path.join(object_id.to_path());

        let compressed = std::fs::read(&object_path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(object_id.clone())
            } else {
                Error::storage(err)
            }
        })?;

        Self::decompress(compressed.into())
    }

    fn write_object(&self, object_path: PathBuf, content: Bytes) -> Result<()> {
        let object_dir = object_path
            .parent()
            .ok_or_else(|| Error::storage(format!("invalid object path {object_path:?}")))?;
        let temp_path = object_dir.join(Self::generate_temp_name());

        let compressed = Self::compress(content)?;

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(&compressed)?;

        // rename makes the object visible atomically
        std::fs::rename(&temp_path, &object_path)?;

        Ok(())
    }

    fn compress(data: Bytes) -> Result<Bytes> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&data)?;

        Ok(encoder.finish()?.into())
    }

    fn decompress(data: Bytes) -> Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(&*data);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;

        Ok(decompressed.into())
    }

    fn generate_temp_name() -> String {
        format!("tmp-obj-{}", rand::random::<u32>())
    }
}

/// Memoized slim-commit loads for graph walks.
///
/// Merge-base search and log traversal revisit the same commits many times;
/// this keeps each one's parent list and timestamp after the first load.
#[derive(Debug, Default)]
pub struct CommitCache {
    cache: RefCell<HashMap<ObjectId, SlimCommit>>,
}

impl CommitCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&self, database: &Database, oid: &ObjectId) -> Result<SlimCommit> {
        if let Some(slim) = self.cache.borrow().get(oid) {
            return Ok(slim.clone());
        }

        let commit = database
            .parse_object_as_commit(oid)?
            .ok_or_else(|| Error::NoSuchCommit(oid.to_string()))?;
        let slim = SlimCommit {
            oid: oid.clone(),
            parents: commit.parents().to_vec(),
            timestamp: commit.timestamp(),
        };

        self.cache.borrow_mut().insert(oid.clone(), slim.clone());
        Ok(slim)
    }
}

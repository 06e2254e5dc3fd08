//! One staging-index entry: `path → (blob id, mode, staged-at)`.

use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::objects::object::{Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::error::{Error, Result};
use byteorder::{ByteOrder, NetworkEndian, WriteBytesExt};
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use std::io::{BufRead, Read, Write};
use std::path::PathBuf;

/// Alignment block for serialized entries (bytes)
pub const ENTRY_BLOCK: usize = 8;

/// Smallest possible serialized entry: fixed fields plus one path byte and
/// its NUL terminator, rounded up to the alignment block
pub const ENTRY_MIN_SIZE: usize = 40;

/// Fixed-size prefix of a serialized entry: mode (4) + seconds (8) +
/// nanoseconds (4) + blob id (20)
const ENTRY_FIXED_SIZE: usize = 36;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingEntry {
    /// Path relative to the repository root
    pub path: PathBuf,
    /// Blob id of the staged content
    pub oid: ObjectId,
    /// File mode recorded for the next snapshot
    pub mode: EntryMode,
    /// When the entry was (re-)staged
    pub staged_at: DateTime<Utc>,
}

impl StagingEntry {
    pub fn new(path: PathBuf, oid: ObjectId, mode: EntryMode) -> Self {
        StagingEntry {
            path,
            oid,
            mode,
            staged_at: Utc::now(),
        }
    }
}

impl Packable for StagingEntry {
    fn serialize(&self) -> Result<Bytes> {
        let path = self
            .path
            .to_str()
            .ok_or_else(|| Error::storage(format!("non-UTF-8 staged path {:?}", self.path)))?;

        let mut entry_bytes = Vec::with_capacity(ENTRY_FIXED_SIZE + path.len() + ENTRY_BLOCK);
        entry_bytes.write_u32::<NetworkEndian>(self.mode.as_u32())?;
        entry_bytes.write_i64::<NetworkEndian>(self.staged_at.timestamp())?;
        entry_bytes.write_u32::<NetworkEndian>(self.staged_at.timestamp_subsec_nanos())?;
        self.oid.write_binary_to(&mut entry_bytes)?;
        entry_bytes.write_all(path.as_bytes())?;

        // NUL-terminate the path, then pad to the alignment block
        entry_bytes.push(0);
        while entry_bytes.len() % ENTRY_BLOCK != 0 {
            entry_bytes.push(0);
        }

        Ok(Bytes::from(entry_bytes))
    }
}

impl Unpackable for StagingEntry {
    fn deserialize(mut reader: impl BufRead) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        if bytes.len() < ENTRY_MIN_SIZE {
            return Err(Error::storage("truncated staging-index entry"));
        }

        let mode = EntryMode::from_u32(NetworkEndian::read_u32(&bytes[0..4]))?;
        let seconds = NetworkEndian::read_i64(&bytes[4..12]);
        let nanos = NetworkEndian::read_u32(&bytes[12..16]);
        let mut oid_reader = std::io::Cursor::new(&bytes[16..36]);
        let oid = ObjectId::read_binary_from(&mut oid_reader)?;

        let staged_at = Utc
            .timestamp_opt(seconds, nanos)
            .single()
            .ok_or_else(|| Error::storage("staging-index entry has an invalid timestamp"))?;

        let name_end = bytes[ENTRY_FIXED_SIZE..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::storage("staging-index entry path is not NUL-terminated"))?;
        let path = std::str::from_utf8(&bytes[ENTRY_FIXED_SIZE..ENTRY_FIXED_SIZE + name_end])?;

        Ok(StagingEntry {
            path: PathBuf::from(path),
            oid,
            mode,
            staged_at,
        })
    }
}

//! Staging-index file format.
//!
//! The staging index records which file versions go into the next commit:
//! one entry per path, pointing at a blob id with a mode and the time the
//! entry was staged. It is a mutable pointer table, not a content-addressed
//! object.
//!
//! ## File format (version 1)
//!
//! ```text
//! Header (12 bytes):
//!   - Signature: "STAG" (4 bytes)
//!   - Version: 1 (4 bytes)
//!   - Entry count (4 bytes)
//!
//! Entries (variable length, each padded to 8-byte alignment):
//!   - mode (4), staged-at seconds (8), staged-at nanoseconds (4)
//!   - blob id (20 bytes, binary)
//!   - path, NUL-terminated
//!
//! Checksum (20 bytes):
//!   - SHA-1 over all preceding bytes
//! ```

pub mod checksum;
pub mod entry_mode;
pub mod staging_entry;

/// Size of the SHA-1 trailer in bytes
pub const CHECKSUM_SIZE: usize = 20;

/// Size of the index header in bytes
pub const HEADER_SIZE: usize = 12;

/// Magic signature identifying staging-index files
pub const SIGNATURE: &str = "STAG";

/// Staging-index file format version
pub const VERSION: u32 = 1;

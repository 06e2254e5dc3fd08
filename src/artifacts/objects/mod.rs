//! Content-addressed object types.
//!
//! Everything the engine stores is one of three object kinds, identified by
//! the SHA-1 of its serialized form:
//!
//! - **Blob**: the bytes of one file version
//! - **Tree**: one directory snapshot, referencing blobs and subtrees by id
//! - **Commit**: a tree snapshot plus parent links and metadata
//!
//! All objects serialize as `<kind> <size>\0<payload>`. The kind tag is part
//! of the hashed preimage, so a blob and a tree with identical payload bytes
//! can never share an id.

pub mod blob;
pub mod commit;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod tree;

/// Length of an object id in hexadecimal form
pub const OBJECT_ID_LENGTH: usize = 40;

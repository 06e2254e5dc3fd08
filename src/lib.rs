//! strata — a local, single-user version-control engine.
//!
//! Snapshots of a working tree are stored as immutable, content-addressed
//! objects (blobs, trees, commits). Commits link snapshots into an acyclic
//! history graph; branches and HEAD are mutable pointers into that graph.
//!
//! The crate is organised in two layers:
//!
//! - [`artifacts`]: the object model and pure algorithms (hashing, tree
//!   building, line and tree diffing, merge-base search, history walks)
//! - [`areas`]: the stateful engines built on top of them (object store,
//!   staging index, refs, working tree, and the [`Repository`] facade)
//!
//! All fallible operations return [`error::Result`], whose error type is the
//! closed set of failure kinds a front end has to render. The engine itself
//! never writes user-facing text.

pub mod areas;
pub mod artifacts;
pub mod error;

pub use areas::repository::Repository;
pub use error::{Error, Result};

//! Object model and pure algorithms.
//!
//! - `objects`: content-addressed object types (blob, tree, commit)
//! - `index`: staging-index entry types and the index file codec
//! - `branch`: branch names and revision expressions
//! - `diff`: Myers' line diff and tree-level diffing
//! - `merge`: merge-base search and three-way classification
//! - `log`: history traversal
//! - `status`: working-tree status classification

pub mod branch;
pub mod diff;
pub mod index;
pub mod log;
pub mod merge;
pub mod objects;
pub mod status;

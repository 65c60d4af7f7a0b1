//! Workspace root, path normalization and the disk-backed CRUD store.
//!
//! This module provides:
//! - `WorkspaceRoot` / `RelativePath` path handling with escape rejection
//! - `TreeEntry` listing projections in directory-first order
//! - `WorkspaceStore` list/read/write/create/delete/rename/tree operations

mod entry;
mod path;
mod store;

pub use entry::{listing_order, sort_entries, EntryKind, TreeEntry};
pub use path::{RelativePath, WorkspaceRoot};
pub use store::{WorkspaceStore, MAX_TREE_DEPTH};

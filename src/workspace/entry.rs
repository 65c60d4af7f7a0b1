//! Directory listing entries.

use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::path::RelativePath;

/// Kind of a tree entry. Directories order before files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Dir,
    File,
}

/// One entry of a directory listing, projected from disk on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub path: RelativePath,
    /// File size in bytes (files only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Last modification time (files only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    /// Nested entries, populated only by recursive tree listings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeEntry>>,
}

impl TreeEntry {
    /// Build an entry from the current state of `full`.
    ///
    /// Symlinks are followed; a dangling link is reported as a file. Returns
    /// `None` if the entry vanished between the directory read and the stat.
    #[must_use]
    pub fn from_path(name: String, path: RelativePath, full: &Path) -> Option<Self> {
        let meta = fs::metadata(full)
            .or_else(|_| fs::symlink_metadata(full))
            .map_err(|e| tracing::debug!(path = %full.display(), error = %e, "Skipping entry"))
            .ok()?;

        if meta.is_dir() {
            return Some(Self {
                name,
                kind: EntryKind::Dir,
                path,
                size: None,
                modified: None,
                children: None,
            });
        }

        Some(Self {
            name,
            kind: EntryKind::File,
            path,
            size: Some(meta.len()),
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
            children: None,
        })
    }

    /// Whether this entry is a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// Listing order: directories first, then files, each by name.
#[must_use]
pub fn listing_order(a: &TreeEntry, b: &TreeEntry) -> Ordering {
    a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name))
}

/// Sort entries into listing order.
pub fn sort_entries(entries: &mut [TreeEntry]) {
    entries.sort_by(listing_order);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(name: &str, kind: EntryKind) -> TreeEntry {
        TreeEntry {
            name: name.to_string(),
            kind,
            path: RelativePath::parse(name).unwrap(),
            size: None,
            modified: None,
            children: None,
        }
    }

    #[test]
    fn test_sort_dirs_first_then_name() {
        let mut entries = vec![
            entry("b.txt", EntryKind::File),
            entry("sub", EntryKind::Dir),
            entry("a.txt", EntryKind::File),
            entry("alpha", EntryKind::Dir),
        ];
        sort_entries(&mut entries);

        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "sub", "a.txt", "b.txt"]);
    }

    #[test]
    fn test_from_path_file_has_size_and_mtime() {
        let tmp = TempDir::new().unwrap();
        let full = tmp.path().join("notes.md");
        fs::write(&full, "hello").unwrap();

        let e = TreeEntry::from_path(
            "notes.md".to_string(),
            RelativePath::parse("notes.md").unwrap(),
            &full,
        )
        .unwrap();
        assert_eq!(e.kind, EntryKind::File);
        assert_eq!(e.size, Some(5));
        assert!(e.modified.is_some());
    }

    #[test]
    fn test_from_path_dir_omits_file_fields() {
        let tmp = TempDir::new().unwrap();
        let e = TreeEntry::from_path("d".to_string(), RelativePath::root(), tmp.path()).unwrap();
        assert!(e.is_dir());

        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["type"], "dir");
        assert!(json.get("size").is_none());
        assert!(json.get("modified").is_none());
    }

    #[test]
    fn test_from_path_vanished() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("gone");
        assert!(TreeEntry::from_path("gone".to_string(), RelativePath::root(), &missing).is_none());
    }
}

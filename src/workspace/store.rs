//! CRUD operations on the workspace tree.
//!
//! Every operation validates its path against the root before touching disk
//! and performs exactly one disk mutation. Nothing here notifies clients: the
//! watcher observes these mutations like any other.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use walkdir::WalkDir;

use super::entry::{sort_entries, TreeEntry};
use super::path::{RelativePath, WorkspaceRoot};
use crate::error::WorkspaceError;
use crate::watcher::NoiseFilter;

/// Default and maximum depth of recursive tree listings.
pub const MAX_TREE_DEPTH: usize = 3;

/// Directory names skipped by recursive tree listings.
const TREE_SKIP_DIRS: &[&str] = &[
    "node_modules",
    "__pycache__",
    "target",
    "dist",
    "build",
    "venv",
];

type StoreResult<T> = std::result::Result<T, WorkspaceError>;

/// Disk-backed workspace store.
#[derive(Debug, Clone)]
pub struct WorkspaceStore {
    root: WorkspaceRoot,
}

impl WorkspaceStore {
    /// Create a store over an opened root.
    #[must_use]
    pub const fn new(root: WorkspaceRoot) -> Self {
        Self { root }
    }

    /// The workspace root.
    #[must_use]
    pub const fn root(&self) -> &WorkspaceRoot {
        &self.root
    }

    /// List the immediate children of a directory, in listing order.
    ///
    /// # Errors
    ///
    /// `NotFound` if the path is absent, `NotADirectory` if it is a file.
    pub fn list(&self, path: &str) -> StoreResult<Vec<TreeEntry>> {
        let rel = RelativePath::parse(path)?;
        let full = self.root.resolve(&rel)?;

        let meta = stat(&full, &rel)?;
        if !meta.is_dir() {
            return Err(WorkspaceError::NotADirectory(rel.to_string()));
        }

        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&full).map_err(|e| WorkspaceError::io(&full, e))? {
            let dir_entry = dir_entry.map_err(|e| WorkspaceError::io(&full, e))?;
            let Ok(name) = dir_entry.file_name().into_string() else {
                tracing::debug!(dir = %full.display(), "Skipping non UTF-8 entry");
                continue;
            };
            let child = rel.join(&name);
            if let Some(entry) = TreeEntry::from_path(name, child, &dir_entry.path()) {
                entries.push(entry);
            }
        }

        sort_entries(&mut entries);
        Ok(entries)
    }

    /// Read a file as UTF-8 text.
    ///
    /// # Errors
    ///
    /// `NotFound` if the path is absent or is a directory.
    pub fn read(&self, path: &str) -> StoreResult<String> {
        let rel = RelativePath::parse(path)?;
        let full = self.root.resolve(&rel)?;

        if stat(&full, &rel)?.is_dir() {
            return Err(WorkspaceError::NotFound(rel.to_string()));
        }

        fs::read_to_string(&full).map_err(|e| WorkspaceError::io(&full, e))
    }

    /// Overwrite a file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// `InvalidPath` for the root, `Io` on any disk failure.
    pub fn write(&self, path: &str, content: &str) -> StoreResult<()> {
        let rel = non_root(RelativePath::parse(path)?)?;
        let full = self.root.resolve(&rel)?;

        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| WorkspaceError::io(parent, e))?;
        }
        fs::write(&full, content).map_err(|e| WorkspaceError::io(&full, e))?;

        tracing::debug!(path = %rel, bytes = content.len(), "Wrote file");
        Ok(())
    }

    /// Create a file or directory named `name` under `parent`.
    ///
    /// Directories are created with their ancestors and an existing directory
    /// is not an error. Files are created or truncated.
    ///
    /// # Errors
    ///
    /// `InvalidName` if `name` is empty or not a single segment.
    pub fn create(
        &self,
        parent: &str,
        name: &str,
        is_dir: bool,
        content: &str,
    ) -> StoreResult<()> {
        validate_name(name)?;
        let rel = RelativePath::parse(parent)?.join(name);
        let full = self.root.resolve(&rel)?;

        if is_dir {
            fs::create_dir_all(&full).map_err(|e| WorkspaceError::io(&full, e))?;
        } else {
            if let Some(dir) = full.parent() {
                fs::create_dir_all(dir).map_err(|e| WorkspaceError::io(dir, e))?;
            }
            fs::write(&full, content).map_err(|e| WorkspaceError::io(&full, e))?;
        }

        tracing::debug!(path = %rel, is_dir, "Created entry");
        Ok(())
    }

    /// Delete a file, or a directory and everything beneath it.
    ///
    /// A symlink is removed itself, never its target.
    ///
    /// # Errors
    ///
    /// `NotFound` if the path is absent, `InvalidPath` for the root.
    pub fn delete(&self, path: &str) -> StoreResult<()> {
        let rel = non_root(RelativePath::parse(path)?)?;
        let full = self.root.resolve_entry(&rel)?;

        let meta = lstat(&full, &rel)?;
        if meta.is_dir() {
            fs::remove_dir_all(&full)
        } else {
            fs::remove_file(&full)
        }
        .map_err(|e| not_found_or_io(e, &full, &rel))?;

        tracing::debug!(path = %rel, "Deleted entry");
        Ok(())
    }

    /// Rename an entry within its parent directory.
    ///
    /// # Errors
    ///
    /// `NotFound` if the source is absent, `InvalidName` for a bad new name,
    /// `AlreadyExists` if the target exists.
    pub fn rename(&self, path: &str, new_name: &str) -> StoreResult<()> {
        validate_name(new_name)?;
        let rel = non_root(RelativePath::parse(path)?)?;
        let full = self.root.resolve_entry(&rel)?;
        lstat(&full, &rel)?;

        let dest = rel.parent().join(new_name);
        if dest == rel {
            return Ok(());
        }
        let dest_full = self.root.resolve_entry(&dest)?;
        if fs::symlink_metadata(&dest_full).is_ok() {
            return Err(WorkspaceError::AlreadyExists(dest.to_string()));
        }

        fs::rename(&full, &dest_full).map_err(|e| not_found_or_io(e, &full, &rel))?;

        tracing::debug!(from = %rel, to = %dest, "Renamed entry");
        Ok(())
    }

    /// Recursive listing with nested `children`, at most `max_depth` levels.
    ///
    /// Hidden entries and bulky build/dependency directories are skipped.
    /// `max_depth` is clamped to `1..=MAX_TREE_DEPTH`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the path is absent, `NotADirectory` if it is a file.
    pub fn tree(&self, path: &str, max_depth: Option<usize>) -> StoreResult<Vec<TreeEntry>> {
        let rel = RelativePath::parse(path)?;
        let full = self.root.resolve(&rel)?;
        if !stat(&full, &rel)?.is_dir() {
            return Err(WorkspaceError::NotADirectory(rel.to_string()));
        }

        let depth = max_depth.unwrap_or(MAX_TREE_DEPTH).clamp(1, MAX_TREE_DEPTH);
        let walker = WalkDir::new(&full)
            .min_depth(1)
            .max_depth(depth)
            .into_iter()
            .filter_entry(|e| e.file_name().to_str().is_some_and(|n| !is_tree_noise(n)));

        let mut top = Vec::new();
        let mut open: Vec<(usize, TreeEntry)> = Vec::new();

        for item in walker {
            let dir_entry = match item {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping unreadable tree entry");
                    continue;
                }
            };
            close_finished(&mut open, &mut top, dir_entry.depth());

            let Some(child) = self.root.relativize(dir_entry.path()) else {
                continue;
            };
            let name = child.file_name().to_string();
            if let Some(mut entry) = TreeEntry::from_path(name, child, dir_entry.path()) {
                if entry.is_dir() {
                    entry.children = Some(Vec::new());
                }
                open.push((dir_entry.depth(), entry));
            }
        }
        close_finished(&mut open, &mut top, 1);

        sort_entries(&mut top);
        Ok(top)
    }
}

/// Pop every open entry at `depth` or deeper and attach it to its parent.
///
/// Walk order is depth-first, so once an entry at `depth` is seen, all open
/// entries at that depth or below are complete.
fn close_finished(open: &mut Vec<(usize, TreeEntry)>, top: &mut Vec<TreeEntry>, depth: usize) {
    while open.last().is_some_and(|(d, _)| *d >= depth) {
        let Some((_, mut done)) = open.pop() else {
            break;
        };
        if let Some(children) = done.children.as_mut() {
            sort_entries(children);
        }
        match open.last_mut() {
            Some((_, parent)) => parent.children.get_or_insert_with(Vec::new).push(done),
            None => top.push(done),
        }
    }
}

fn is_tree_noise(name: &str) -> bool {
    name.starts_with('.') || NoiseFilter::is_transient(name) || TREE_SKIP_DIRS.contains(&name)
}

fn validate_name(name: &str) -> StoreResult<()> {
    let bad_char = |c: char| matches!(c, '/' | '\\' | '\0');
    if name.is_empty() || name == "." || name == ".." || name.contains(bad_char) {
        return Err(WorkspaceError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn non_root(rel: RelativePath) -> StoreResult<RelativePath> {
    if rel.is_root() {
        return Err(WorkspaceError::invalid_path(
            "",
            "operation not allowed on the workspace root",
        ));
    }
    Ok(rel)
}

fn stat(full: &Path, rel: &RelativePath) -> StoreResult<fs::Metadata> {
    fs::metadata(full).map_err(|e| not_found_or_io(e, full, rel))
}

fn lstat(full: &Path, rel: &RelativePath) -> StoreResult<fs::Metadata> {
    fs::symlink_metadata(full).map_err(|e| not_found_or_io(e, full, rel))
}

fn not_found_or_io(e: std::io::Error, full: &Path, rel: &RelativePath) -> WorkspaceError {
    if e.kind() == ErrorKind::NotFound {
        WorkspaceError::NotFound(rel.to_string())
    } else {
        WorkspaceError::io(full, e)
    }
}

//! Workspace root and root-relative path normalization.

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::error::WorkspaceError;

/// Dangling symlinks followed before giving up, as the kernel's `ELOOP` limit.
const MAX_LINK_HOPS: u8 = 40;

/// Canonical, slash-separated path relative to the workspace root.
///
/// Never has a leading slash and never contains `.` or `..` segments. The
/// empty path denotes the root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RelativePath(String);

impl RelativePath {
    /// The workspace root itself.
    #[must_use]
    pub const fn root() -> Self {
        Self(String::new())
    }

    /// Parse a client-supplied path.
    ///
    /// Leading, trailing and repeated slashes are dropped, as are `.` segments.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` if the path contains a `..` segment or a NUL byte.
    pub fn parse(raw: &str) -> Result<Self, WorkspaceError> {
        let mut segments = Vec::new();
        for segment in raw.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    return Err(WorkspaceError::invalid_path(
                        raw,
                        "parent directory segments are not allowed",
                    ))
                }
                s if s.contains('\0') => {
                    return Err(WorkspaceError::invalid_path(raw, "contains a NUL byte"))
                }
                s => segments.push(s),
            }
        }
        Ok(Self(segments.join("/")))
    }

    /// The normalized string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the workspace root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Final segment, or `""` for the root.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// Parent directory; the root is its own parent.
    #[must_use]
    pub fn parent(&self) -> Self {
        match self.0.rfind('/') {
            Some(idx) => Self(self.0[..idx].to_string()),
            None => Self::root(),
        }
    }

    /// Append one already-validated segment.
    #[must_use]
    pub fn join(&self, name: &str) -> Self {
        if self.is_root() {
            Self(name.to_string())
        } else {
            Self(format!("{}/{name}", self.0))
        }
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The single directory every component operates under.
#[derive(Debug, Clone)]
pub struct WorkspaceRoot {
    path: PathBuf,
}

impl WorkspaceRoot {
    /// Open the workspace root, creating it if absent.
    ///
    /// The stored path is canonical so that watcher paths and resolved store
    /// paths share one prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or canonicalized.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        fs::create_dir_all(path)?;
        let path = fs::canonicalize(path)?;
        if !path.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a directory", path.display()),
            ));
        }
        Ok(Self { path })
    }

    /// Canonical absolute path of the root.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Join a relative path onto the root without any filesystem checks.
    #[must_use]
    pub fn join(&self, rel: &RelativePath) -> PathBuf {
        rel.segments().fold(self.path.clone(), |acc, s| acc.join(s))
    }

    /// Resolve a relative path to an absolute one, rejecting symlink escapes.
    ///
    /// The deepest existing ancestor of the target is canonicalized and must
    /// stay under the root. A dangling symlink along the way is followed to
    /// its target, which must stay under the root as well. Missing trailing
    /// segments are allowed so the result can be used for creation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` if the path resolves outside the root.
    pub fn resolve(&self, rel: &RelativePath) -> Result<PathBuf, WorkspaceError> {
        let full = self.join(rel);
        if self.contains(&full, MAX_LINK_HOPS) {
            return Ok(full);
        }
        Err(WorkspaceError::invalid_path(
            rel.as_str(),
            "resolves outside the workspace root",
        ))
    }

    /// Resolve the entry named by `rel` itself, without following a final
    /// symlink. Only its parent directory must resolve under the root.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` if the parent resolves outside the root.
    pub fn resolve_entry(&self, rel: &RelativePath) -> Result<PathBuf, WorkspaceError> {
        if rel.is_root() {
            return Ok(self.path.clone());
        }
        let parent = self.resolve(&rel.parent()).map_err(|_| {
            WorkspaceError::invalid_path(rel.as_str(), "resolves outside the workspace root")
        })?;
        Ok(parent.join(rel.file_name()))
    }

    fn contains(&self, path: &Path, hops: u8) -> bool {
        for ancestor in path.ancestors() {
            if let Ok(real) = fs::canonicalize(ancestor) {
                return real.starts_with(&self.path);
            }
            // Dangling link: writes through it land on its target.
            if let Ok(target) = fs::read_link(ancestor) {
                let Some(hops) = hops.checked_sub(1) else {
                    return false;
                };
                let base = ancestor.parent().unwrap_or(ancestor);
                return self.contains(&base.join(target), hops);
            }
        }
        false
    }

    /// Convert an absolute path reported by the OS into a relative path.
    ///
    /// Returns `None` for the root itself, for paths outside it, and for
    /// paths that are not valid UTF-8.
    #[must_use]
    pub fn relativize(&self, abs: &Path) -> Option<RelativePath> {
        let rest = abs.strip_prefix(&self.path).ok()?;
        let mut segments = Vec::new();
        for component in rest.components() {
            match component {
                Component::Normal(s) => segments.push(s.to_str()?),
                Component::CurDir => {}
                _ => return None,
            }
        }
        if segments.is_empty() {
            return None;
        }
        Some(RelativePath(segments.join("/")))
    }
}

//! Noise filtering for watcher events.

use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::workspace::RelativePath;
use crate::Result;

/// Suffixes left behind by editors while saving.
const TRANSIENT_SUFFIXES: &[&str] = &[".swp", ".swo", ".swx", ".tmp", ".crswap", "~"];

/// Exact names of transient files (vim's write-permission check).
const TRANSIENT_NAMES: &[&str] = &["4913"];

/// Stateless predicate deciding which paths are worth reporting.
#[derive(Debug, Clone, Default)]
pub struct NoiseFilter {
    gitignore: Option<Gitignore>,
}

impl NoiseFilter {
    /// Create a filter with only the built-in rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filter with additional gitignore-style patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if patterns are invalid.
    pub fn with_patterns(base_path: impl AsRef<Path>, patterns: &[&str]) -> Result<Self> {
        if patterns.is_empty() {
            return Ok(Self::new());
        }

        let mut builder = GitignoreBuilder::new(base_path.as_ref());
        for pattern in patterns {
            builder
                .add_line(None, pattern)
                .map_err(|e| crate::Error::config(format!("invalid pattern: {e}")))?;
        }

        let gitignore = builder
            .build()
            .map_err(|e| crate::Error::config(format!("failed to build ignore rules: {e}")))?;

        Ok(Self {
            gitignore: Some(gitignore),
        })
    }

    /// Whether events for this path should be processed.
    #[must_use]
    pub fn accepts(&self, path: &RelativePath) -> bool {
        if path.is_root() {
            return false;
        }

        if path.segments().any(|s| s.starts_with('.')) {
            return false;
        }

        if Self::is_transient(path.file_name()) {
            return false;
        }

        if let Some(ref gi) = self.gitignore {
            if gi
                .matched_path_or_any_parents(path.as_str(), false)
                .is_ignore()
            {
                return false;
            }
        }

        true
    }

    /// Check if a file name is an editor swap, backup or scratch file.
    #[must_use]
    pub fn is_transient(name: &str) -> bool {
        TRANSIENT_NAMES.contains(&name) || TRANSIENT_SUFFIXES.iter().any(|s| name.ends_with(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rel(s: &str) -> RelativePath {
        RelativePath::parse(s).unwrap()
    }

    #[test]
    fn test_accepts_regular_paths() {
        let filter = NoiseFilter::new();
        assert!(filter.accepts(&rel("notes.md")));
        assert!(filter.accepts(&rel("src/main.rs")));
        assert!(filter.accepts(&rel("dir/with.dots/file")));
    }

    #[test]
    fn test_rejects_hidden_segments() {
        let filter = NoiseFilter::new();
        assert!(!filter.accepts(&rel(".env")));
        assert!(!filter.accepts(&rel(".git/HEAD")));
        assert!(!filter.accepts(&rel("src/.cache/entry")));
    }

    #[test]
    fn test_rejects_transient_editor_files() {
        let filter = NoiseFilter::new();
        assert!(!filter.accepts(&rel("main.rs.swp")));
        assert!(!filter.accepts(&rel("main.rs~")));
        assert!(!filter.accepts(&rel("src/4913")));
        assert!(!filter.accepts(&rel("out.tmp")));
        assert!(filter.accepts(&rel("swp.md")));
    }

    #[test]
    fn test_rejects_root() {
        assert!(!NoiseFilter::new().accepts(&RelativePath::root()));
    }

    #[test]
    fn test_filter_with_patterns() {
        let tmp = TempDir::new().unwrap();
        let filter = NoiseFilter::with_patterns(tmp.path(), &["*.log", "build/"]).unwrap();

        assert!(filter.accepts(&rel("main.rs")));
        assert!(!filter.accepts(&rel("debug.log")));
        assert!(!filter.accepts(&rel("logs/debug.log")));
        assert!(!filter.accepts(&rel("build/out/app.js")));
    }

    #[test]
    fn test_unclosed_alternate_is_config_error() {
        let tmp = TempDir::new().unwrap();
        let result = NoiseFilter::with_patterns(tmp.path(), &["*.log", "{a,b"]);
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_with_no_patterns_is_default() {
        let tmp = TempDir::new().unwrap();
        let filter = NoiseFilter::with_patterns(tmp.path(), &[]).unwrap();
        assert!(filter.accepts(&rel("debug.log")));
    }
}

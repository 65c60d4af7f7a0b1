//! File system event types: raw notifier events and logical change events.

#![allow(clippy::missing_const_for_fn)]

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::EventKind;
use serde::{Deserialize, Serialize};

use crate::workspace::RelativePath;

/// Class of a logical change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
    Moved,
}

impl ChangeKind {
    /// Lowercase name, as used on the wire and in metric labels.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Moved => "moved",
        }
    }
}

/// A deduplicated, classified change delivered to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub path: RelativePath,
    /// Destination, only for `moved`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_path: Option<RelativePath>,
    /// When the change was observed.
    pub timestamp: DateTime<Utc>,
}

/// A classified change that has not been through the coalescer yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChange {
    pub kind: ChangeKind,
    pub path: RelativePath,
    pub dest_path: Option<RelativePath>,
}

impl PendingChange {
    #[must_use]
    pub fn created(path: RelativePath) -> Self {
        Self::simple(ChangeKind::Created, path)
    }

    #[must_use]
    pub fn modified(path: RelativePath) -> Self {
        Self::simple(ChangeKind::Modified, path)
    }

    #[must_use]
    pub fn deleted(path: RelativePath) -> Self {
        Self::simple(ChangeKind::Deleted, path)
    }

    #[must_use]
    pub fn moved(from: RelativePath, to: RelativePath) -> Self {
        Self {
            kind: ChangeKind::Moved,
            path: from,
            dest_path: Some(to),
        }
    }

    fn simple(kind: ChangeKind, path: RelativePath) -> Self {
        Self {
            kind,
            path,
            dest_path: None,
        }
    }

    /// Key used by the logical-event dedup window.
    #[must_use]
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            kind: self.kind,
            path: self.path.clone(),
            dest_path: self.dest_path.clone().unwrap_or_default(),
        }
    }

    /// Stamp the change with its observation time.
    #[must_use]
    pub fn into_event(self, timestamp: DateTime<Utc>) -> ChangeEvent {
        ChangeEvent {
            kind: self.kind,
            path: self.path,
            dest_path: self.dest_path,
            timestamp,
        }
    }
}

/// `(kind, path, dest_path-or-empty)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub kind: ChangeKind,
    pub path: RelativePath,
    pub dest_path: RelativePath,
}

/// Notifier classification, reduced to what the pipeline distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    Create,
    Modify,
    Remove,
    /// Source half of a rename.
    RenameFrom,
    /// Destination half of a rename.
    RenameTo,
    /// Both halves in one event: `[from, to]`.
    RenameBoth,
    /// Rename the backend could not correlate.
    RenameAny,
    /// Non-mutating access (open, read, close without write).
    Access,
    /// Anything the notifier could not classify.
    Other,
}

/// One event as reported by the OS notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: RawKind,
    pub paths: Vec<PathBuf>,
    /// Cookie linking the halves of a rename.
    pub tracker: Option<usize>,
}

impl RawEvent {
    /// Create a raw event for a single path.
    #[must_use]
    pub fn new(kind: RawKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            paths: vec![path.into()],
            tracker: None,
        }
    }

    /// Attach a rename tracker.
    #[must_use]
    pub fn with_tracker(mut self, tracker: usize) -> Self {
        self.tracker = Some(tracker);
        self
    }
}

impl From<notify::Event> for RawEvent {
    fn from(event: notify::Event) -> Self {
        let kind = match event.kind {
            EventKind::Create(_) => RawKind::Create,
            EventKind::Remove(_) => RawKind::Remove,
            EventKind::Modify(ModifyKind::Name(mode)) => match mode {
                RenameMode::From => RawKind::RenameFrom,
                RenameMode::To => RawKind::RenameTo,
                RenameMode::Both => RawKind::RenameBoth,
                RenameMode::Any | RenameMode::Other => RawKind::RenameAny,
            },
            EventKind::Modify(_) | EventKind::Access(AccessKind::Close(AccessMode::Write)) => {
                RawKind::Modify
            }
            EventKind::Access(_) => RawKind::Access,
            EventKind::Any | EventKind::Other => RawKind::Other,
        };
        let tracker = event.tracker();

        Self {
            kind,
            paths: event.paths,
            tracker,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};

    fn rel(s: &str) -> RelativePath {
        RelativePath::parse(s).unwrap()
    }

    #[test]
    fn test_raw_event_from_notify_kinds() {
        let cases = [
            (EventKind::Create(CreateKind::File), RawKind::Create),
            (EventKind::Remove(RemoveKind::Any), RawKind::Remove),
            (
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                RawKind::Modify,
            ),
            (
                EventKind::Access(AccessKind::Close(AccessMode::Write)),
                RawKind::Modify,
            ),
            (
                EventKind::Access(AccessKind::Open(AccessMode::Read)),
                RawKind::Access,
            ),
            (
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
                RawKind::RenameBoth,
            ),
            (
                EventKind::Modify(ModifyKind::Name(RenameMode::Any)),
                RawKind::RenameAny,
            ),
            (EventKind::Other, RawKind::Other),
        ];

        for (kind, expected) in cases {
            let raw = RawEvent::from(notify::Event::new(kind).add_path("/ws/a.txt".into()));
            assert_eq!(raw.kind, expected, "{kind:?}");
            assert_eq!(raw.paths, vec![PathBuf::from("/ws/a.txt")]);
        }
    }

    #[test]
    fn test_raw_event_keeps_tracker() {
        let event = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::From)))
            .add_path("/ws/a.txt".into())
            .set_tracker(7);
        let raw = RawEvent::from(event);
        assert_eq!(raw.kind, RawKind::RenameFrom);
        assert_eq!(raw.tracker, Some(7));
    }

    #[test]
    fn test_dedup_key_uses_empty_dest() {
        let key = PendingChange::modified(rel("a.txt")).dedup_key();
        assert_eq!(key.dest_path, RelativePath::root());

        let moved = PendingChange::moved(rel("a.txt"), rel("b.txt")).dedup_key();
        assert_eq!(moved.dest_path.as_str(), "b.txt");
        assert_ne!(key, moved);
    }

    #[test]
    fn test_change_event_wire_format() {
        let ts = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let event = PendingChange::moved(rel("a.txt"), rel("b.txt")).into_event(ts);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "moved",
                "path": "a.txt",
                "dest_path": "b.txt",
                "timestamp": "2026-01-02T03:04:05Z"
            })
        );

        let plain = PendingChange::deleted(rel("x")).into_event(ts);
        let json = serde_json::to_value(&plain).unwrap();
        assert!(json.get("dest_path").is_none());
    }
}

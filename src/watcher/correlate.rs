//! Pairing of rename halves into single moves.
//!
//! Backends differ in what they report for a rename. inotify emits a `From`
//! and a `To` event sharing a cookie, followed by a combined `Both`. FSEvents
//! and Windows report uncorrelated `Any` events, which the pipeline turns into
//! `created`/`deleted` by probing the disk.

use std::time::{Duration, Instant};

use crate::workspace::RelativePath;

/// How long a `From` half waits for its `To` half.
pub const RENAME_PAIR_WINDOW: Duration = Duration::from_millis(100);

/// Result of correlating a rename. `None` sides are outside the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOutcome {
    pub from: Option<RelativePath>,
    pub to: Option<RelativePath>,
}

#[derive(Debug)]
struct HeldSource {
    tracker: usize,
    path: Option<RelativePath>,
    deadline: Instant,
}

/// Holds unmatched rename sources until their destination arrives or the
/// pairing window lapses.
#[derive(Debug)]
pub struct RenameCorrelator {
    window: Duration,
    held: Vec<HeldSource>,
}

impl Default for RenameCorrelator {
    fn default() -> Self {
        Self::new(RENAME_PAIR_WINDOW)
    }
}

impl RenameCorrelator {
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            held: Vec::new(),
        }
    }

    /// Source half. Held when it has a tracker, otherwise a plain removal.
    pub fn source(
        &mut self,
        tracker: Option<usize>,
        path: Option<RelativePath>,
        now: Instant,
    ) -> Option<RenameOutcome> {
        match tracker {
            Some(tracker) => {
                self.held.push(HeldSource {
                    tracker,
                    path,
                    deadline: now + self.window,
                });
                None
            }
            None => Some(RenameOutcome { from: path, to: None }),
        }
    }

    /// Destination half. Pairs with a held source of the same tracker,
    /// otherwise the entry moved in from outside the watched tree.
    pub fn destination(
        &mut self,
        tracker: Option<usize>,
        path: Option<RelativePath>,
    ) -> RenameOutcome {
        let from = tracker
            .and_then(|t| self.held.iter().position(|h| h.tracker == t))
            .and_then(|idx| self.held.swap_remove(idx).path);

        RenameOutcome { from, to: path }
    }

    /// Both halves at once. Discards any held source for the same path.
    pub fn both(&mut self, from: Option<RelativePath>, to: Option<RelativePath>) -> RenameOutcome {
        if from.is_some() {
            self.held.retain(|h| h.path != from);
        }
        RenameOutcome { from, to }
    }

    /// Sources whose window has lapsed; they left the watched tree.
    pub fn expire(&mut self, now: Instant) -> Vec<RenameOutcome> {
        let mut expired = Vec::new();
        self.held.retain_mut(|h| {
            if h.deadline <= now {
                expired.push(RenameOutcome {
                    from: h.path.take(),
                    to: None,
                });
                false
            } else {
                true
            }
        });
        expired
    }

    /// Earliest deadline among held sources.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.held.iter().map(|h| h.deadline).min()
    }

    /// Number of sources awaiting a destination.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.held.len()
    }
}

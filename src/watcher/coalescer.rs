//! Temporal coalescing of logical change events.
//!
//! Two windows, each measured from the last emission:
//! - a per-path throttle, collapsing the several raw notifications one write
//!   produces (create, modify, close) into one event;
//! - a per-`DedupKey` window, suppressing the same logical event queued twice.
//!
//! With both windows enabled the second is implied by the first. It still
//! applies on its own when the throttle is configured to zero.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::Utc;

use super::events::{ChangeEvent, DedupKey, PendingChange};
use crate::workspace::RelativePath;

/// Default length of both suppression windows.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

/// Entries older than this many windows are evicted.
const EVICTION_FACTOR: u32 = 4;

/// Coalescer window configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoalescerConfig {
    /// Per-path throttle window. Zero disables it.
    pub throttle_window: Duration,
    /// Per-logical-event dedup window. Zero disables it.
    pub dedup_window: Duration,
}

impl Default for CoalescerConfig {
    fn default() -> Self {
        Self {
            throttle_window: DEFAULT_WINDOW,
            dedup_window: DEFAULT_WINDOW,
        }
    }
}

/// Windowed suppression state. Owned by the single pipeline task.
#[derive(Debug)]
pub struct EventCoalescer {
    config: CoalescerConfig,
    last_by_path: HashMap<RelativePath, Instant>,
    last_by_key: HashMap<DedupKey, Instant>,
    last_sweep: Option<Instant>,
}

impl EventCoalescer {
    #[must_use]
    pub fn new(config: CoalescerConfig) -> Self {
        Self {
            config,
            last_by_path: HashMap::new(),
            last_by_key: HashMap::new(),
            last_sweep: None,
        }
    }

    /// Emit `change` as an event, or `None` if a window suppresses it.
    pub fn coalesce(&mut self, change: PendingChange, now: Instant) -> Option<ChangeEvent> {
        self.sweep(now);

        if within(self.last_by_path.get(&change.path), now, self.config.throttle_window) {
            tracing::trace!(path = %change.path, kind = change.kind.as_str(), "Throttled");
            return None;
        }

        let key = change.dedup_key();
        if within(self.last_by_key.get(&key), now, self.config.dedup_window) {
            tracing::trace!(path = %change.path, kind = change.kind.as_str(), "Duplicate");
            return None;
        }

        self.last_by_path.insert(change.path.clone(), now);
        self.last_by_key.insert(key, now);

        Some(change.into_event(Utc::now()))
    }

    /// Number of tracked entries across both windows.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.last_by_path.len() + self.last_by_key.len()
    }

    /// Drop stale entries, at most once per window.
    fn sweep(&mut self, now: Instant) {
        let window = self.config.throttle_window.max(self.config.dedup_window);
        if self
            .last_sweep
            .is_some_and(|t| now.saturating_duration_since(t) < window)
        {
            return;
        }
        self.last_sweep = Some(now);

        let horizon = window * EVICTION_FACTOR;
        let fresh = |t: &mut Instant| now.saturating_duration_since(*t) < horizon;
        self.last_by_path.retain(|_, t| fresh(t));
        self.last_by_key.retain(|_, t| fresh(t));
    }
}

fn within(last: Option<&Instant>, now: Instant, window: Duration) -> bool {
    !window.is_zero() && last.is_some_and(|t| now.saturating_duration_since(*t) < window)
}

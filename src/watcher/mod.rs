//! File system watching and change event production.
//!
//! This module provides:
//! - Recursive workspace observation using notify-rs
//! - Noise filtering of hidden and editor-temporary paths
//! - Rename correlation and windowed coalescing into logical change events

mod coalescer;
mod correlate;
mod events;
mod filter;
mod pipeline;
#[allow(clippy::module_inception)]
mod watcher;

pub use coalescer::{CoalescerConfig, EventCoalescer, DEFAULT_WINDOW};
pub use correlate::{RenameCorrelator, RenameOutcome, RENAME_PAIR_WINDOW};
pub use events::{ChangeEvent, ChangeKind, DedupKey, PendingChange, RawEvent, RawKind};
pub use filter::NoiseFilter;
pub use pipeline::{
    ChangeSink, EventPipeline, PipelineStats, PipelineStatsSnapshot, RawSignal, WatcherHealth,
};
pub use watcher::{WatcherConfig, WorkspaceWatcher};

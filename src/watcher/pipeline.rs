//! Raw event processing: normalize, filter, correlate, coalesce, publish.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::coalescer::{CoalescerConfig, EventCoalescer};
use super::correlate::{RenameCorrelator, RenameOutcome};
use super::events::{ChangeEvent, PendingChange, RawEvent, RawKind};
use super::filter::NoiseFilter;
use crate::error::WatcherError;
use crate::server::metrics;
use crate::workspace::{RelativePath, WorkspaceRoot};

/// Receiver of the pipeline's output.
pub trait ChangeSink: Send + Sync + 'static {
    /// A logical change survived filtering and coalescing.
    fn on_change(&self, event: ChangeEvent);

    /// The watcher became degraded (`healthy == false`) or recovered.
    fn on_watcher_status(&self, healthy: bool, reason: Option<String>);
}

/// Message from the OS callback to the pipeline task.
#[derive(Debug)]
pub enum RawSignal {
    Event(RawEvent),
    Error(String),
}

/// Statistics for the event pipeline.
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub raw_events: AtomicU64,
    pub filtered: AtomicU64,
    pub suppressed: AtomicU64,
    pub published: AtomicU64,
    pub errors: AtomicU64,
}

impl PipelineStats {
    /// Create new stats tracker.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Get snapshot of current stats.
    #[must_use]
    pub fn snapshot(&self) -> PipelineStatsSnapshot {
        PipelineStatsSnapshot {
            raw_events: self.raw_events.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of pipeline stats.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PipelineStatsSnapshot {
    pub raw_events: u64,
    pub filtered: u64,
    pub suppressed: u64,
    pub published: u64,
    pub errors: u64,
}

/// Liveness of the OS observer after startup.
#[derive(Debug, Default)]
pub struct WatcherHealth {
    degraded: AtomicBool,
    reason: Mutex<Option<String>>,
}

impl WatcherHealth {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Whether the observer is still delivering events.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        !self.degraded.load(Ordering::Acquire)
    }

    /// Reason for the last degradation, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.lock().clone()
    }

    /// Record a degradation. Returns `true` on the healthy → degraded edge.
    /// The first reason is kept.
    pub fn mark_degraded(&self, reason: &str) -> bool {
        let mut current = self.reason.lock();
        if self.degraded.swap(true, Ordering::AcqRel) {
            return false;
        }
        *current = Some(reason.to_string());
        true
    }
}

/// Single-consumer pipeline from raw events to published changes.
pub struct EventPipeline {
    root: WorkspaceRoot,
    filter: NoiseFilter,
    correlator: RenameCorrelator,
    coalescer: EventCoalescer,
    sink: Arc<dyn ChangeSink>,
    stats: Arc<PipelineStats>,
    health: Arc<WatcherHealth>,
}

impl EventPipeline {
    #[must_use]
    pub fn new(
        root: WorkspaceRoot,
        filter: NoiseFilter,
        correlator: RenameCorrelator,
        coalescer: CoalescerConfig,
        sink: Arc<dyn ChangeSink>,
    ) -> Self {
        Self {
            root,
            filter,
            correlator,
            coalescer: EventCoalescer::new(coalescer),
            sink,
            stats: PipelineStats::new(),
            health: WatcherHealth::new(),
        }
    }

    /// Share stats and health trackers with the owner.
    #[must_use]
    pub fn with_trackers(
        mut self,
        stats: Arc<PipelineStats>,
        health: Arc<WatcherHealth>,
    ) -> Self {
        self.stats = stats;
        self.health = health;
        self
    }

    /// Pull raw signals until cancelled or the channel closes.
    pub async fn run(mut self, mut rx: mpsc::Receiver<RawSignal>, cancel: CancellationToken) {
        loop {
            let deadline = self.correlator.next_deadline();
            tokio::select! {
                () = cancel.cancelled() => break,
                signal = rx.recv() => match signal {
                    Some(RawSignal::Event(raw)) => self.handle(raw, Instant::now()),
                    Some(RawSignal::Error(reason)) => self.degrade(&reason),
                    None => {
                        if !cancel.is_cancelled() {
                            self.degrade("event channel closed unexpectedly");
                        }
                        break;
                    }
                },
                () = sleep_until(deadline) => self.flush_expired(Instant::now()),
            }
        }
        tracing::debug!("Event pipeline stopped");
    }

    /// Process one raw event observed at `now`.
    pub fn handle(&mut self, raw: RawEvent, now: Instant) {
        self.stats.raw_events.fetch_add(1, Ordering::Relaxed);
        metrics::RAW_EVENTS_TOTAL.inc();

        let mut paths = raw.paths.iter().map(|p| self.root.relativize(p));
        let first = paths.next().flatten();
        let second = paths.next().flatten();

        let change = match raw.kind {
            RawKind::Access => return,
            RawKind::Create => self.accepted(first).map(PendingChange::created),
            RawKind::Modify | RawKind::Other => self.accepted(first).map(PendingChange::modified),
            RawKind::Remove => self.accepted(first).map(PendingChange::deleted),
            RawKind::RenameAny => self.accepted(first).map(|path| {
                if self.root.join(&path).symlink_metadata().is_ok() {
                    PendingChange::created(path)
                } else {
                    PendingChange::deleted(path)
                }
            }),
            RawKind::RenameBoth => {
                let outcome = self.correlator.both(first, second);
                self.resolve_move(outcome)
            }
            RawKind::RenameFrom => match self.correlator.source(raw.tracker, first, now) {
                Some(outcome) => self.resolve_move(outcome),
                None => None,
            },
            RawKind::RenameTo => {
                let outcome = self.correlator.destination(raw.tracker, first);
                self.resolve_move(outcome)
            }
        };

        if let Some(change) = change {
            self.emit(change, now);
        }
    }

    /// Turn rename sources whose partner never arrived into deletions.
    pub fn flush_expired(&mut self, now: Instant) {
        for outcome in self.correlator.expire(now) {
            if let Some(change) = self.resolve_move(outcome) {
                self.emit(change, now);
            }
        }
    }

    /// Filter both sides of a move; a move with one rejected side becomes a
    /// delete or a create.
    fn resolve_move(&self, outcome: RenameOutcome) -> Option<PendingChange> {
        let from = self.accepted(outcome.from);
        let to = self.accepted(outcome.to);
        match (from, to) {
            (Some(from), Some(to)) => Some(PendingChange::moved(from, to)),
            (Some(from), None) => Some(PendingChange::deleted(from)),
            (None, Some(to)) => Some(PendingChange::created(to)),
            (None, None) => None,
        }
    }

    /// Pass `path` through the noise filter, counting rejections.
    fn accepted(&self, path: Option<RelativePath>) -> Option<RelativePath> {
        let path = path?;
        if self.filter.accepts(&path) {
            return Some(path);
        }
        self.stats.filtered.fetch_add(1, Ordering::Relaxed);
        metrics::EVENTS_FILTERED_TOTAL.inc();
        None
    }

    fn emit(&mut self, change: PendingChange, now: Instant) {
        let Some(event) = self.coalescer.coalesce(change, now) else {
            self.stats.suppressed.fetch_add(1, Ordering::Relaxed);
            metrics::EVENTS_SUPPRESSED_TOTAL.inc();
            return;
        };

        self.stats.published.fetch_add(1, Ordering::Relaxed);
        metrics::EVENTS_PUBLISHED_TOTAL
            .with_label_values(&[event.kind.as_str()])
            .inc();
        tracing::debug!(
            kind = event.kind.as_str(),
            path = %event.path,
            dest = ?event.dest_path,
            "Publishing change"
        );
        self.sink.on_change(event);
    }

    fn degrade(&self, reason: &str) {
        self.stats.errors.fetch_add(1, Ordering::Relaxed);
        let error = WatcherError::Lost(reason.to_string());
        tracing::error!(%error, "Workspace watcher degraded");
        if self.health.mark_degraded(reason) {
            self.sink
                .on_watcher_status(false, Some(reason.to_string()));
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}

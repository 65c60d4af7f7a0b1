//! Recursive workspace observer using notify-rs.

use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::coalescer::CoalescerConfig;
use super::correlate::{RenameCorrelator, RENAME_PAIR_WINDOW};
use super::events::RawEvent;
use super::filter::NoiseFilter;
use super::pipeline::{ChangeSink, EventPipeline, PipelineStats, RawSignal, WatcherHealth};
use crate::error::WatcherError;
use crate::workspace::WorkspaceRoot;
use crate::Result;

/// Capacity of the channel between the OS callback and the pipeline task.
const RAW_CHANNEL_CAPACITY: usize = 1024;

/// Watcher configuration.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Noise filter applied to every path.
    pub filter: NoiseFilter,
    /// Throttle and dedup windows.
    pub coalescer: CoalescerConfig,
    /// How long a rename source waits for its destination.
    pub rename_window: Duration,
    /// Raw event channel capacity.
    pub channel_capacity: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            filter: NoiseFilter::new(),
            coalescer: CoalescerConfig::default(),
            rename_window: RENAME_PAIR_WINDOW,
            channel_capacity: RAW_CHANNEL_CAPACITY,
        }
    }
}

/// Workspace watcher: the OS observer plus the task draining it.
pub struct WorkspaceWatcher {
    observer: Mutex<Option<RecommendedWatcher>>,
    task: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    stats: Arc<PipelineStats>,
    health: Arc<WatcherHealth>,
}

impl WorkspaceWatcher {
    /// Start observing `root` recursively and spawn the pipeline task.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS observer cannot be established.
    pub fn start(
        root: &WorkspaceRoot,
        config: WatcherConfig,
        sink: Arc<dyn ChangeSink>,
    ) -> Result<Self> {
        let (raw_tx, raw_rx) = mpsc::channel(config.channel_capacity.max(1));
        let watch_failed = |e: notify::Error| WatcherError::WatchFailed {
            path: root.path().display().to_string(),
            reason: e.to_string(),
        };

        let mut observer =
            notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
                let signal = match result {
                    Ok(event) => RawSignal::Event(RawEvent::from(event)),
                    Err(e) => RawSignal::Error(e.to_string()),
                };
                // Runs on the notifier's own thread.
                if raw_tx.blocking_send(signal).is_err() {
                    tracing::trace!("Event pipeline gone, dropping raw event");
                }
            })
            .map_err(watch_failed)?;

        observer
            .watch(root.path(), RecursiveMode::Recursive)
            .map_err(watch_failed)?;

        let stats = PipelineStats::new();
        let health = WatcherHealth::new();
        let pipeline = EventPipeline::new(
            root.clone(),
            config.filter,
            RenameCorrelator::new(config.rename_window),
            config.coalescer,
            sink,
        )
        .with_trackers(Arc::clone(&stats), Arc::clone(&health));

        let cancel = CancellationToken::new();
        let task = tokio::spawn(pipeline.run(raw_rx, cancel.clone()));

        tracing::info!(path = %root.path().display(), "Watching workspace");

        Ok(Self {
            observer: Mutex::new(Some(observer)),
            task: Mutex::new(Some(task)),
            cancel,
            stats,
            health,
        })
    }

    /// Stop observing and release the OS handle. Idempotent.
    pub fn stop(&self) {
        let Some(observer) = self.observer.lock().take() else {
            return;
        };
        self.cancel.cancel();
        drop(observer);
        // The task exits on its own once it sees the cancellation.
        drop(self.task.lock().take());

        tracing::info!("Stopped watching workspace");
    }

    /// Whether the observer is still held.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.observer.lock().is_some()
    }

    /// Pipeline statistics.
    #[must_use]
    pub fn stats(&self) -> Arc<PipelineStats> {
        Arc::clone(&self.stats)
    }

    /// Observer liveness.
    #[must_use]
    pub fn health(&self) -> Arc<WatcherHealth> {
        Arc::clone(&self.health)
    }
}

impl Drop for WorkspaceWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

//! Long-lived synchronization context shared by every request handler.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::hub::{BroadcastHub, CommandSession};
use crate::watcher::{ChangeSink, CoalescerConfig, NoiseFilter, WatcherConfig, WorkspaceWatcher};
use crate::workspace::{WorkspaceRoot, WorkspaceStore};
use crate::Result;

/// Owns the workspace store, the broadcast hub and the watcher feeding it.
pub struct SyncContext {
    store: WorkspaceStore,
    hub: Arc<BroadcastHub>,
    watcher: WorkspaceWatcher,
    command_timeout: Duration,
}

impl SyncContext {
    /// Open the workspace root and start watching it.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the root is unusable, an ignore pattern is invalid,
    /// or the watcher cannot be established.
    pub fn start(config: &Config) -> Result<Self> {
        let root = config.ensure_workspace_root()?;

        let patterns: Vec<&str> = config.ignore_patterns.iter().map(String::as_str).collect();
        let filter = NoiseFilter::with_patterns(root.path(), &patterns)?;

        let store = WorkspaceStore::new(root.clone());
        let hub = Arc::new(BroadcastHub::new(store.clone(), config.client_buffer));

        let watcher_config = WatcherConfig {
            filter,
            coalescer: CoalescerConfig {
                throttle_window: config.throttle_window(),
                dedup_window: config.dedup_window(),
            },
            ..WatcherConfig::default()
        };
        let sink: Arc<dyn ChangeSink> = hub.clone();
        let watcher = WorkspaceWatcher::start(&root, watcher_config, sink)?;

        tracing::info!(
            root = %root.path().display(),
            throttle_ms = config.throttle_ms,
            dedup_ms = config.dedup_ms,
            "Sync context started"
        );

        Ok(Self {
            store,
            hub,
            watcher,
            command_timeout: config.command_timeout(),
        })
    }

    #[must_use]
    pub const fn store(&self) -> &WorkspaceStore {
        &self.store
    }

    #[must_use]
    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    #[must_use]
    pub const fn watcher(&self) -> &WorkspaceWatcher {
        &self.watcher
    }

    #[must_use]
    pub const fn root(&self) -> &WorkspaceRoot {
        self.store.root()
    }

    /// Fresh command session for a new connection, starting at the root.
    #[must_use]
    pub fn command_session(&self) -> CommandSession {
        CommandSession::new(self.root(), self.command_timeout)
    }

    /// Stop the watcher. Idempotent.
    pub fn stop(&self) {
        self.watcher.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(tmp: &TempDir) -> Config {
        Config {
            workspace_root: tmp.path().join("ws"),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_start_creates_root_and_watches() {
        let tmp = TempDir::new().unwrap();
        let ctx = SyncContext::start(&config(&tmp)).unwrap();

        assert!(ctx.root().path().is_dir());
        assert!(ctx.watcher().is_running());
        assert_eq!(ctx.hub().client_count(), 0);
        assert_eq!(ctx.command_session().cwd(), ctx.root().path());

        ctx.stop();
        ctx.stop();
        assert!(!ctx.watcher().is_running());
    }

    #[tokio::test]
    async fn test_start_rejects_bad_ignore_pattern() {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            ignore_patterns: vec!["{a,b".to_string()],
            ..config(&tmp)
        };

        assert!(matches!(
            SyncContext::start(&config),
            Err(crate::Error::Config(_))
        ));
    }
}

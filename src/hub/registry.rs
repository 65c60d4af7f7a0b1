//! Registry of connected clients and fan-out of server messages.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::command::CommandSession;
use super::messages::{ClientId, ServerMessage};
use crate::server::metrics;
use crate::watcher::{ChangeEvent, ChangeSink};
use crate::workspace::WorkspaceStore;

/// Default per-client outbound queue capacity.
pub const DEFAULT_CLIENT_BUFFER: usize = 256;

/// Greeting sent as the first message on every connection.
const GREETING: &str = "Connected to workspace";

/// Unlocked snapshot attempts before `connect` lists under the lock.
const SNAPSHOT_ATTEMPTS: usize = 3;

/// Fan-out hub. Each client owns a bounded queue drained by its socket writer.
pub struct BroadcastHub {
    store: WorkspaceStore,
    clients: RwLock<HashMap<ClientId, mpsc::Sender<ServerMessage>>>,
    /// Change events published so far.
    published: AtomicU64,
    buffer: usize,
}

impl BroadcastHub {
    #[must_use]
    pub fn new(store: WorkspaceStore, buffer: usize) -> Self {
        Self {
            store,
            clients: RwLock::new(HashMap::new()),
            published: AtomicU64::new(0),
            // Room for the greeting and the snapshot.
            buffer: buffer.max(2),
        }
    }

    /// Register a new client.
    ///
    /// The greeting and the root snapshot are queued before the client
    /// becomes visible to `publish`, so both precede any change event. The
    /// root is listed outside the registry lock; a change published between
    /// the listing and the registration forces a fresh listing.
    pub fn connect(&self) -> (ClientId, mpsc::Receiver<ServerMessage>) {
        let id = ClientId::new();
        let (tx, rx) = mpsc::channel(self.buffer);

        let mut attempt = 0;
        let (mut clients, snapshot) = loop {
            attempt += 1;
            if attempt > SNAPSHOT_ATTEMPTS {
                let clients = self.clients.write();
                break (clients, self.snapshot(id));
            }

            let seen = self.published.load(Ordering::Acquire);
            let snapshot = self.snapshot(id);
            let clients = self.clients.write();
            if self.published.load(Ordering::Acquire) == seen {
                break (clients, snapshot);
            }
            tracing::trace!(client = %id, attempt, "Workspace changed during snapshot");
        };

        let greeting = ServerMessage::ConnectionEstablished {
            client_id: id,
            message: GREETING.to_string(),
        };
        // Fresh queue with capacity >= 2; neither send can fail.
        let _ = tx.try_send(greeting);
        let _ = tx.try_send(snapshot);

        clients.insert(id, tx);
        drop(clients);

        metrics::CONNECTED_CLIENTS.inc();
        tracing::info!(client = %id, "Client connected");
        (id, rx)
    }

    fn snapshot(&self, id: ClientId) -> ServerMessage {
        match self.store.list("") {
            Ok(files) => ServerMessage::FileTree { files },
            Err(e) => {
                tracing::warn!(client = %id, error = %e, "Failed to list workspace root");
                ServerMessage::Error {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Remove a client. Unknown ids are ignored.
    pub fn disconnect(&self, id: ClientId) {
        if self.clients.write().remove(&id).is_some() {
            metrics::CONNECTED_CLIENTS.dec();
            tracing::info!(client = %id, "Client disconnected");
        }
    }

    /// Deliver a message to every registered client without waiting.
    ///
    /// A full queue drops the message for that client only; a closed queue
    /// unregisters it.
    pub fn broadcast(&self, message: &ServerMessage) {
        let mut closed = Vec::new();

        for (id, tx) in self.clients.read().iter() {
            match tx.try_send(message.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    metrics::DELIVERIES_DROPPED_TOTAL.inc();
                    tracing::warn!(client = %id, "Client queue full, dropping message");
                }
                Err(TrySendError::Closed(_)) => closed.push(*id),
            }
        }

        for id in closed {
            self.disconnect(id);
        }
    }

    /// Publish one change event to all clients.
    pub fn publish(&self, event: ChangeEvent) {
        self.published.fetch_add(1, Ordering::AcqRel);
        self.broadcast(&ServerMessage::FileChange(event));
    }

    /// Outbound queue of one client, if still connected.
    #[must_use]
    pub fn sender(&self, id: ClientId) -> Option<mpsc::Sender<ServerMessage>> {
        self.clients.read().get(&id).cloned()
    }

    /// Number of registered clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Run a command for one client, streaming output to that client only.
    pub async fn execute_command(&self, id: ClientId, session: &CommandSession, line: &str) {
        let Some(tx) = self.sender(id) else {
            tracing::debug!(client = %id, "Command for unknown client ignored");
            return;
        };
        tracing::info!(client = %id, command = %line, "Executing command");
        session.run(line, &tx).await;
    }
}

impl ChangeSink for BroadcastHub {
    fn on_change(&self, event: ChangeEvent) {
        self.publish(event);
    }

    fn on_watcher_status(&self, healthy: bool, reason: Option<String>) {
        self.broadcast(&ServerMessage::WatcherStatus { healthy, reason });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::command::DEFAULT_COMMAND_TIMEOUT;
    use crate::watcher::PendingChange;
    use crate::workspace::{RelativePath, WorkspaceRoot};
    use tempfile::TempDir;

    fn hub(buffer: usize) -> (TempDir, BroadcastHub) {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("readme.md"), "hi").unwrap();
        let root = WorkspaceRoot::open(tmp.path()).unwrap();
        (tmp, BroadcastHub::new(WorkspaceStore::new(root), buffer))
    }

    fn change(path: &str) -> ChangeEvent {
        PendingChange::modified(RelativePath::parse(path).unwrap()).into_event(chrono::Utc::now())
    }

    fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(m) = rx.try_recv() {
            out.push(m);
        }
        out
    }

    #[test]
    fn test_connect_sends_greeting_then_snapshot() {
        let (_tmp, hub) = hub(DEFAULT_CLIENT_BUFFER);
        let (id, mut rx) = hub.connect();
        hub.publish(change("readme.md"));

        let messages = drain(&mut rx);
        assert_eq!(messages.len(), 3);
        assert!(matches!(
            &messages[0],
            ServerMessage::ConnectionEstablished { client_id, .. } if *client_id == id
        ));
        assert!(matches!(
            &messages[1],
            ServerMessage::FileTree { files } if files.len() == 1 && files[0].name == "readme.md"
        ));
        assert!(matches!(messages[2], ServerMessage::FileChange(_)));
    }

    #[test]
    fn test_snapshot_precedes_changes_under_concurrent_publish() {
        let (_tmp, hub) = hub(DEFAULT_CLIENT_BUFFER);
        let hub = std::sync::Arc::new(hub);

        let publisher = {
            let hub = std::sync::Arc::clone(&hub);
            std::thread::spawn(move || {
                for i in 0..500 {
                    hub.publish(change(&format!("f{i}.txt")));
                }
            })
        };

        let mut receivers = Vec::new();
        for _ in 0..20 {
            receivers.push(hub.connect());
        }
        publisher.join().unwrap();

        for (id, mut rx) in receivers {
            let messages = drain(&mut rx);
            assert!(matches!(
                &messages[0],
                ServerMessage::ConnectionEstablished { client_id, .. } if *client_id == id
            ));
            assert!(matches!(messages[1], ServerMessage::FileTree { .. }));
            assert!(messages[2..]
                .iter()
                .all(|m| matches!(m, ServerMessage::FileChange(_))));
        }
        assert_eq!(hub.published.load(Ordering::Acquire), 500);
    }

    #[test]
    fn test_each_client_receives_once() {
        let (_tmp, hub) = hub(DEFAULT_CLIENT_BUFFER);
        let (_a, mut rx_a) = hub.connect();
        let (_b, mut rx_b) = hub.connect();
        drain(&mut rx_a);
        drain(&mut rx_b);

        hub.publish(change("x.txt"));

        assert_eq!(drain(&mut rx_a).len(), 1);
        assert_eq!(drain(&mut rx_b).len(), 1);
        assert_eq!(hub.client_count(), 2);
    }

    #[test]
    fn test_slow_client_does_not_block_others() {
        let (_tmp, hub) = hub(2);
        let (_slow, _rx_slow) = hub.connect();
        let (_fast, mut rx_fast) = hub.connect();
        drain(&mut rx_fast);

        for i in 0..5 {
            hub.publish(change(&format!("f{i}.txt")));
            assert_eq!(drain(&mut rx_fast).len(), 1);
        }
        // The slow client stays registered; its overflow is dropped.
        assert_eq!(hub.client_count(), 2);
    }

    #[test]
    fn test_closed_client_is_unregistered() {
        let (_tmp, hub) = hub(DEFAULT_CLIENT_BUFFER);
        let (_id, rx) = hub.connect();
        drop(rx);

        hub.publish(change("a.txt"));
        assert_eq!(hub.client_count(), 0);
    }

    #[test]
    fn test_disconnect() {
        let (_tmp, hub) = hub(DEFAULT_CLIENT_BUFFER);
        let (id, mut rx) = hub.connect();
        drain(&mut rx);

        hub.disconnect(id);
        hub.disconnect(id);
        hub.publish(change("a.txt"));

        assert_eq!(hub.client_count(), 0);
        assert!(hub.sender(id).is_none());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_snapshot_failure_is_reported() {
        let (tmp, hub) = hub(DEFAULT_CLIENT_BUFFER);
        std::fs::remove_dir_all(tmp.path()).unwrap();

        let (_id, mut rx) = hub.connect();
        let messages = drain(&mut rx);
        assert!(matches!(messages[1], ServerMessage::Error { .. }));
    }

    #[test]
    fn test_watcher_status_is_broadcast() {
        let (_tmp, hub) = hub(DEFAULT_CLIENT_BUFFER);
        let (_id, mut rx) = hub.connect();
        drain(&mut rx);

        hub.on_watcher_status(false, Some("gone".to_string()));
        assert_eq!(
            drain(&mut rx),
            vec![ServerMessage::WatcherStatus {
                healthy: false,
                reason: Some("gone".to_string())
            }]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_output_goes_to_requester_only() {
        let (_tmp, hub) = hub(DEFAULT_CLIENT_BUFFER);
        let (a, mut rx_a) = hub.connect();
        let (_b, mut rx_b) = hub.connect();
        drain(&mut rx_a);
        drain(&mut rx_b);

        let session = CommandSession::new(hub.store.root(), DEFAULT_COMMAND_TIMEOUT);
        hub.execute_command(a, &session, "echo hello").await;

        assert_eq!(
            drain(&mut rx_a),
            vec![ServerMessage::output("hello"), ServerMessage::CommandDone]
        );
        assert!(drain(&mut rx_b).is_empty());
    }
}

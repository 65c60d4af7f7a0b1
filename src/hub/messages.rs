//! Messages exchanged over the per-client channel.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::watcher::ChangeEvent;
use crate::workspace::TreeEntry;

/// Opaque identifier of one connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ClientId(Uuid);

impl ClientId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Server → client message, serialized as `{"event": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    ConnectionEstablished {
        client_id: ClientId,
        message: String,
    },
    /// Snapshot of the root's immediate children.
    FileTree { files: Vec<TreeEntry> },
    FileChange(ChangeEvent),
    CommandOutput {
        output: String,
        #[serde(skip_serializing_if = "is_false")]
        is_error: bool,
    },
    CommandDone,
    WatcherStatus {
        healthy: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Error { message: String },
}

impl ServerMessage {
    /// One line of command output.
    pub fn output(line: impl Into<String>) -> Self {
        Self::CommandOutput {
            output: line.into(),
            is_error: false,
        }
    }

    /// One line of command output tagged as an error.
    pub fn error_line(line: impl Into<String>) -> Self {
        Self::CommandOutput {
            output: line.into(),
            is_error: true,
        }
    }
}

/// Client → server message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    ExecuteCommand { command: String },
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    fn json(message: &ServerMessage) -> String {
        serde_json::to_string(message).unwrap()
    }

    #[test]
    fn test_command_messages_wire_format() {
        assert_snapshot!(json(&ServerMessage::output("total 0")), @r#"{"event":"command_output","data":{"output":"total 0"}}"#);
        assert_snapshot!(json(&ServerMessage::error_line("boom")), @r#"{"event":"command_output","data":{"output":"boom","is_error":true}}"#);
        assert_snapshot!(json(&ServerMessage::CommandDone), @r#"{"event":"command_done"}"#);
    }

    #[test]
    fn test_status_and_tree_wire_format() {
        let degraded = ServerMessage::WatcherStatus {
            healthy: false,
            reason: Some("inotify limit reached".to_string()),
        };
        assert_snapshot!(json(&degraded), @r#"{"event":"watcher_status","data":{"healthy":false,"reason":"inotify limit reached"}}"#);
        assert_snapshot!(json(&ServerMessage::FileTree { files: vec![] }), @r#"{"event":"file_tree","data":{"files":[]}}"#);
    }

    #[test]
    fn test_parse_execute_command() {
        let parsed: ClientMessage =
            serde_json::from_str(r#"{"event":"execute_command","data":{"command":"ls -la"}}"#)
                .unwrap();
        assert_eq!(
            parsed,
            ClientMessage::ExecuteCommand {
                command: "ls -la".to_string()
            }
        );
    }

    #[test]
    fn test_parse_rejects_unknown_event() {
        let parsed = serde_json::from_str::<ClientMessage>(r#"{"event":"format_disk","data":{}}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_client_ids_are_unique() {
        assert_ne!(ClientId::new(), ClientId::new());
    }
}

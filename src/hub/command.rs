//! Per-connection command execution with streamed output.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use super::messages::ServerMessage;
use crate::server::metrics;
use crate::workspace::WorkspaceRoot;

/// Default limit on a single command's run time.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// One client's shell session: its own working directory inside the root.
///
/// Clones share the working directory.
#[derive(Debug, Clone)]
pub struct CommandSession {
    root: PathBuf,
    cwd: Arc<Mutex<PathBuf>>,
    timeout: Duration,
}

impl CommandSession {
    #[must_use]
    pub fn new(root: &WorkspaceRoot, timeout: Duration) -> Self {
        Self {
            root: root.path().to_path_buf(),
            cwd: Arc::new(Mutex::new(root.path().to_path_buf())),
            timeout,
        }
    }

    /// Current working directory of this session.
    #[must_use]
    pub fn cwd(&self) -> PathBuf {
        self.cwd.lock().clone()
    }

    /// Run one command line, streaming output to `out`, then `command_done`.
    ///
    /// Failures are reported as error lines, never returned.
    pub async fn run(&self, line: &str, out: &mpsc::Sender<ServerMessage>) {
        let line = line.trim();
        metrics::COMMANDS_TOTAL.inc();

        if line.is_empty() {
            send(out, ServerMessage::error_line("please enter a command")).await;
        } else if line == "cd" || line.starts_with("cd ") {
            self.change_dir(line[2..].trim(), out).await;
        } else {
            self.spawn(line, out).await;
        }

        send(out, ServerMessage::CommandDone).await;
    }

    async fn change_dir(&self, target: &str, out: &mpsc::Sender<ServerMessage>) {
        let current = self.cwd();
        if target.is_empty() {
            let line = format!("current directory: {}", current.display());
            send(out, ServerMessage::output(line)).await;
            return;
        }

        let message = match std::fs::canonicalize(current.join(target)) {
            Ok(dir) if !dir.starts_with(&self.root) => {
                ServerMessage::error_line(format!("cd: {target}: outside the workspace"))
            }
            Ok(dir) if !dir.is_dir() => {
                ServerMessage::error_line(format!("cd: {target}: not a directory"))
            }
            Ok(dir) => {
                let line = format!("changed directory to {}", dir.display());
                *self.cwd.lock() = dir;
                ServerMessage::output(line)
            }
            Err(e) => ServerMessage::error_line(format!("cd: {target}: {e}")),
        };
        send(out, message).await;
    }

    async fn spawn(&self, line: &str, out: &mpsc::Sender<ServerMessage>) {
        let mut child = match shell(line, &self.cwd()).spawn() {
            Ok(child) => child,
            Err(e) => {
                send(out, ServerMessage::error_line(format!("failed to start: {e}"))).await;
                return;
            }
        };

        tracing::debug!(command = %line, pid = ?child.id(), "Command started");

        match tokio::time::timeout(self.timeout, stream_output(&mut child, out)).await {
            Ok(Some(status)) if !status.success() => {
                let line = match status.code() {
                    Some(code) => format!("exited with status {code}"),
                    None => "terminated by signal".to_string(),
                };
                send(out, ServerMessage::error_line(line)).await;
            }
            Ok(_) => {}
            Err(_) => {
                let _ = child.kill().await;
                let line = format!("timed out after {}s", self.timeout.as_secs());
                send(out, ServerMessage::error_line(line)).await;
            }
        }
    }
}

/// Forward stdout and stderr line by line until both close, then reap.
///
/// Returns `None` if the client went away or the child could not be waited on.
async fn stream_output(
    child: &mut Child,
    out: &mpsc::Sender<ServerMessage>,
) -> Option<std::process::ExitStatus> {
    let mut stdout = BufReader::new(child.stdout.take()?).lines();
    let mut stderr = BufReader::new(child.stderr.take()?).lines();
    let (mut stdout_open, mut stderr_open) = (true, true);

    while stdout_open || stderr_open {
        let message = tokio::select! {
            line = stdout.next_line(), if stdout_open => match line {
                Ok(Some(line)) => ServerMessage::output(line),
                Ok(None) => { stdout_open = false; continue; }
                Err(e) => { stdout_open = false; ServerMessage::error_line(e.to_string()) }
            },
            line = stderr.next_line(), if stderr_open => match line {
                Ok(Some(line)) => ServerMessage::error_line(line),
                Ok(None) => { stderr_open = false; continue; }
                Err(e) => { stderr_open = false; ServerMessage::error_line(e.to_string()) }
            },
        };
        if !send(out, message).await {
            return None;
        }
    }

    child.wait().await.ok()
}

fn shell(line: &str, cwd: &Path) -> Command {
    #[cfg(windows)]
    let mut command = {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    };
    #[cfg(not(windows))]
    let mut command = {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    };

    command
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    command
}

/// Returns `false` once the client's queue is closed.
async fn send(out: &mpsc::Sender<ServerMessage>, message: ServerMessage) -> bool {
    out.send(message).await.is_ok()
}

//! codespace - workspace synchronization server
//!
//! Entry point for the codespace server.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::sync::Arc;

use clap::Parser;
use codespace::server::{init_metrics, init_tracing, App, ServerConfig};
use codespace::{Config, Result, SyncContext};

/// codespace - workspace synchronization server
#[derive(Parser, Debug)]
#[command(name = "codespace")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Workspace directory to serve and watch
    #[arg(short, long, env = "CODESPACE_ROOT", default_value = "./codespace")]
    root: std::path::PathBuf,

    /// Host address to bind to
    #[arg(long, env = "CODESPACE_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "CODESPACE_PORT", default_value = "5000")]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CODESPACE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, env = "CODESPACE_LOG_JSON")]
    log_json: bool,

    /// Per-path throttle window in milliseconds (0 disables)
    #[arg(long, env = "CODESPACE_THROTTLE_MS", default_value = "1000")]
    throttle_ms: u64,

    /// Logical dedup window in milliseconds (0 disables)
    #[arg(long, env = "CODESPACE_DEDUP_MS", default_value = "1000")]
    dedup_ms: u64,

    /// Per-client outbound queue capacity
    #[arg(long, env = "CODESPACE_CLIENT_BUFFER", default_value = "256")]
    client_buffer: usize,

    /// Command timeout in seconds
    #[arg(long, env = "CODESPACE_COMMAND_TIMEOUT_SECS", default_value = "300")]
    command_timeout_secs: u64,

    /// Extra gitignore-style patterns hidden from clients
    #[arg(short, long, env = "CODESPACE_IGNORE", value_delimiter = ',')]
    ignore: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.log_json);

    tracing::info!("codespace v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config {
        workspace_root: cli.root,
        host: cli.host,
        port: cli.port,
        log_level: cli.log_level,
        throttle_ms: cli.throttle_ms,
        dedup_ms: cli.dedup_ms,
        client_buffer: cli.client_buffer,
        command_timeout_secs: cli.command_timeout_secs,
        ignore_patterns: cli.ignore,
    };

    tracing::debug!(?config, "Configuration loaded");

    config.validate()?;

    init_metrics();

    let context = Arc::new(SyncContext::start(&config)?);

    tracing::info!(
        "Server will bind to {}, serving {}",
        config.server_addr(),
        context.root().path().display()
    );

    let server_config = ServerConfig {
        host: config.host,
        port: config.port,
    };

    App::new(server_config, context).run().await
}

//! Structured logging and tracing configuration.
//!
//! Provides setup for observability using the `tracing` crate with:
//! - Structured logging with JSON output option
//! - Configurable log levels, overridable through `RUST_LOG`
//! - Spans for client connections and command runs

use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Registry,
};

/// Initialize tracing with the given level and output format.
///
/// # Panics
///
/// Panics if tracing subscriber has already been initialized in this process.
pub fn init_tracing(level: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        let json_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        Registry::default().with(env_filter).with(json_layer).init();
    } else {
        let fmt_layer = fmt::layer().with_target(true).with_thread_ids(true);

        Registry::default().with(env_filter).with(fmt_layer).init();
    }

    tracing::debug!("Tracing initialized: level={}, json={}", level, json);
}

/// Spans attached to long-running per-client work.
pub mod spans {
    use tracing::{info_span, Span};

    use crate::hub::ClientId;

    /// Span covering one client connection.
    #[must_use]
    pub fn client_span(client: ClientId) -> Span {
        info_span!("client", client = %client)
    }

    /// Span covering one command run for a client.
    #[must_use]
    pub fn command_span(client: ClientId, command: &str) -> Span {
        info_span!(
            "command",
            client = %client,
            command = %command,
        )
    }
}

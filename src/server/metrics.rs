//! Prometheus metrics definitions.

use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, register_int_gauge};
use prometheus::{IntCounter, IntCounterVec, IntGauge};

/// Raw notifier events received.
pub static RAW_EVENTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "codespace_raw_events_total",
        "Total number of raw filesystem events received"
    )
    .unwrap()
});

/// Raw events dropped by the noise filter or for falling outside the root.
pub static EVENTS_FILTERED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "codespace_events_filtered_total",
        "Total number of events dropped by the noise filter"
    )
    .unwrap()
});

/// Changes suppressed by the coalescer windows.
pub static EVENTS_SUPPRESSED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "codespace_events_suppressed_total",
        "Total number of changes suppressed by throttle or dedup windows"
    )
    .unwrap()
});

/// Change events published, by kind.
pub static EVENTS_PUBLISHED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "codespace_events_published_total",
        "Total number of change events published to clients",
        &["kind"]
    )
    .unwrap()
});

/// Messages dropped because a client queue was full.
pub static DELIVERIES_DROPPED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "codespace_deliveries_dropped_total",
        "Total number of messages dropped for slow clients"
    )
    .unwrap()
});

/// Currently connected clients.
pub static CONNECTED_CLIENTS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "codespace_connected_clients",
        "Number of connected clients"
    )
    .unwrap()
});

/// Commands executed through client sessions.
pub static COMMANDS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "codespace_commands_total",
        "Total number of commands executed for clients"
    )
    .unwrap()
});

/// Initialize all metrics (call once at startup).
pub fn init_metrics() {
    // Access lazy statics to register them
    let _ = &*RAW_EVENTS_TOTAL;
    let _ = &*EVENTS_FILTERED_TOTAL;
    let _ = &*EVENTS_SUPPRESSED_TOTAL;
    let _ = &*EVENTS_PUBLISHED_TOTAL;
    let _ = &*DELIVERIES_DROPPED_TOTAL;
    let _ = &*CONNECTED_CLIENTS;
    let _ = &*COMMANDS_TOTAL;

    tracing::debug!("Prometheus metrics initialized");
}

//! Tracing and metrics helpers shared by waflow binaries and libraries.
//!
//! Binaries call [`install`] once at startup. Libraries only emit through
//! `tracing` and the `record_*` counters, which are no-ops until a `metrics`
//! recorder is installed.

use anyhow::Result;

mod config;
mod counters;
mod tracing_init;

pub use config::{LogFormat, TelemetryConfig};
pub use counters::{
    FLOW_OPS, Outcome, SENDS, WEBHOOK_EVENTS, record_flow_op, record_send, record_webhook_event,
};
pub use tracing_init::init_telemetry;

/// Installs the tracing subscriber configured from `RUST_LOG` and `WAFLOW_LOG_FORMAT`.
pub fn install(service_name: &str) -> Result<()> {
    init_telemetry(TelemetryConfig::from_lookup(service_name, |key| {
        std::env::var(key).ok()
    }))
}

//! Tracing initialization.
//!
//! `AGENTCORE_QUIET=1` drops the default level to `warn`; `AGENTCORE_LOG_JSON=1`
//! switches the fmt layer to JSON. Call once at process startup.

use tracing_subscriber::{prelude::*, EnvFilter};

use crate::config::ObservabilityConfig;

pub fn init_tracing() {
    let cfg = ObservabilityConfig::from_env();

    let level = if cfg.quiet {
        "agentcore=warn".to_string()
    } else {
        cfg.log_level.clone()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    };
}

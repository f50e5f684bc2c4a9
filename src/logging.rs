//! Logging initialization.
//!
//! Diagnostics go to stderr through `tracing`; command status output is
//! printed separately on stdout.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// Resolve the filter directive: `RUST_LOG` wins, then `--debug`, then the
/// configured level.
pub fn filter_directive(config: &Config, debug_override: bool, rust_log: Option<String>) -> String {
    match rust_log {
        Some(v) if !v.trim().is_empty() => v,
        _ if debug_override => "debug".to_string(),
        _ => config.logging.level.clone(),
    }
}

pub fn init_logging(config: &Config, debug_override: bool) {
    let directive = filter_directive(config, debug_override, std::env::var("RUST_LOG").ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    // A second init (e.g. in tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

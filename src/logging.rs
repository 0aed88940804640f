use std::io;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "info,name_reconciliation=info,tower_http=warn";

/// Install the global subscriber.
///
/// Diagnostics go to stderr so that stdout stays clean for reports, JSON
/// and CSV output. Safe to call twice; the second call is a no-op.
pub fn configure_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let stderr_log = fmt::layer().with_writer(io::stderr).with_target(false);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_log)
        .try_init();
}

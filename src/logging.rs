//! Logging setup.
//!
//! The library only emits `tracing` events; embedding applications and tests
//! call one of these helpers to route them to stderr.

use tracing_subscriber::EnvFilter;

/// Default filter used when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info";

/// Initializes stderr logging, honoring `RUST_LOG` and falling back to `info`.
///
/// Calling it more than once is harmless; later calls keep the first subscriber.
pub fn init_stderr_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter);
}

/// Initializes stderr logging with an explicit filter directive
/// (e.g. `"sql_result_transformer=debug,sqlx=warn"`).
///
/// Invalid directives fall back to the default filter.
pub fn init_logging_with(directives: &str) {
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|e| {
        eprintln!("Warning: Invalid log filter '{directives}': {e}");
        EnvFilter::new(DEFAULT_FILTER)
    });
    install(filter);
}

fn install(filter: EnvFilter) {
    // A global subscriber may already be set by the host application or another test.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

//! Logging initialization for the agent.
//!
//! All components log through `tracing`; this sets up the subscriber once at
//! startup. `RUST_LOG` takes precedence over the level passed in.

use tracing_subscriber::EnvFilter;

/// Initialize the logging system.
///
/// * `level` - default log level (trace, debug, info, warn, error), used
///   when `RUST_LOG` is unset.
pub fn init_logging(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    // try_init so repeated calls (tests, embedding) are harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

//! Logging initialization.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Sets up the global `tracing` subscriber.
///
/// Called by binaries and by the host-specific injection glue. The filter is
/// taken from `RUST_LOG` when set and defaults to `chaos_rs=info` otherwise.
/// Calling it a second time is a no-op.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chaos_rs=info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

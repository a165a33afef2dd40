//! Tracing subscriber setup for test binaries.

use tracing_subscriber::EnvFilter;

/// Install a `tracing` subscriber that honours `RUST_LOG` (default `info`).
///
/// Output goes through the test writer so it is captured per test. Safe to
/// call from every test; only the first call installs anything.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

//! Tracing bootstrap.

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `info`. Safe to call more than once; later calls do nothing.
pub fn init() {
    init_with("info");
}

/// Like [`init`] with a custom fallback filter, e.g. `"yacht_room=debug"`.
pub fn init_with(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

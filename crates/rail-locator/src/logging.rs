//! Logging setup for the command-line application.
//!
//! Logs go to stderr so that stdout only carries the JSON output.

use tracing_subscriber::prelude::*;

/// Initialize logging with sensible defaults.
///
/// If RUST_LOG is not set, release builds log at INFO and debug builds also log DEBUG
/// from the locator crates.
pub fn setup_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;

    if std::env::var("RUST_LOG").is_err() {
        // Safety: single-threaded at startup
        unsafe {
            if cfg!(debug_assertions) {
                std::env::set_var("RUST_LOG", "info,rail_locator=debug,rail_locator_lib=debug");
            } else {
                std::env::set_var("RUST_LOG", "info");
            }
        }
    }

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(fmt_layer).init();
}

pub fn log_version_info() {
    tracing::info!(
        "{} {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );
}

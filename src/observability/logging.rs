//! # Logging
//!
//! `tracing-subscriber` setup shared by the binary and local runs.

use tracing_subscriber::EnvFilter;

use crate::constants::DEFAULT_LOG_FILTER;

/// Filter from `RUST_LOG`, or the crate default if unset or invalid
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Install the global fmt subscriber
///
/// ANSI colours are disabled since the host log stream does not render them.
/// Returns `false` if a subscriber was already installed; that one is kept.
pub fn init_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .is_ok()
}

//! Tracing subscriber setup for hosts embedding the core
//!
//! Library code only emits `tracing` events; the host application (or a test)
//! decides where they go by calling [`init_tracing`] once at startup.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Install a fmt subscriber filtered by `RUST_LOG` (falling back to `default_filter`)
///
/// Returns `false` if a global subscriber was already installed, so calling it
/// from several tests is harmless.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected_not_panicking() {
        init_tracing(DEFAULT_LOG_FILTER);
        assert!(!init_tracing("debug"));
    }
}

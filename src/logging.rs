//! Process-wide log output.
//!
//! The library only emits `tracing` events under the `edge_sink` target.
//! Hosts that do not install their own subscriber can call [`init`] once at
//! startup; the filter is read from `EDGE_SINK_LOG` and defaults to `info`.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

use crate::core::constants::LOG_ENV;

/// Ensures the subscriber is only installed once.
static INIT: Once = Once::new();

/// Install a `fmt` subscriber filtered by `EDGE_SINK_LOG`.
///
/// Later calls are no-ops. If another subscriber is already installed it is
/// left in place.
pub fn init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_repeatable() {
        init();
        init();
        assert!(INIT.is_completed());
    }
}

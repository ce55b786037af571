//! Logging setup for hosts that do not install their own subscriber
//!
//! The cache layer only emits `tracing` events. Applications embedding it
//! usually configure logging themselves; this helper covers tests, demos and
//! small binaries.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Initialize a console subscriber filtered by `RUST_LOG`
///
/// Safe to call more than once. If another global subscriber is already
/// installed it is left in place.
pub fn init_tracing() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

        let result = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .try_init();

        if result.is_err() {
            tracing::debug!("Global tracing subscriber already initialized - keeping it");
        }
    });
}

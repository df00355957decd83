//! Tracing setup for hosts embedding the editor core
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is left to the host. `init_tracing` is the stock setup: `RUST_LOG` wins,
//! otherwise the given directive applies.

use tracing_subscriber::EnvFilter;

pub use tracing_subscriber::util::TryInitError;

/// Install a global fmt subscriber filtered by `RUST_LOG`
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(default_directive: &str) -> Result<(), TryInitError> {
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .finish()
        .try_init()
}

//! Tracing setup for the simulation binary.
//!
//! # Configuration
//!
//! - `RUST_LOG`: log filter (default: `info`)
//!
//! # Usage
//!
//! ```rust,ignore
//! use sim_engine::telemetry::init_telemetry;
//!
//! fn main() {
//!     init_telemetry();
//!     // ... application code
//! }
//! ```

use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with an env-filtered console
/// layer.
///
/// # Panics
///
/// Panics if a global subscriber is already set.
pub fn init_telemetry() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    Registry::default()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

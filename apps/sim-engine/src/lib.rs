// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Sim Engine - Monte Carlo trading strategy simulator.
//!
//! Estimates the terminal P&L distribution of a random leveraged
//! buy/hold/sell strategy replayed many times over a historical
//! multi-asset price series. The resulting distribution is a baseline
//! for ranking a real strategy's performance against chance.
//!
//! # Layout
//!
//! - [`config`]: parameter loading, defaults, and validation
//! - [`series`]: validated historical price series and JSON loading
//! - [`sim`]: policy, ledger, margin, per-trajectory engine, and the
//!   parallel batch driver
//! - [`error`]: the [`ConfigError`] / [`TrajectoryError`] taxonomy
//! - [`telemetry`]: tracing subscriber setup for the binary

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod series;
pub mod sim;
pub mod telemetry;

pub use config::{SimulationParams, load_params};
pub use error::{ConfigError, TrajectoryError};
pub use series::{PriceSeries, load_series};
pub use sim::{
    BatchResult, CancelHandle, MarginCallEvent, MonteCarloDriver, PnlSummary, TrajectoryOutcome,
    TrajectorySlot,
};

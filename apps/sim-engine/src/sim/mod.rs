//! Monte Carlo simulation of a random leveraged trading strategy.
//!
//! This module estimates the outcome distribution of a random
//! buy/hold/sell policy over a historical multi-asset price series:
//!
//! - **Policy**: per-step, per-asset action draws from configured
//!   hold/buy/sell probability bands
//! - **Ledger**: margin-based position accounting with all-or-nothing
//!   sells and fees on leveraged notional
//! - **Margin**: maintenance-ratio monitoring with forced liquidation
//! - **Engine**: one trajectory as a Running/Liquidated/Finished state
//!   machine
//! - **Driver**: Rayon fan-out of independent trajectories with
//!   deterministic per-trajectory seeding
//!
//! # Example
//!
//! ```ignore
//! use sim_engine::config::SimulationParams;
//! use sim_engine::sim::MonteCarloDriver;
//!
//! let params = SimulationParams {
//!     num_simulations: 10_000,
//!     leverage: 15.0,
//!     random_seed: Some(42),
//!     ..SimulationParams::default()
//! };
//!
//! let driver = MonteCarloDriver::new(params)?;
//! let result = driver.run(&series)?;
//!
//! println!("mean P&L: {}", result.summary.mean);
//! println!("prob. of loss: {}", result.summary.prob_loss);
//! ```

mod driver;
mod engine;
mod ledger;
mod margin;
mod policy;
mod result;
mod summary;

pub use driver::{CancelHandle, MonteCarloDriver, Progress, ProgressTracker};
pub use engine::TrajectoryEngine;
pub use ledger::{Fill, PositionLedger};
pub use margin::{MarginMonitor, margin_ratio};
pub use policy::{ActionPolicy, TradeAction};
pub use result::{BatchResult, MarginCallEvent, TrajectoryOutcome, TrajectorySlot};
pub use summary::PnlSummary;

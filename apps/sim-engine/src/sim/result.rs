//! Per-trajectory and batch result types.

use serde::{Deserialize, Serialize};

use crate::error::TrajectoryError;
use crate::sim::summary::PnlSummary;

/// Diagnostic record of a forced liquidation. Expected behavior, not
/// an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarginCallEvent {
    /// Timestep at which the maintenance threshold was breached.
    pub timestep: usize,
    /// Mark-to-market equity at the moment of the breach, before the
    /// forced closes.
    pub equity: f64,
    /// Margin ratio at the moment of the breach.
    pub margin_ratio: f64,
}

/// Completed result of one trajectory.
///
/// Created once at the terminal timestep, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryOutcome {
    /// Trajectory id (index within the batch).
    pub trajectory_id: u64,
    /// Final realized cash after the end-of-run forced close.
    pub final_cash: f64,
    /// `final_cash - initial_capital`.
    pub terminal_pnl: f64,
    /// Mark-to-market equity per timestep, full series length.
    pub equity_curve: Vec<f64>,
    /// Total fees charged across all executed trades.
    pub fees_paid: f64,
    /// Executed buys.
    pub buys: u64,
    /// Executed sells (including forced closes).
    pub sells: u64,
    /// Set when the trajectory was margin-called.
    pub margin_call: Option<MarginCallEvent>,
}

/// One slot in the batch output, indexed by trajectory id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrajectorySlot {
    /// The trajectory ran to the end of the series.
    Completed(TrajectoryOutcome),
    /// The trajectory failed; the error carries its id. The rest of
    /// the batch is unaffected.
    Failed(TrajectoryError),
    /// The batch was cancelled before this trajectory started.
    Cancelled,
}

impl TrajectorySlot {
    /// The completed outcome, if any.
    #[must_use]
    pub const fn outcome(&self) -> Option<&TrajectoryOutcome> {
        match self {
            Self::Completed(outcome) => Some(outcome),
            Self::Failed(_) | Self::Cancelled => None,
        }
    }
}

/// Fan-in result of a Monte Carlo batch.
///
/// `slots[i]` always belongs to trajectory `i`, regardless of the
/// order trajectories finished in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    /// Per-trajectory slots, ordered by trajectory id.
    pub slots: Vec<TrajectorySlot>,
    /// Distribution summary over completed trajectories.
    pub summary: PnlSummary,
    /// Trajectories that completed.
    pub completed: u64,
    /// Trajectories that failed.
    pub failed: u64,
    /// Trajectories skipped due to cancellation.
    pub cancelled: u64,
    /// Wall-clock batch duration in milliseconds.
    pub total_time_ms: u64,
}

impl BatchResult {
    /// Iterate over completed outcomes in trajectory-id order.
    pub fn outcomes(&self) -> impl Iterator<Item = &TrajectoryOutcome> {
        self.slots.iter().filter_map(TrajectorySlot::outcome)
    }

    /// Terminal P&L of every completed trajectory, in id order.
    #[must_use]
    pub fn terminal_pnls(&self) -> Vec<f64> {
        self.outcomes().map(|o| o.terminal_pnl).collect()
    }

    /// Fraction of completed trajectories whose terminal P&L is
    /// strictly below `reference_pnl`.
    ///
    /// This is the empirical p-value used to rank an externally
    /// observed P&L against the random-strategy distribution.
    #[must_use]
    pub fn percentile_of(&self, reference_pnl: f64) -> f64 {
        let mut total = 0u64;
        let mut below = 0u64;
        for outcome in self.outcomes() {
            total += 1;
            if outcome.terminal_pnl < reference_pnl {
                below += 1;
            }
        }
        if total == 0 {
            return 0.0;
        }
        below as f64 / total as f64
    }
}

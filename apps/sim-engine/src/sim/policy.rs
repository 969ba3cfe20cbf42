//! Random trading policy.
//!
//! The policy is intentionally random: each (timestep, asset) pair
//! draws one action from a configured (hold, buy, sell) probability
//! triple, with a uniform buy-size fraction when buying. The policy
//! only requests actions; the engine downgrades impossible requests
//! (selling a flat asset) to no-ops.

use rand::Rng;

use crate::config::SimulationParams;

/// One requested action for a (timestep, asset) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TradeAction {
    /// Do nothing.
    Hold,
    /// Commit `cash_fraction` of current free cash, leveraged.
    Buy {
        /// Fraction of free cash to commit, in (0, max_buy_perc_cash].
        cash_fraction: f64,
    },
    /// Request full liquidation of the asset's position.
    Sell,
}

/// Maps uniform draws to trade actions by cumulative threshold.
///
/// The draw order is fixed (action first, then the buy fraction when
/// buying), so a given RNG stream always yields the same action
/// sequence.
#[derive(Debug, Clone, Copy)]
pub struct ActionPolicy {
    prob_hold: f64,
    prob_hold_buy: f64,
    max_buy_perc_cash: f64,
}

impl ActionPolicy {
    /// Build the policy from validated parameters.
    #[must_use]
    pub fn new(params: &SimulationParams) -> Self {
        Self {
            prob_hold: params.prob_hold,
            prob_hold_buy: params.prob_hold + params.prob_buy,
            max_buy_perc_cash: params.max_buy_perc_cash,
        }
    }

    /// Draw one action. Consumes one uniform draw, plus a second one
    /// when the action is a buy.
    pub fn draw<R: Rng>(&self, rng: &mut R) -> TradeAction {
        let r: f64 = rng.random();
        if r < self.prob_hold {
            TradeAction::Hold
        } else if r < self.prob_hold_buy {
            // (1 - u) maps [0, 1) onto (0, 1], keeping the fraction
            // strictly positive.
            let u: f64 = rng.random();
            TradeAction::Buy {
                cash_fraction: self.max_buy_perc_cash * (1.0 - u),
            }
        } else {
            TradeAction::Sell
        }
    }
}

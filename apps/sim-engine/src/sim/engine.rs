//! Per-trajectory simulation engine.
//!
//! Runs one trajectory as a small state machine over the shared price
//! series:
//!
//! - `Running`: each timestep marks prices, checks margin, then draws
//!   one policy action per asset and applies it through the ledger.
//! - `Liquidated`: absorbing. Entered on a margin breach; every
//!   position is force-closed and the trajectory carries its equity
//!   forward, flat, to the end of the series.
//! - `Finished`: terminal. Entered at the last timestep after the
//!   end-of-run forced close.
//!
//! Fees are charged on every executed buy and sell (including forced
//! closes) and on nothing else.

use rand::Rng;
use tracing::debug;

use crate::config::SimulationParams;
use crate::error::TrajectoryError;
use crate::series::PriceSeries;
use crate::sim::ledger::PositionLedger;
use crate::sim::margin::{MarginMonitor, margin_ratio};
use crate::sim::policy::{ActionPolicy, TradeAction};
use crate::sim::result::{MarginCallEvent, TrajectoryOutcome};

/// Lifecycle state of one trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    Running,
    Liquidated,
    Finished,
}

/// One trajectory's engine. Owns its ledger and equity curve; shares
/// nothing mutable with other trajectories.
#[derive(Debug)]
pub struct TrajectoryEngine<'a> {
    trajectory_id: u64,
    params: &'a SimulationParams,
    series: &'a PriceSeries,
    policy: ActionPolicy,
    monitor: MarginMonitor,
    ledger: PositionLedger,
    state: EngineState,
    equity_curve: Vec<f64>,
    buys: u64,
    sells: u64,
    margin_call: Option<MarginCallEvent>,
}

impl<'a> TrajectoryEngine<'a> {
    /// Create an engine for one trajectory. Parameters and series are
    /// assumed already validated by the driver.
    #[must_use]
    pub fn new(trajectory_id: u64, params: &'a SimulationParams, series: &'a PriceSeries) -> Self {
        Self {
            trajectory_id,
            params,
            series,
            policy: ActionPolicy::new(params),
            monitor: MarginMonitor::new(params.margin_maintenance_threshold),
            ledger: PositionLedger::new(
                params.initial_capital,
                params.leverage,
                params.trading_fee_rate,
                params.min_trade_notional,
                series.num_assets(),
            ),
            state: EngineState::Running,
            equity_curve: Vec::with_capacity(series.len()),
            buys: 0,
            sells: 0,
            margin_call: None,
        }
    }

    /// Run the trajectory to completion.
    ///
    /// # Errors
    ///
    /// Returns [`TrajectoryError`] if equity becomes non-finite; the
    /// failure stays confined to this trajectory.
    pub fn run<R: Rng>(mut self, rng: &mut R) -> Result<TrajectoryOutcome, TrajectoryError> {
        for timestep in 0..self.series.len() {
            self.step(timestep, rng)?;
        }

        // Dataset exhausted: force-close whatever is still open at
        // the last available prices.
        let last_prices = self.series.last_row();
        self.sells += self.ledger.force_close_all(last_prices) as u64;
        self.state = EngineState::Finished;

        let final_cash = self.ledger.cash();
        debug!(
            trajectory_id = self.trajectory_id,
            final_cash,
            margin_called = self.margin_call.is_some(),
            "Trajectory finished"
        );

        Ok(TrajectoryOutcome {
            trajectory_id: self.trajectory_id,
            final_cash,
            terminal_pnl: final_cash - self.params.initial_capital,
            equity_curve: self.equity_curve,
            fees_paid: self.ledger.fees_paid(),
            buys: self.buys,
            sells: self.sells,
            margin_call: self.margin_call,
        })
    }

    /// One timestep: mark prices, resolve margin, apply policy
    /// actions, append equity.
    fn step<R: Rng>(&mut self, timestep: usize, rng: &mut R) -> Result<(), TrajectoryError> {
        let prices = self.series.row(timestep);

        let equity = self.ledger.mark_to_market(prices);
        if !equity.is_finite() {
            return Err(TrajectoryError::NonFiniteEquity {
                trajectory_id: self.trajectory_id,
                timestep,
            });
        }

        if self.state == EngineState::Running {
            let borrowed = self.ledger.total_borrowed();
            if self.monitor.is_breached(equity, borrowed) {
                self.liquidate(timestep, prices, equity, borrowed);
            }
        }

        if self.state == EngineState::Running {
            self.apply_policy_actions(prices, rng);
        }

        self.equity_curve.push(self.ledger.mark_to_market(prices));
        Ok(())
    }

    /// Margin breach: force-close everything at current prices and
    /// enter the absorbing `Liquidated` state.
    fn liquidate(&mut self, timestep: usize, prices: &[f64], equity: f64, borrowed: f64) {
        let ratio = margin_ratio(equity, borrowed);
        self.sells += self.ledger.force_close_all(prices) as u64;
        self.state = EngineState::Liquidated;
        self.margin_call = Some(MarginCallEvent {
            timestep,
            equity,
            margin_ratio: ratio,
        });

        debug!(
            trajectory_id = self.trajectory_id,
            timestep,
            equity,
            margin_ratio = ratio,
            "Margin call: forced liquidation"
        );
    }

    /// Draw and apply one policy action per asset.
    fn apply_policy_actions<R: Rng>(&mut self, prices: &[f64], rng: &mut R) {
        for asset in 0..self.series.num_assets() {
            let price = prices[asset];
            match self.policy.draw(rng) {
                TradeAction::Hold => {}
                TradeAction::Buy { cash_fraction } => {
                    if self.ledger.open_or_add(asset, cash_fraction, price).is_some() {
                        self.buys += 1;
                    }
                }
                TradeAction::Sell => {
                    // A sell against a flat asset is a no-op inside
                    // the ledger; the winners filter downgrades the
                    // request before it gets there.
                    if self.params.avoid_selling_winners
                        && self.ledger.units(asset) > 0.0
                        && price > self.ledger.avg_entry_price(asset)
                    {
                        continue;
                    }
                    if self.ledger.close(asset, price).is_some() {
                        self.sells += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn series(rows: Vec<Vec<f64>>) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();
        let timestamps = (0..rows.len())
            .map(|i| start + chrono::Duration::minutes(i as i64))
            .collect();
        let assets = (0..rows[0].len()).map(|i| format!("A{i}")).collect();
        PriceSeries::new(timestamps, assets, rows).unwrap()
    }

    fn run(params: &SimulationParams, series: &PriceSeries, seed: u64) -> TrajectoryOutcome {
        let mut rng = SmallRng::seed_from_u64(seed);
        TrajectoryEngine::new(0, params, series).run(&mut rng).unwrap()
    }

    #[test]
    fn test_hold_only_preserves_capital() {
        let params = SimulationParams {
            prob_hold: 1.0,
            prob_buy: 0.0,
            prob_sell: 0.0,
            ..Default::default()
        };
        let series = series(vec![vec![100.0], vec![110.0], vec![90.0]]);

        let outcome = run(&params, &series, 1);

        assert_eq!(outcome.terminal_pnl, 0.0);
        assert_eq!(outcome.buys, 0);
        assert_eq!(outcome.sells, 0);
        assert_eq!(outcome.fees_paid, 0.0);
        assert_eq!(outcome.equity_curve, vec![10_000.0; 3]);
    }

    #[test]
    fn test_equity_curve_covers_full_series() {
        let params = SimulationParams::default();
        let series = series(vec![vec![100.0, 50.0]; 10]);

        let outcome = run(&params, &series, 2);

        assert_eq!(outcome.equity_curve.len(), 10);
    }

    #[test]
    fn test_flat_prices_no_fees_round_trip() {
        // Constant prices, always buying, no fees, 1x leverage:
        // every position closes at its entry price, so terminal cash
        // equals initial capital exactly.
        let params = SimulationParams {
            prob_hold: 0.0,
            prob_buy: 1.0,
            prob_sell: 0.0,
            trading_fee_rate: 0.0,
            leverage: 1.0,
            ..Default::default()
        };
        let series = series(vec![vec![100.0, 40.0]; 5]);

        let outcome = run(&params, &series, 3);

        assert!(outcome.buys > 0);
        assert!((outcome.final_cash - 10_000.0).abs() < 1e-6);
        assert_eq!(outcome.fees_paid, 0.0);
        assert!(outcome.margin_call.is_none());
    }

    #[test]
    fn test_leveraged_drop_triggers_margin_call() {
        // All-in position at t=0, then a 50% drop at 15x leverage.
        // Equity goes deeply negative, far below any positive
        // maintenance ratio.
        let params = SimulationParams {
            prob_hold: 1.0,
            prob_buy: 0.0,
            prob_sell: 0.0,
            leverage: 15.0,
            trading_fee_rate: 0.0,
            margin_maintenance_threshold: 0.05,
            ..Default::default()
        };
        let series = series(vec![vec![100.0], vec![50.0], vec![50.0], vec![50.0]]);

        let mut rng = SmallRng::seed_from_u64(4);
        let mut engine = TrajectoryEngine::new(0, &params, &series);
        engine.step(0, &mut rng).unwrap();
        // Full commitment: margin 10k, notional 150k, borrowed 140k.
        engine.ledger.open_or_add(0, 1.0, 100.0).unwrap();

        for t in 1..series.len() {
            engine.step(t, &mut rng).unwrap();
        }

        let event = engine.margin_call.expect("expected a margin call");
        assert_eq!(event.timestep, 1);
        // Equity at the breach: 0 cash + 75k position - 140k borrowed.
        assert!((event.equity + 65_000.0).abs() < 1e-6);
        assert_eq!(engine.state, EngineState::Liquidated);

        // Settlement absorbs the shortfall: the loss is capped at the
        // posted capital, so cash floors at zero.
        assert_eq!(engine.ledger.cash(), 0.0);

        // After liquidation the equity curve is flat carry-forward.
        assert_eq!(engine.equity_curve[1], 0.0);
        assert_eq!(engine.equity_curve[2], 0.0);
        assert_eq!(engine.equity_curve[3], 0.0);
    }

    #[test]
    fn test_no_trades_after_liquidation() {
        let params = SimulationParams {
            prob_hold: 1.0,
            prob_buy: 0.0,
            prob_sell: 0.0,
            leverage: 15.0,
            trading_fee_rate: 0.0,
            margin_maintenance_threshold: 0.05,
            ..Default::default()
        };
        let mut rows = vec![vec![100.0], vec![50.0]];
        rows.extend(vec![vec![50.0]; 20]);
        let series = series(rows);

        let mut rng = SmallRng::seed_from_u64(5);
        let mut engine = TrajectoryEngine::new(0, &params, &series);
        engine.step(0, &mut rng).unwrap();
        engine.ledger.open_or_add(0, 1.0, 100.0).unwrap();
        engine.step(1, &mut rng).unwrap();
        assert!(engine.margin_call.is_some());

        // Flip to an all-buy policy: the absorbing state must ignore
        // it for the rest of the run.
        let buy_params = SimulationParams {
            prob_hold: 0.0,
            prob_buy: 1.0,
            prob_sell: 0.0,
            ..params.clone()
        };
        engine.policy = ActionPolicy::new(&buy_params);
        for t in 2..series.len() {
            engine.step(t, &mut rng).unwrap();
        }

        assert_eq!(engine.buys, 0);
        assert!(engine.ledger.is_flat());
        // Forced close at t=1 was the only sell.
        assert_eq!(engine.sells, 1);
    }

    #[test]
    fn test_sell_requests_against_flat_assets_charge_no_fees() {
        let params = SimulationParams {
            prob_hold: 0.0,
            prob_buy: 0.0,
            prob_sell: 1.0,
            ..Default::default()
        };
        let series = series(vec![vec![100.0, 50.0]; 5]);

        let outcome = run(&params, &series, 6);

        assert_eq!(outcome.buys, 0);
        assert_eq!(outcome.sells, 0);
        assert_eq!(outcome.fees_paid, 0.0);
        assert_eq!(outcome.terminal_pnl, 0.0);
    }

    #[test]
    fn test_avoid_selling_winners_keeps_profitable_position() {
        // Buy at t=0, then the price rises and every later draw is a
        // sell request. With the winners filter on, the position is
        // only closed by the end-of-run forced close.
        let params = SimulationParams {
            prob_hold: 0.0,
            prob_buy: 1.0,
            prob_sell: 0.0,
            leverage: 1.0,
            trading_fee_rate: 0.0,
            avoid_selling_winners: true,
            ..Default::default()
        };
        let rising = series(vec![vec![100.0], vec![120.0], vec![140.0]]);

        let mut rng = SmallRng::seed_from_u64(7);
        let mut engine = TrajectoryEngine::new(0, &params, &rising);

        // Drive the first step (buys), then flip the policy to
        // all-sell for the remaining steps.
        engine.step(0, &mut rng).unwrap();
        let sell_params = SimulationParams {
            prob_hold: 0.0,
            prob_buy: 0.0,
            prob_sell: 1.0,
            ..params.clone()
        };
        engine.policy = ActionPolicy::new(&sell_params);
        engine.step(1, &mut rng).unwrap();
        engine.step(2, &mut rng).unwrap();

        // Still held through the rise: only forced close remains.
        assert!(engine.ledger.units(0) > 0.0);
        assert_eq!(engine.sells, 0);
    }

    #[test]
    fn test_fees_are_the_only_pnl_at_flat_prices() {
        // At constant prices every round trip breaks even before
        // fees, so the terminal loss must equal the accumulated fees
        // exactly.
        let params = SimulationParams {
            prob_hold: 0.0,
            prob_buy: 1.0,
            prob_sell: 0.0,
            leverage: 2.0,
            trading_fee_rate: 0.01,
            ..Default::default()
        };
        let series = series(vec![vec![100.0]; 4]);

        let outcome = run(&params, &series, 8);

        assert!(outcome.fees_paid > 0.0);
        assert!((outcome.terminal_pnl + outcome.fees_paid).abs() < 1e-6);
    }

    #[test]
    fn test_same_seed_identical_outcome() {
        let params = SimulationParams {
            leverage: 3.0,
            ..Default::default()
        };
        let rows: Vec<Vec<f64>> = (0..50)
            .map(|i| vec![100.0 + f64::from(i), 50.0 + f64::from(i) * 0.5])
            .collect();
        let series = series(rows);

        let a = run(&params, &series, 99);
        let b = run(&params, &series, 99);

        assert_eq!(a.terminal_pnl, b.terminal_pnl);
        assert_eq!(a.equity_curve, b.equity_curve);
        assert_eq!(a.buys, b.buys);
        assert_eq!(a.sells, b.sells);
    }
}

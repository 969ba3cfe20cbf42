//! Per-trajectory position ledger.
//!
//! Tracks free cash, per-asset holdings, average entry prices, posted
//! margin, and borrowed notional for one trajectory. Buys commit the
//! unleveraged margin from cash and borrow the rest; sells always
//! liquidate the full position and repay the borrow.
//!
//! The ledger never lets holdings go negative: closing a flat asset
//! is a no-op, and there are no partial sells.

use serde::{Deserialize, Serialize};

/// An executed trade, reported back to the engine for fee and trade
/// accounting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    /// Leveraged notional of the trade.
    pub notional: f64,
    /// Fee charged on the notional.
    pub fee: f64,
    /// Units bought or sold.
    pub units: f64,
}

/// Position and cash state for one trajectory.
#[derive(Debug, Clone)]
pub struct PositionLedger {
    cash: f64,
    leverage: f64,
    fee_rate: f64,
    min_trade_notional: f64,
    units: Vec<f64>,
    avg_entry: Vec<f64>,
    margin_posted: Vec<f64>,
    borrowed: Vec<f64>,
    fees_paid: f64,
}

impl PositionLedger {
    /// Create a flat ledger holding `initial_capital` in cash.
    #[must_use]
    pub fn new(
        initial_capital: f64,
        leverage: f64,
        fee_rate: f64,
        min_trade_notional: f64,
        num_assets: usize,
    ) -> Self {
        Self {
            cash: initial_capital,
            leverage,
            fee_rate,
            min_trade_notional,
            units: vec![0.0; num_assets],
            avg_entry: vec![0.0; num_assets],
            margin_posted: vec![0.0; num_assets],
            borrowed: vec![0.0; num_assets],
            fees_paid: 0.0,
        }
    }

    /// Free cash.
    #[must_use]
    pub const fn cash(&self) -> f64 {
        self.cash
    }

    /// Units held for an asset.
    #[must_use]
    pub fn units(&self, asset: usize) -> f64 {
        self.units[asset]
    }

    /// Volume-weighted average entry price for an asset.
    #[must_use]
    pub fn avg_entry_price(&self, asset: usize) -> f64 {
        self.avg_entry[asset]
    }

    /// Total fees charged so far.
    #[must_use]
    pub const fn fees_paid(&self) -> f64 {
        self.fees_paid
    }

    /// Sum of borrowed notional across all assets.
    #[must_use]
    pub fn total_borrowed(&self) -> f64 {
        self.borrowed.iter().sum()
    }

    /// True when no asset is held.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.units.iter().all(|&u| u == 0.0)
    }

    /// Open or add to a long position.
    ///
    /// Commits `cash_fraction * cash` as margin, borrows the
    /// leveraged remainder, and charges the fee on the full notional.
    /// Returns `None` without mutating state when the notional falls
    /// below the minimum trade floor or when margin plus fee would
    /// overdraw cash.
    pub fn open_or_add(&mut self, asset: usize, cash_fraction: f64, price: f64) -> Option<Fill> {
        let margin = cash_fraction * self.cash;
        let notional = margin * self.leverage;
        if notional < self.min_trade_notional {
            return None;
        }

        let fee = notional * self.fee_rate;
        if margin + fee > self.cash {
            return None;
        }

        let bought = notional / price;
        let held = self.units[asset];
        self.avg_entry[asset] =
            (held * self.avg_entry[asset] + bought * price) / (held + bought);
        self.units[asset] = held + bought;
        self.margin_posted[asset] += margin;
        self.borrowed[asset] += notional - margin;
        self.cash -= margin + fee;
        self.fees_paid += fee;

        Some(Fill {
            notional,
            fee,
            units: bought,
        })
    }

    /// Close the full position for an asset at `price`.
    ///
    /// Credits sale proceeds minus borrow repayment minus fee to
    /// cash, then zeroes the asset's state. Returns `None` when the
    /// asset is flat (a sell request against a flat asset is always a
    /// no-op).
    pub fn close(&mut self, asset: usize, price: f64) -> Option<Fill> {
        let units = self.units[asset];
        if units <= 0.0 {
            return None;
        }

        let proceeds = units * price;
        let fee = proceeds * self.fee_rate;
        self.cash += proceeds - self.borrowed[asset] - fee;
        self.fees_paid += fee;

        self.units[asset] = 0.0;
        self.avg_entry[asset] = 0.0;
        self.margin_posted[asset] = 0.0;
        self.borrowed[asset] = 0.0;

        Some(Fill {
            notional: proceeds,
            fee,
            units,
        })
    }

    /// Close every open position at the given prices and settle the
    /// account. Returns the number of positions closed.
    ///
    /// Losses are capped at the posted capital: when the borrow
    /// repayment exceeds the sale proceeds, the shortfall is absorbed
    /// and cash settles at zero.
    pub fn force_close_all(&mut self, prices: &[f64]) -> usize {
        let mut closed = 0;
        for asset in 0..self.units.len() {
            if self.close(asset, prices[asset]).is_some() {
                closed += 1;
            }
        }
        if self.cash < 0.0 {
            self.cash = 0.0;
        }
        closed
    }

    /// Mark-to-market equity at the given prices:
    /// `cash + Σ units × price − Σ borrowed`. Non-mutating.
    #[must_use]
    pub fn mark_to_market(&self, prices: &[f64]) -> f64 {
        let position_value: f64 = self
            .units
            .iter()
            .zip(prices)
            .map(|(&u, &p)| u * p)
            .sum();
        self.cash + position_value - self.total_borrowed()
    }
}

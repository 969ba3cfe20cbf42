//! Distribution statistics over terminal P&L.
//!
//! Computed once per batch over completed trajectories only. Exact
//! plotting and serialization of the distribution is out of scope;
//! this is the summary handed to downstream consumers.

use serde::{Deserialize, Serialize};

/// Summary statistics of a terminal P&L distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PnlSummary {
    /// Number of values summarized.
    pub count: u64,
    /// Mean value.
    pub mean: f64,
    /// Median (50th percentile).
    pub median: f64,
    /// Sample standard deviation.
    pub std_dev: f64,
    /// Minimum value.
    pub min: f64,
    /// Maximum value.
    pub max: f64,
    /// 5th percentile.
    pub percentile_5: f64,
    /// 25th percentile.
    pub percentile_25: f64,
    /// 75th percentile.
    pub percentile_75: f64,
    /// 95th percentile.
    pub percentile_95: f64,
    /// Fraction of values below zero.
    pub prob_loss: f64,
}

impl PnlSummary {
    /// Summarize a set of terminal P&L values. Returns the default
    /// (all-zero) summary for an empty slice.
    #[must_use]
    pub fn from_pnls(pnls: &[f64]) -> Self {
        if pnls.is_empty() {
            return Self::default();
        }

        let n = pnls.len();
        let mut sorted = pnls.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let sum: f64 = pnls.iter().sum();
        let mean = sum / n as f64;

        let median = if n % 2 == 0 {
            f64::midpoint(sorted[n / 2 - 1], sorted[n / 2])
        } else {
            sorted[n / 2]
        };

        let variance = if n > 1 {
            pnls.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };

        let losses = pnls.iter().filter(|&&v| v < 0.0).count();

        Self {
            count: n as u64,
            mean,
            median,
            std_dev: variance.sqrt(),
            min: sorted[0],
            max: sorted[n - 1],
            percentile_5: percentile(&sorted, 0.05),
            percentile_25: percentile(&sorted, 0.25),
            percentile_75: percentile(&sorted, 0.75),
            percentile_95: percentile(&sorted, 0.95),
            prob_loss: losses as f64 / n as f64,
        }
    }
}

/// Percentile by index into a sorted slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let idx = ((sorted.len() as f64 * q) as usize).min(sorted.len() - 1);
    sorted[idx]
}

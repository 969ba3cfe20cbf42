//! Error taxonomy for the simulation engine.
//!
//! Two failure classes exist:
//!
//! - [`ConfigError`]: invalid parameters or malformed price data.
//!   Raised once at the driver boundary before any trajectory runs,
//!   never retried.
//! - [`TrajectoryError`]: a numeric failure inside a single
//!   trajectory. Tagged with the trajectory id, isolated from the
//!   rest of the batch.
//!
//! A margin call is not an error. It is an expected state transition
//! recorded as [`crate::sim::MarginCallEvent`] on the affected
//! trajectory's outcome.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors detected during configuration or price-series validation.
///
/// All variants are fatal: the batch is rejected before any
/// trajectory starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric parameter is outside its allowed range.
    #[error("Invalid parameter '{name}': {constraint} (got {value})")]
    InvalidParameter {
        /// Parameter name as it appears in the config file.
        name: &'static str,
        /// Human-readable constraint, e.g. "must be > 0".
        constraint: &'static str,
        /// The offending value.
        value: f64,
    },

    /// Action probabilities do not sum to 1.0.
    #[error("Action probabilities must sum to 1.0 (currently sum to {sum})")]
    ProbabilitySum {
        /// Actual sum of `prob_hold + prob_buy + prob_sell`.
        sum: f64,
    },

    /// The price series has fewer than two timesteps.
    #[error("Price series too short: {timesteps} timesteps (need at least 2)")]
    SeriesTooShort {
        /// Number of timesteps in the series.
        timesteps: usize,
    },

    /// Timestamps are not strictly increasing.
    #[error("Timestamps not strictly increasing at row {row}")]
    NonMonotonicTimestamps {
        /// Index of the first offending row.
        row: usize,
    },

    /// A gap was found in the otherwise regular timestamp grid.
    #[error("Gap in price series at row {row}: expected interval {expected_secs}s, found {found_secs}s")]
    SeriesGap {
        /// Index of the row after the gap.
        row: usize,
        /// Interval implied by the first two timestamps, in seconds.
        expected_secs: i64,
        /// Interval actually observed, in seconds.
        found_secs: i64,
    },

    /// A price is NaN, infinite, or not strictly positive.
    #[error("Invalid price for asset '{asset}' at row {row}: {value}")]
    InvalidPrice {
        /// Asset column name.
        asset: String,
        /// Row index of the offending price.
        row: usize,
        /// The offending value.
        value: f64,
    },

    /// A price row does not match the declared asset count.
    #[error("Price row {row} has {found} columns, expected {expected}")]
    ColumnMismatch {
        /// Row index.
        row: usize,
        /// Columns expected (number of assets).
        expected: usize,
        /// Columns found.
        found: usize,
    },

    /// Failed to read a configuration or price file.
    #[error("Failed to read file '{path}': {source}")]
    ReadError {
        /// Path to the file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Failed to parse the JSON price file.
    #[error("Failed to parse price file JSON: {0}")]
    PriceParseError(#[from] serde_json::Error),

    /// A timestamp string in the price file is not valid RFC 3339.
    #[error("Invalid timestamp '{value}' at row {row}: {message}")]
    InvalidTimestamp {
        /// Row index.
        row: usize,
        /// The offending timestamp string.
        value: String,
        /// Parser error message.
        message: String,
    },

    /// Rayon thread pool initialization failed.
    #[error("Failed to initialize thread pool: {message}")]
    ThreadPool {
        /// Error message from the pool builder.
        message: String,
    },
}

/// A failure isolated to one trajectory.
///
/// The batch continues; the failed trajectory's slot carries this
/// error and its terminal P&L is excluded from summary statistics.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrajectoryError {
    /// Mark-to-market equity became NaN or infinite mid-run.
    #[error("Trajectory {trajectory_id}: non-finite equity at timestep {timestep}")]
    NonFiniteEquity {
        /// Id of the affected trajectory.
        trajectory_id: u64,
        /// Timestep at which equity stopped being finite.
        timestep: usize,
    },
}

impl TrajectoryError {
    /// Id of the trajectory this error belongs to.
    #[must_use]
    pub const fn trajectory_id(&self) -> u64 {
        match self {
            Self::NonFiniteEquity { trajectory_id, .. } => *trajectory_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidParameter {
            name: "leverage",
            constraint: "must be >= 1",
            value: 0.5,
        };
        assert!(err.to_string().contains("leverage"));
        assert!(err.to_string().contains("0.5"));
    }

    #[test]
    fn test_trajectory_error_carries_id() {
        let err = TrajectoryError::NonFiniteEquity {
            trajectory_id: 42,
            timestep: 7,
        };
        assert_eq!(err.trajectory_id(), 42);
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_trajectory_error_serializes() {
        let err = TrajectoryError::NonFiniteEquity {
            trajectory_id: 3,
            timestep: 1,
        };
        let json = serde_json::to_string(&err).unwrap();
        let back: TrajectoryError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }
}

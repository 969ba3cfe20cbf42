//! Immutable, validated price series shared across trajectories.
//!
//! The series is the only data shared between trajectories and it is
//! read-only, so the driver hands out plain references with no
//! locking.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ConfigError;

/// An aligned, gap-free table of prices: one row per timestep, one
/// column per asset.
///
/// Construction validates the invariants once; after that, accessors
/// are infallible. Prices are stored row-major in a flat buffer.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    timestamps: Vec<DateTime<Utc>>,
    assets: Vec<String>,
    prices: Vec<f64>,
}

impl PriceSeries {
    /// Build a series from timestamps and row-major price rows.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the series has fewer than two
    /// timesteps, timestamps are not strictly increasing on a uniform
    /// grid, a row's column count mismatches the asset list, or any
    /// price is non-finite or not strictly positive.
    pub fn new(
        timestamps: Vec<DateTime<Utc>>,
        assets: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, ConfigError> {
        if timestamps.len() < 2 {
            return Err(ConfigError::SeriesTooShort {
                timesteps: timestamps.len(),
            });
        }

        if rows.len() != timestamps.len() {
            return Err(ConfigError::ColumnMismatch {
                row: rows.len().min(timestamps.len()),
                expected: timestamps.len(),
                found: rows.len(),
            });
        }

        let expected_interval = timestamps[1] - timestamps[0];
        for (row, pair) in timestamps.windows(2).enumerate() {
            let interval = pair[1] - pair[0];
            if interval <= chrono::Duration::zero() {
                return Err(ConfigError::NonMonotonicTimestamps { row: row + 1 });
            }
            if interval != expected_interval {
                return Err(ConfigError::SeriesGap {
                    row: row + 1,
                    expected_secs: expected_interval.num_seconds(),
                    found_secs: interval.num_seconds(),
                });
            }
        }

        let num_assets = assets.len();
        let mut prices = Vec::with_capacity(timestamps.len() * num_assets);
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != num_assets {
                return Err(ConfigError::ColumnMismatch {
                    row: row_idx,
                    expected: num_assets,
                    found: row.len(),
                });
            }
            for (col, &price) in row.iter().enumerate() {
                if !price.is_finite() || price <= 0.0 {
                    return Err(ConfigError::InvalidPrice {
                        asset: assets[col].clone(),
                        row: row_idx,
                        value: price,
                    });
                }
            }
            prices.extend_from_slice(row);
        }

        Ok(Self {
            timestamps,
            assets,
            prices,
        })
    }

    /// Number of timesteps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// True when the series holds no timesteps. Construction rejects
    /// this, so it only occurs on a default-ish value in tests.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Number of asset columns.
    #[must_use]
    pub fn num_assets(&self) -> usize {
        self.assets.len()
    }

    /// Asset column names.
    #[must_use]
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Timestamp of a row.
    #[must_use]
    pub fn timestamp(&self, timestep: usize) -> DateTime<Utc> {
        self.timestamps[timestep]
    }

    /// Price row at a timestep (one price per asset).
    #[must_use]
    pub fn row(&self, timestep: usize) -> &[f64] {
        let n = self.assets.len();
        &self.prices[timestep * n..(timestep + 1) * n]
    }

    /// The final price row.
    #[must_use]
    pub fn last_row(&self) -> &[f64] {
        self.row(self.len() - 1)
    }
}

/// On-disk price file layout: RFC 3339 timestamps, asset names, and
/// row-major prices.
#[derive(Debug, Deserialize)]
pub struct PriceFile {
    /// RFC 3339 timestamps, one per row.
    pub timestamps: Vec<String>,
    /// Asset column names.
    pub assets: Vec<String>,
    /// Row-major prices, one row per timestamp.
    pub prices: Vec<Vec<f64>>,
}

/// Load and validate a price series from a JSON file.
///
/// # Errors
///
/// Returns [`ConfigError`] on read, parse, or validation failure.
pub fn load_series(path: &str) -> Result<PriceSeries, ConfigError> {
    let contents =
        std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_string(),
            source,
        })?;

    let file: PriceFile = serde_json::from_str(&contents)?;

    let mut timestamps = Vec::with_capacity(file.timestamps.len());
    for (row, raw) in file.timestamps.iter().enumerate() {
        let parsed = DateTime::parse_from_rfc3339(raw).map_err(|e| {
            ConfigError::InvalidTimestamp {
                row,
                value: raw.clone(),
                message: e.to_string(),
            }
        })?;
        timestamps.push(parsed.with_timezone(&Utc));
    }

    PriceSeries::new(timestamps, file.assets, file.prices)
}

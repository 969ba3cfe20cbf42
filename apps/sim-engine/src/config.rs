//! Simulation parameters: loading, defaults, and validation.
//!
//! Parameters are validated exactly once, at batch start. A violation
//! produces a [`ConfigError`] and no trajectory runs. Individual
//! trajectories never re-validate.
//!
//! # Usage
//!
//! ```rust,ignore
//! use sim_engine::config::{SimulationParams, load_params};
//!
//! // Load from YAML
//! let params = load_params("params.yaml")?;
//!
//! // Or build in code
//! let params = SimulationParams {
//!     num_simulations: 10_000,
//!     random_seed: Some(42),
//!     ..SimulationParams::default()
//! };
//! params.validate()?;
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tolerance for the probability-sum check.
const PROB_SUM_TOLERANCE: f64 = 1e-9;

/// Strategy and batch parameters for one Monte Carlo run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Starting free cash per trajectory. Must be > 0.
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,

    /// Fee charged on the leveraged notional of every executed buy
    /// or sell. Must be in [0, 1).
    #[serde(default = "default_trading_fee_rate")]
    pub trading_fee_rate: f64,

    /// Upper bound of the uniform buy-fraction draw. Must be in
    /// (0, 1].
    #[serde(default = "default_max_buy_perc_cash")]
    pub max_buy_perc_cash: f64,

    /// Number of independent trajectories to run. Must be > 0.
    #[serde(default = "default_num_simulations")]
    pub num_simulations: u64,

    /// Leverage multiplier applied to committed margin. Must be >= 1.
    #[serde(default = "default_leverage")]
    pub leverage: f64,

    /// Per-step, per-asset probability of holding.
    #[serde(default = "default_prob_hold")]
    pub prob_hold: f64,

    /// Per-step, per-asset probability of buying.
    #[serde(default = "default_prob_buy")]
    pub prob_buy: f64,

    /// Per-step, per-asset probability of requesting a sell.
    #[serde(default = "default_prob_sell")]
    pub prob_sell: f64,

    /// Maintenance threshold for the margin ratio
    /// (equity / borrowed notional). Must be > 0. Falling below it
    /// forces full liquidation.
    #[serde(default = "default_margin_maintenance_threshold")]
    pub margin_maintenance_threshold: f64,

    /// Root seed for per-trajectory random streams. None draws a
    /// time-based seed (non-reproducible).
    #[serde(default)]
    pub random_seed: Option<u64>,

    /// When true, a sell request against a position trading above its
    /// average entry price is downgraded to a hold.
    #[serde(default)]
    pub avoid_selling_winners: bool,

    /// Buys with leveraged notional below this floor are skipped.
    /// Must be > 0.
    #[serde(default = "default_min_trade_notional")]
    pub min_trade_notional: f64,

    /// Worker threads for the driver (0 = all available).
    #[serde(default)]
    pub max_threads: usize,
}

const fn default_initial_capital() -> f64 {
    10_000.0
}

const fn default_trading_fee_rate() -> f64 {
    0.001
}

const fn default_max_buy_perc_cash() -> f64 {
    0.5
}

const fn default_num_simulations() -> u64 {
    10_000
}

const fn default_leverage() -> f64 {
    1.0
}

const fn default_prob_hold() -> f64 {
    0.8
}

const fn default_prob_buy() -> f64 {
    0.1
}

const fn default_prob_sell() -> f64 {
    0.1
}

const fn default_margin_maintenance_threshold() -> f64 {
    0.05
}

const fn default_min_trade_notional() -> f64 {
    1.0
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            initial_capital: default_initial_capital(),
            trading_fee_rate: default_trading_fee_rate(),
            max_buy_perc_cash: default_max_buy_perc_cash(),
            num_simulations: default_num_simulations(),
            leverage: default_leverage(),
            prob_hold: default_prob_hold(),
            prob_buy: default_prob_buy(),
            prob_sell: default_prob_sell(),
            margin_maintenance_threshold: default_margin_maintenance_threshold(),
            random_seed: None,
            avoid_selling_winners: false,
            min_trade_notional: default_min_trade_notional(),
            max_threads: 0,
        }
    }
}

impl SimulationParams {
    /// Validate all parameters.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found. Checked once at batch
    /// start by the driver.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "initial_capital",
                constraint: "must be finite and > 0",
                value: self.initial_capital,
            });
        }

        if !(self.trading_fee_rate.is_finite()
            && (0.0..1.0).contains(&self.trading_fee_rate))
        {
            return Err(ConfigError::InvalidParameter {
                name: "trading_fee_rate",
                constraint: "must be in [0, 1)",
                value: self.trading_fee_rate,
            });
        }

        if !(self.max_buy_perc_cash.is_finite()
            && self.max_buy_perc_cash > 0.0
            && self.max_buy_perc_cash <= 1.0)
        {
            return Err(ConfigError::InvalidParameter {
                name: "max_buy_perc_cash",
                constraint: "must be in (0, 1]",
                value: self.max_buy_perc_cash,
            });
        }

        if self.num_simulations == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "num_simulations",
                constraint: "must be > 0",
                value: 0.0,
            });
        }

        if !(self.leverage.is_finite() && self.leverage >= 1.0) {
            return Err(ConfigError::InvalidParameter {
                name: "leverage",
                constraint: "must be finite and >= 1",
                value: self.leverage,
            });
        }

        for (name, value) in [
            ("prob_hold", self.prob_hold),
            ("prob_buy", self.prob_buy),
            ("prob_sell", self.prob_sell),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidParameter {
                    name,
                    constraint: "must be finite and >= 0",
                    value,
                });
            }
        }

        let sum = self.prob_hold + self.prob_buy + self.prob_sell;
        if (sum - 1.0).abs() > PROB_SUM_TOLERANCE {
            return Err(ConfigError::ProbabilitySum { sum });
        }

        if !(self.margin_maintenance_threshold.is_finite()
            && self.margin_maintenance_threshold > 0.0)
        {
            return Err(ConfigError::InvalidParameter {
                name: "margin_maintenance_threshold",
                constraint: "must be finite and > 0",
                value: self.margin_maintenance_threshold,
            });
        }

        if !(self.min_trade_notional.is_finite() && self.min_trade_notional > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "min_trade_notional",
                constraint: "must be finite and > 0",
                value: self.min_trade_notional,
            });
        }

        Ok(())
    }
}

/// Load parameters from a YAML file and validate them.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read, parsed, or
/// fails validation.
pub fn load_params(path: &str) -> Result<SimulationParams, ConfigError> {
    let contents =
        std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_string(),
            source,
        })?;

    let params: SimulationParams = serde_yaml_bw::from_str(&contents)?;
    params.validate()?;
    Ok(params)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        let params = SimulationParams::default();
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_default_matches_reference_strategy() {
        let params = SimulationParams::default();
        assert_eq!(params.initial_capital, 10_000.0);
        assert_eq!(params.trading_fee_rate, 0.001);
        assert_eq!(params.prob_hold, 0.8);
        assert!(!params.avoid_selling_winners);
    }

    #[test_case(0.0 ; "zero capital")]
    #[test_case(-100.0 ; "negative capital")]
    #[test_case(f64::NAN ; "nan capital")]
    fn test_invalid_initial_capital(value: f64) {
        let params = SimulationParams {
            initial_capital: value,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::InvalidParameter {
                name: "initial_capital",
                ..
            })
        ));
    }

    #[test_case(1.0 ; "fee of one")]
    #[test_case(-0.01 ; "negative fee")]
    fn test_invalid_fee_rate(value: f64) {
        let params = SimulationParams {
            trading_fee_rate: value,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test_case(0.0 ; "zero fraction")]
    #[test_case(1.5 ; "above one")]
    fn test_invalid_max_buy_perc_cash(value: f64) {
        let params = SimulationParams {
            max_buy_perc_cash: value,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_leverage_below_one_rejected() {
        let params = SimulationParams {
            leverage: 0.5,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::InvalidParameter { name: "leverage", .. })
        ));
    }

    #[test]
    fn test_probability_sum_mismatch() {
        let params = SimulationParams {
            prob_hold: 0.5,
            prob_buy: 0.3,
            prob_sell: 0.3,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::ProbabilitySum { .. })
        ));
    }

    #[test]
    fn test_negative_probability_rejected() {
        let params = SimulationParams {
            prob_hold: 1.2,
            prob_buy: -0.1,
            prob_sell: -0.1,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_zero_simulations_rejected() {
        let params = SimulationParams {
            num_simulations: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let params = SimulationParams {
            random_seed: Some(7),
            leverage: 15.0,
            ..Default::default()
        };
        let yaml = serde_yaml_bw::to_string(&params).unwrap();
        let back: SimulationParams = serde_yaml_bw::from_str(&yaml).unwrap();
        assert_eq!(back.random_seed, Some(7));
        assert_eq!(back.leverage, 15.0);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "num_simulations: 100\nrandom_seed: 1\n";
        let params: SimulationParams = serde_yaml_bw::from_str(yaml).unwrap();
        assert_eq!(params.num_simulations, 100);
        assert_eq!(params.initial_capital, 10_000.0);
        assert!(params.validate().is_ok());
    }
}

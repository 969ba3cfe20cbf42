//! Maintenance-margin monitoring.
//!
//! Each timestep the engine computes the margin ratio
//! (equity / total borrowed notional) and compares it against the
//! configured maintenance threshold. A breach forces full
//! liquidation; it is a recorded state transition, not an error.

/// Margin ratio for the given equity and borrowed notional.
///
/// With nothing borrowed the position cannot be margin-called, so the
/// ratio is positive infinity.
#[must_use]
pub fn margin_ratio(equity: f64, borrowed: f64) -> f64 {
    if borrowed <= 0.0 {
        f64::INFINITY
    } else {
        equity / borrowed
    }
}

/// Compares margin ratios against a maintenance threshold.
#[derive(Debug, Clone, Copy)]
pub struct MarginMonitor {
    maintenance_threshold: f64,
}

impl MarginMonitor {
    /// Create a monitor with the given maintenance threshold.
    #[must_use]
    pub const fn new(maintenance_threshold: f64) -> Self {
        Self {
            maintenance_threshold,
        }
    }

    /// True when the margin ratio has fallen below the maintenance
    /// threshold and the position must be force-closed.
    #[must_use]
    pub fn is_breached(&self, equity: f64, borrowed: f64) -> bool {
        margin_ratio(equity, borrowed) < self.maintenance_threshold
    }
}

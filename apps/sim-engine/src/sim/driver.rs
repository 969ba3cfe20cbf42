//! Batch driver: parallel fan-out of trajectories using Rayon.
//!
//! The driver validates parameters exactly once, derives one seed per
//! trajectory from the root seed, and runs trajectories on a
//! work-stealing pool. Results are collected into id-ordered slots so
//! the output is independent of scheduling order.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::SimulationParams;
use crate::error::ConfigError;
use crate::series::PriceSeries;
use crate::sim::engine::TrajectoryEngine;
use crate::sim::result::{BatchResult, TrajectorySlot};
use crate::sim::summary::PnlSummary;

/// Progress is logged every this many finished trajectories.
const PROGRESS_LOG_INTERVAL: u64 = 1000;

/// Shared cancellation flag for a running batch.
///
/// Cheap to clone; setting it stops trajectories that have not started
/// yet. Trajectories already running finish normally.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Create a fresh, unset handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the batch.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// True once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Progress tracker shared across worker threads.
#[derive(Debug)]
pub struct ProgressTracker {
    total: u64,
    completed: AtomicU64,
    failed: AtomicU64,
    start_time: Instant,
}

impl ProgressTracker {
    /// Create a tracker for `total` trajectories.
    #[must_use]
    pub fn new(total: u64) -> Self {
        Self {
            total,
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record one finished trajectory. Returns the finished count so
    /// callers can decide whether to log.
    pub fn trajectory_finished(&self, success: bool) -> u64 {
        if !success {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.completed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Snapshot of current progress.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn progress(&self) -> Progress {
        let completed = self.completed.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let elapsed = self.start_time.elapsed();

        // Precision loss acceptable for rate calculation (approximate metric)
        let per_sec = if elapsed.as_secs_f64() > 0.0 {
            completed as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let remaining = self.total.saturating_sub(completed);
        // Truncation acceptable for ETA calculation (approximate metric)
        let eta_secs = if per_sec > 0.0 {
            (remaining as f64 / per_sec) as u64
        } else {
            0
        };

        Progress {
            total: self.total,
            completed,
            failed,
            elapsed_secs: elapsed.as_secs(),
            eta_secs,
            per_sec,
        }
    }
}

/// Progress snapshot.
#[derive(Debug, Clone)]
pub struct Progress {
    /// Total trajectories in the batch.
    pub total: u64,
    /// Trajectories finished so far (including failures).
    pub completed: u64,
    /// Trajectories that failed.
    pub failed: u64,
    /// Elapsed time in seconds.
    pub elapsed_secs: u64,
    /// Estimated time remaining in seconds.
    pub eta_secs: u64,
    /// Trajectories finished per second.
    pub per_sec: f64,
}

impl Progress {
    /// Completion percentage.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            // Precision loss acceptable for percentage display
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }
}

/// Monte Carlo batch driver.
///
/// Owns validated parameters; one driver can run any number of
/// batches against different price series.
#[derive(Debug)]
pub struct MonteCarloDriver {
    params: SimulationParams,
}

impl MonteCarloDriver {
    /// Create a driver, validating parameters up front.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any parameter is out of range.
    /// Trajectories never re-validate.
    pub fn new(params: SimulationParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// The driver's parameters.
    #[must_use]
    pub const fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Run a full batch against `series`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ThreadPool`] if the worker pool cannot
    /// be built. Individual trajectory failures do not fail the batch.
    pub fn run(&self, series: &PriceSeries) -> Result<BatchResult, ConfigError> {
        self.run_with_cancel(series, &CancelHandle::new())
    }

    /// Run a full batch, honoring `cancel`.
    ///
    /// Trajectories that have not started when cancellation is
    /// requested are marked [`TrajectorySlot::Cancelled`]; trajectories
    /// already running finish and keep their results.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ThreadPool`] if the worker pool cannot
    /// be built.
    #[allow(clippy::cast_possible_truncation)]
    pub fn run_with_cancel(
        &self,
        series: &PriceSeries,
        cancel: &CancelHandle,
    ) -> Result<BatchResult, ConfigError> {
        let root_seed = self.root_seed();
        let num_simulations = self.params.num_simulations;
        let tracker = Arc::new(ProgressTracker::new(num_simulations));
        let start_time = Instant::now();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.params.max_threads)
            .build()
            .map_err(|e| ConfigError::ThreadPool {
                message: e.to_string(),
            })?;

        info!(
            num_simulations,
            timesteps = series.len(),
            assets = series.num_assets(),
            threads = pool.current_num_threads(),
            root_seed,
            "Starting Monte Carlo batch"
        );

        let slots: Vec<TrajectorySlot> = pool.install(|| {
            (0..num_simulations)
                .into_par_iter()
                .map(|trajectory_id| {
                    self.run_one(trajectory_id, root_seed, series, cancel, &tracker)
                })
                .collect()
        });

        let mut completed = 0u64;
        let mut failed = 0u64;
        let mut cancelled = 0u64;
        for slot in &slots {
            match slot {
                TrajectorySlot::Completed(_) => completed += 1,
                TrajectorySlot::Failed(_) => failed += 1,
                TrajectorySlot::Cancelled => cancelled += 1,
            }
        }

        let pnls: Vec<f64> = slots
            .iter()
            .filter_map(TrajectorySlot::outcome)
            .map(|o| o.terminal_pnl)
            .collect();
        let summary = PnlSummary::from_pnls(&pnls);

        let elapsed = start_time.elapsed();
        info!(
            completed,
            failed,
            cancelled,
            elapsed_secs = elapsed.as_secs_f64(),
            mean_pnl = summary.mean,
            "Monte Carlo batch finished"
        );

        // Truncation acceptable: millis fit in u64 for practical runs
        Ok(BatchResult {
            slots,
            summary,
            completed,
            failed,
            cancelled,
            total_time_ms: elapsed.as_millis() as u64,
        })
    }

    /// Run one trajectory with its derived seed.
    fn run_one(
        &self,
        trajectory_id: u64,
        root_seed: u64,
        series: &PriceSeries,
        cancel: &CancelHandle,
        tracker: &Arc<ProgressTracker>,
    ) -> TrajectorySlot {
        if cancel.is_cancelled() {
            return TrajectorySlot::Cancelled;
        }

        let mut rng = SmallRng::seed_from_u64(root_seed.wrapping_add(trajectory_id));
        let engine = TrajectoryEngine::new(trajectory_id, &self.params, series);

        let slot = match engine.run(&mut rng) {
            Ok(outcome) => TrajectorySlot::Completed(outcome),
            Err(err) => {
                warn!(trajectory_id, %err, "Trajectory failed");
                TrajectorySlot::Failed(err)
            }
        };

        let finished = tracker.trajectory_finished(matches!(slot, TrajectorySlot::Completed(_)));
        if finished % PROGRESS_LOG_INTERVAL == 0 {
            let progress = tracker.progress();
            debug!(
                percentage = progress.percentage(),
                completed = progress.completed,
                total = progress.total,
                eta_secs = progress.eta_secs,
                "Batch progress"
            );
        }

        slot
    }

    /// Root seed: configured value, or a time-based hash when absent.
    fn root_seed(&self) -> u64 {
        self.params.random_seed.unwrap_or_else(|| {
            let mut hasher = DefaultHasher::new();
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
                .hash(&mut hasher);
            hasher.finish()
        })
    }
}

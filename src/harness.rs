//! Timing harnesses for the two kernels.
//!
//! Each harness owns its inputs, runs the kernel under the configured
//! strategies and returns a report; the binaries only print reports.

use std::fmt;
use std::time::{Duration, Instant};

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::autocorr::offload::{self, select_executor, KernelProgram};
use crate::autocorr::{max_relative_error, parallel, serial, simd, Strategy};
use crate::config::{AutocorrConfig, SurfaceConfig};
use crate::error::{Error, Result};
use crate::logging::TimingGuard;
use crate::signal::Signal;
use crate::surface::{total_volume, ControlPatch, Domain};

/// Builds a fixed-size worker pool.
///
/// # Errors
///
/// Returns [`Error::MissingCapability`] if the threads cannot be spawned.
pub fn worker_pool(threads: usize) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .thread_name(|index| format!("kernel-worker-{index}"))
        .build()
        .map_err(|e| Error::MissingCapability(format!("cannot start {threads} worker threads: {e}")))
}

// ============================================================================
// Trial statistics
// ============================================================================

/// Running max/mean over trial measurements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialStats {
    /// Largest value seen.
    pub max: f64,
    /// Sum of all values.
    pub sum: f64,
    /// Number of values.
    pub count: u64,
}

impl Default for TrialStats {
    fn default() -> Self {
        Self::new()
    }
}

impl TrialStats {
    /// Creates empty statistics.
    #[must_use]
    pub const fn new() -> Self {
        Self { max: f64::MIN, sum: 0.0, count: 0 }
    }

    /// Records one measurement.
    #[inline]
    pub fn update(&mut self, value: f64) {
        self.max = self.max.max(value);
        self.sum += value;
        self.count += 1;
    }

    /// Mean of the recorded values, 0 when empty.
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

// ============================================================================
// Surface volume
// ============================================================================

/// Mega-heights per second for `cells` evaluations in `elapsed`.
#[must_use]
pub fn mega_heights_per_sec(cells: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64().max(1e-9);
    cells as f64 / secs / 1_000_000.0
}

/// Repeated, timed surface-volume integration.
pub struct SurfaceBenchmark {
    patch: ControlPatch,
    domain: Domain,
    grid_size: usize,
    trials: usize,
    pool: ThreadPool,
}

impl SurfaceBenchmark {
    /// Prepares the benchmark and its worker pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigInvalid`] for a degenerate grid or zero trials
    /// and [`Error::MissingCapability`] if the pool cannot be started.
    pub fn from_config(config: &SurfaceConfig) -> Result<Self> {
        if config.grid_size < 2 {
            return Err(Error::config_invalid("surface.grid_size", "must be at least 2"));
        }
        if config.trials == 0 {
            return Err(Error::config_invalid("surface.trials", "must be at least 1"));
        }
        Ok(Self {
            patch: config.patch(),
            domain: config.domain,
            grid_size: config.grid_size,
            trials: config.trials,
            pool: worker_pool(config.workers)?,
        })
    }

    /// Worker threads in the pool.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs every trial and collects volume and throughput statistics.
    pub fn run(&self) -> SurfaceReport {
        let _guard = TimingGuard::new("surface benchmark");
        log::debug!(
            "surface: N={} workers={} trials={}",
            self.grid_size,
            self.workers(),
            self.trials
        );

        let cells = self.grid_size * self.grid_size;
        let mut volume = TrialStats::new();
        let mut throughput = TrialStats::new();

        for trial in 0..self.trials {
            let start = Instant::now();
            let v = total_volume(&self.patch, self.grid_size, &self.domain, &self.pool);
            let elapsed = start.elapsed();

            let rate = mega_heights_per_sec(cells, elapsed);
            log::trace!("trial {trial}: volume={v} in {elapsed:?} ({rate:.2} MH/s)");
            volume.update(v);
            throughput.update(rate);
        }

        SurfaceReport { grid_size: self.grid_size, workers: self.workers(), volume, throughput }
    }
}

/// Result of a [`SurfaceBenchmark`] run.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceReport {
    /// Grid resolution N.
    pub grid_size: usize,
    /// Worker-pool size.
    pub workers: usize,
    /// Total volume per trial.
    pub volume: TrialStats,
    /// Mega-heights per second per trial.
    pub throughput: TrialStats,
}

impl fmt::Display for SurfaceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Average volume = {:.6}", self.volume.mean())?;
        writeln!(f, "Peak throughput = {:.3} MegaHeights/sec", self.throughput.max)?;
        write!(f, "Average throughput = {:.3} MegaHeights/sec", self.throughput.mean())
    }
}

// ============================================================================
// Autocorrelation
// ============================================================================

/// Outcome of one strategy run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The strategy produced a sums array.
    Completed {
        /// Largest relative deviation from the serial result.
        max_rel_error: f32,
    },
    /// The strategy failed and was skipped.
    Skipped(String),
}

/// One timed strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyRun {
    /// Which strategy ran.
    pub strategy: Strategy,
    /// Printed label, e.g. `parallel (4 workers)`.
    pub label: String,
    /// Wall-clock time (kernel time for offload runs).
    pub elapsed: Duration,
    /// What happened.
    pub outcome: RunOutcome,
}

impl StrategyRun {
    fn completed(strategy: Strategy, label: String, elapsed: Duration, reference: &[f32], sums: &[f32]) -> Self {
        let max_rel_error = max_relative_error(reference, sums);
        log::debug!("{label}: {elapsed:?}, max relative error {max_rel_error:e}");
        Self { strategy, label, elapsed, outcome: RunOutcome::Completed { max_rel_error } }
    }

    fn skipped(strategy: Strategy, label: String, reason: &Error) -> Self {
        log::warn!("{label} skipped: {reason}");
        Self {
            strategy,
            label,
            elapsed: Duration::ZERO,
            outcome: RunOutcome::Skipped(reason.to_string()),
        }
    }
}

impl fmt::Display for StrategyRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            RunOutcome::Completed { max_rel_error } => {
                write!(f, "{} time: {:.6}", self.label, self.elapsed.as_secs_f64())?;
                if self.strategy != Strategy::Serial {
                    write!(f, " (max relative error {max_rel_error:.2e})")?;
                }
                Ok(())
            }
            RunOutcome::Skipped(reason) => write!(f, "{} skipped: {reason}", self.label),
        }
    }
}

/// Runs the autocorrelation strategies over one signal.
pub struct AutocorrBenchmark {
    signal: Signal,
    config: AutocorrConfig,
}

impl AutocorrBenchmark {
    /// Loads the configured signal file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingResource`] or [`Error::InvalidInput`] for the
    /// signal file.
    pub fn from_config(config: &AutocorrConfig) -> Result<Self> {
        let signal = Signal::load(&config.signal_path)?;
        Ok(Self::with_signal(signal, config.clone()))
    }

    /// Uses an already loaded signal.
    #[must_use]
    pub fn with_signal(signal: Signal, config: AutocorrConfig) -> Self {
        Self { signal, config }
    }

    /// The input signal.
    #[must_use]
    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    /// Runs serial, then each configured strategy in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCapability`] if a worker pool cannot be
    /// started and [`Error::MissingResource`] if the kernel file is missing.
    /// Device failures only skip the accelerator strategy.
    pub fn run(&self) -> Result<AutocorrReport> {
        let _guard = TimingGuard::new("autocorrelation benchmark");
        log::debug!("autocorrelation: S={} strategies={:?}", self.signal.len(), self.config.strategies);

        let start = Instant::now();
        let reference = serial::autocorrelate(&self.signal);
        let serial_elapsed = start.elapsed();

        let samples = self
            .config
            .sample_indices
            .iter()
            .filter_map(|&index| reference.get(index).map(|&value| (index, value)))
            .collect();

        let mut runs = Vec::new();
        for &strategy in &self.config.strategies {
            match strategy {
                Strategy::Serial => runs.push(StrategyRun::completed(
                    strategy,
                    strategy.to_string(),
                    serial_elapsed,
                    &reference,
                    &reference,
                )),
                Strategy::Parallel => {
                    for &workers in &self.config.worker_counts {
                        runs.push(self.run_parallel(workers, &reference)?);
                    }
                }
                Strategy::Simd => runs.push(self.run_simd(&reference)),
                Strategy::Offload => runs.push(self.run_offload(&reference)?),
            }
        }

        Ok(AutocorrReport { signal_len: self.signal.len(), samples, runs })
    }

    fn run_parallel(&self, workers: usize, reference: &[f32]) -> Result<StrategyRun> {
        let pool = worker_pool(workers)?;
        let start = Instant::now();
        let sums = parallel::autocorrelate(&self.signal, &pool);
        let elapsed = start.elapsed();
        let label = format!("{} ({workers} workers)", Strategy::Parallel);
        Ok(StrategyRun::completed(Strategy::Parallel, label, elapsed, reference, &sums))
    }

    fn run_simd(&self, reference: &[f32]) -> StrategyRun {
        let backend = self.config.simd_backend;
        let start = Instant::now();
        let sums = simd::autocorrelate(&self.signal, backend);
        let elapsed = start.elapsed();
        let label = format!("{} ({})", Strategy::Simd, backend.name());
        StrategyRun::completed(Strategy::Simd, label, elapsed, reference, &sums)
    }

    fn run_offload(&self, reference: &[f32]) -> Result<StrategyRun> {
        let program =
            KernelProgram::resolve(self.config.kernel_path.as_deref(), self.config.local_size)?;
        let host_workers = self.config.worker_counts.iter().copied().max().unwrap_or(1);

        let executor = match select_executor(self.config.device, host_workers) {
            Ok(executor) => executor,
            Err(e) => return Ok(StrategyRun::skipped(Strategy::Offload, Strategy::Offload.to_string(), &e)),
        };
        let label = format!("{} ({})", Strategy::Offload, executor.device_name());

        Ok(match offload::autocorrelate(&self.signal, executor.as_ref(), &program) {
            Ok(run) => StrategyRun::completed(
                Strategy::Offload,
                label,
                run.kernel_elapsed,
                reference,
                &run.output,
            ),
            Err(e) => StrategyRun::skipped(Strategy::Offload, label, &e),
        })
    }
}

/// Result of an [`AutocorrBenchmark`] run.
#[derive(Debug, Clone)]
pub struct AutocorrReport {
    /// Signal length S.
    pub signal_len: usize,
    /// `(index, Sums[index])` spot checks from the serial result.
    pub samples: Vec<(usize, f32)>,
    /// Strategy runs in execution order.
    pub runs: Vec<StrategyRun>,
}

impl AutocorrReport {
    /// Largest deviation among completed runs.
    #[must_use]
    pub fn worst_error(&self) -> f32 {
        self.runs
            .iter()
            .filter_map(|run| match run.outcome {
                RunOutcome::Completed { max_rel_error } => Some(max_rel_error),
                RunOutcome::Skipped(_) => None,
            })
            .fold(0.0, f32::max)
    }
}

impl fmt::Display for AutocorrReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Signal length = {}", self.signal_len)?;
        for (index, value) in &self.samples {
            writeln!(f, "item {index}: {value}")?;
        }
        let mut runs = self.runs.iter().peekable();
        while let Some(run) = runs.next() {
            write!(f, "{run}")?;
            if runs.peek().is_some() {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

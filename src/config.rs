//! Runtime configuration for both benchmark programs.
//!
//! Supports YAML configuration with precedence: CLI > file > defaults.
//! Defaults reproduce the classroom constants (100×100 grid, 4 workers,
//! 10 trials, the fixed top/bottom control patches).

use crate::autocorr::offload::DevicePreference;
use crate::autocorr::simd::VectorBackend;
use crate::autocorr::Strategy;
use crate::error::{Error, Result};
use crate::surface::{ControlPatch, Domain, PatchMatrix};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Surface-volume benchmark settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceConfig {
    /// Grid resolution N (nodes per side).
    #[serde(default = "default_grid_size")]
    pub grid_size: usize,

    /// Worker-pool size T.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Number of timed trials K.
    #[serde(default = "default_trials")]
    pub trials: usize,

    /// Physical extent of the patch.
    #[serde(default)]
    pub domain: Domain,

    /// Top-surface control points, indexed `[u][v]`.
    #[serde(default = "default_top")]
    pub top: PatchMatrix,

    /// Bottom-surface control points, indexed `[u][v]`.
    #[serde(default = "default_bottom")]
    pub bottom: PatchMatrix,
}

fn default_grid_size() -> usize {
    100
}
fn default_workers() -> usize {
    4
}
fn default_trials() -> usize {
    10
}
fn default_top() -> PatchMatrix {
    ControlPatch::default().top
}
fn default_bottom() -> PatchMatrix {
    ControlPatch::default().bottom
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            grid_size: default_grid_size(),
            workers: default_workers(),
            trials: default_trials(),
            domain: Domain::default(),
            top: default_top(),
            bottom: default_bottom(),
        }
    }
}

impl SurfaceConfig {
    /// Returns the control patch described by this configuration.
    #[must_use]
    pub fn patch(&self) -> ControlPatch {
        ControlPatch { top: self.top, bottom: self.bottom }
    }
}

/// Autocorrelation benchmark settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutocorrConfig {
    /// Signal input file.
    #[serde(default = "default_signal_path")]
    pub signal_path: PathBuf,

    /// Pool sizes for the thread-parallel strategy, one run per entry.
    #[serde(default = "default_worker_counts")]
    pub worker_counts: Vec<usize>,

    /// Strategies to run, in order.
    #[serde(default = "default_strategies")]
    pub strategies: Vec<Strategy>,

    /// Inner-product implementation for the vectorized strategy.
    #[serde(default)]
    pub simd_backend: VectorBackend,

    /// Work-group size for the accelerator strategy.
    #[serde(default = "default_local_size")]
    pub local_size: u32,

    /// Kernel program file; the built-in kernel is used when absent.
    #[serde(default)]
    pub kernel_path: Option<PathBuf>,

    /// Which offload executor to use.
    #[serde(default)]
    pub device: DevicePreference,

    /// Output entries printed for spot checks.
    #[serde(default = "default_sample_indices")]
    pub sample_indices: Vec<usize>,
}

fn default_signal_path() -> PathBuf {
    PathBuf::from("signal.txt")
}
fn default_worker_counts() -> Vec<usize> {
    vec![1, 4]
}
fn default_strategies() -> Vec<Strategy> {
    Strategy::ALL.to_vec()
}
fn default_local_size() -> u32 {
    32
}
fn default_sample_indices() -> Vec<usize> {
    vec![0, 4, 35]
}

impl Default for AutocorrConfig {
    fn default() -> Self {
        Self {
            signal_path: default_signal_path(),
            worker_counts: default_worker_counts(),
            strategies: default_strategies(),
            simd_backend: VectorBackend::default(),
            local_size: default_local_size(),
            kernel_path: None,
            device: DevicePreference::default(),
            sample_indices: default_sample_indices(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Configuration version.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Surface-volume settings.
    #[serde(default)]
    pub surface: SurfaceConfig,

    /// Autocorrelation settings.
    #[serde(default)]
    pub autocorrelation: AutocorrConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            surface: SurfaceConfig::default(),
            autocorrelation: AutocorrConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .map_err(|_| Error::MissingResource { path: path.to_path_buf() })?;

        Self::parse(&content)
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error with line number if parsing fails.
    pub fn parse(yaml: &str) -> Result<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| {
            let line = e.location().map_or(0, |l| l.line());
            Error::ConfigParse { line, message: e.to_string() }
        })
    }

    /// Checks value ranges that the type system cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigInvalid`] naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        let s = &self.surface;
        if s.grid_size < 2 {
            return Err(Error::config_invalid(
                "surface.grid_size",
                format!("must be at least 2, got {}", s.grid_size),
            ));
        }
        if s.workers == 0 {
            return Err(Error::config_invalid("surface.workers", "must be at least 1"));
        }
        if s.trials == 0 {
            return Err(Error::config_invalid("surface.trials", "must be at least 1"));
        }
        if !(s.domain.x_min < s.domain.x_max && s.domain.y_min < s.domain.y_max) {
            return Err(Error::config_invalid("surface.domain", "min bounds must be below max bounds"));
        }

        let a = &self.autocorrelation;
        if a.worker_counts.is_empty() || a.worker_counts.contains(&0) {
            return Err(Error::config_invalid(
                "autocorrelation.worker_counts",
                "must list at least one non-zero pool size",
            ));
        }
        if a.local_size == 0 {
            return Err(Error::config_invalid("autocorrelation.local_size", "must be at least 1"));
        }
        Ok(())
    }
}

//! # kernel-bench
//!
//! Timing harness for two numeric kernels run under several execution
//! strategies.
//!
//! - **Surface volume**: integrates the separation between two bicubic
//!   Bezier patches with a weighted-tile quadrature, reduced over a rayon
//!   worker pool.
//! - **Autocorrelation**: computes every circular shift-sum of a signal
//!   serially, on a worker pool, with 4-lane SIMD (or the
//!   [trueno](https://crates.io/crates/trueno) dot product) and through an
//!   offload executor (host emulation or wgpu).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kernel_bench::prelude::*;
//!
//! let signal = Signal::new(&[1.0, 2.0, 3.0])?;
//! assert_eq!(serial::autocorrelate(&signal), vec![14.0, 11.0, 11.0]);
//!
//! let pool = worker_pool(4)?;
//! let volume = total_volume(&ControlPatch::default(), 100, &Domain::default(), &pool);
//! ```
//!
//! ## Feature Flags
//!
//! - `gpu`: wgpu offload executor for the autocorrelation kernel

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
// Allow unwrap() in tests only
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Kernels
// ============================================================================

/// Bezier surface-volume kernel.
pub mod surface;

/// Circular autocorrelation kernel and its execution strategies.
pub mod autocorr;

/// Signal input buffer.
pub mod signal;

// ============================================================================
// Harness
// ============================================================================

/// Timed benchmark drivers and reports.
pub mod harness;

/// Runtime configuration.
pub mod config;

/// Stderr logging backend.
pub mod logging;

// ============================================================================
// Error Types
// ============================================================================

/// Error types for kernel-bench operations.
pub mod error;

pub use error::{Error, Result};

// ============================================================================
// Prelude
// ============================================================================

/// Commonly used types and functions for convenient imports.
///
/// ```rust,ignore
/// use kernel_bench::prelude::*;
/// ```
pub mod prelude {
    pub use crate::autocorr::offload::{
        select_executor, DevicePreference, HostExecutor, KernelProgram, OffloadExecutor,
    };
    pub use crate::autocorr::simd::VectorBackend;
    pub use crate::autocorr::{max_relative_error, parallel, serial, simd, Strategy};
    pub use crate::config::{AutocorrConfig, Config, SurfaceConfig};
    pub use crate::error::{Error, Result};
    pub use crate::harness::{
        worker_pool, AutocorrBenchmark, AutocorrReport, SurfaceBenchmark, SurfaceReport,
    };
    pub use crate::signal::Signal;
    pub use crate::surface::{total_volume, total_volume_serial, ControlPatch, Domain};
}

// ============================================================================
// Re-exports
// ============================================================================

/// Re-export trueno for direct access to SIMD operations.
pub use trueno;

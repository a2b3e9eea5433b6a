//! Circular autocorrelation kernel.
//!
//! `sums[shift] = Σ_{i<S} x[i] · x[i + shift]` over the doubled signal, for
//! every shift in `[0, S)`. Each strategy is a pure function from a
//! [`Signal`](crate::signal::Signal) to a fresh sums vector; they differ only
//! in how the per-shift dot products are scheduled.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub mod offload;
pub mod parallel;
pub mod serial;
pub mod simd;

/// Execution strategy for the autocorrelation kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Single loop nest on the calling thread.
    Serial,
    /// Shifts distributed over a fixed-size worker pool.
    Parallel,
    /// Inner products on 4-lane SIMD registers.
    Simd,
    /// Kernel dispatched to an offload executor.
    Offload,
}

impl Strategy {
    /// All strategies in harness order.
    pub const ALL: [Self; 4] = [Self::Serial, Self::Parallel, Self::Simd, Self::Offload];

    /// Short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::Parallel => "parallel",
            Self::Simd => "simd",
            Self::Offload => "offload",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Largest relative deviation of `candidate` from `reference`.
///
/// Entries whose reference magnitude is below 1 are compared absolutely.
/// Returns `f32::INFINITY` when the lengths differ.
#[must_use]
pub fn max_relative_error(reference: &[f32], candidate: &[f32]) -> f32 {
    if reference.len() != candidate.len() {
        return f32::INFINITY;
    }
    reference
        .iter()
        .zip(candidate)
        .map(|(r, c)| (r - c).abs() / r.abs().max(1.0))
        .fold(0.0, f32::max)
}

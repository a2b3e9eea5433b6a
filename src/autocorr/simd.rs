//! Vectorized strategy.
//!
//! # Safety
//!
//! This module uses `unsafe` for SIMD intrinsics which are inherently safe when:
//! - Target CPU features are detected at runtime before use
//! - All memory accesses stay inside the checked common length
#![allow(unsafe_code)]

//! The inner reduction runs on 4-lane f32 registers:
//! - x86_64: SSE via `std::arch::x86_64`
//! - aarch64: NEON via `std::arch::aarch64`
//!
//! The scalar fallback keeps the same four running lanes, so every backend
//! sums in the same order and produces the same value.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use trueno::Vector;

use crate::signal::Signal;

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

#[cfg(target_arch = "aarch64")]
use std::arch::aarch64::*;

/// Number of f32 lanes per register.
pub const LANES: usize = 4;

/// Inner-product implementation used by the vectorized strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    /// Hand-written 4-lane multiply-sum.
    #[default]
    Intrinsics,
    /// trueno's dispatching dot product (SSE2/AVX2/AVX-512/NEON).
    Trueno,
}

impl VectorBackend {
    /// Lowercase name, as used in configuration files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Intrinsics => "intrinsics",
            Self::Trueno => "trueno",
        }
    }

    /// Dot product of the common prefix of `a` and `b`.
    #[must_use]
    #[inline]
    pub fn mul_sum(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Intrinsics => simd_mul_sum(a, b),
            Self::Trueno => trueno_mul_sum(a, b),
        }
    }
}

/// Computes every shift with a vectorized inner product.
#[must_use]
pub fn autocorrelate(signal: &Signal, backend: VectorBackend) -> Vec<f32> {
    let base = signal.samples();
    (0..signal.len())
        .map(|shift| backend.mul_sum(base, signal.shifted(shift)))
        .collect()
}

// ============================================================================
// Multiply-sum (Real SIMD)
// ============================================================================

/// Σ a[i]·b[i] over the common length, four lanes at a time.
#[must_use]
pub fn simd_mul_sum(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    let (a, b) = (&a[..len], &b[..len]);

    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("sse") {
            // SAFETY: We've checked for SSE support
            unsafe {
                return mul_sum_sse(a, b);
            }
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        // SAFETY: NEON is mandatory on aarch64
        unsafe {
            return mul_sum_neon(a, b);
        }
    }

    // Scalar fallback
    scalar_mul_sum_lanes(a, b)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse")]
unsafe fn mul_sum_sse(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len();
    let mut i = 0;
    let mut acc = _mm_setzero_ps();

    while i + LANES <= len {
        let va = _mm_loadu_ps(a.as_ptr().add(i));
        let vb = _mm_loadu_ps(b.as_ptr().add(i));
        acc = _mm_add_ps(acc, _mm_mul_ps(va, vb));
        i += LANES;
    }

    let mut lanes = [0.0f32; LANES];
    _mm_storeu_ps(lanes.as_mut_ptr(), acc);
    let mut sum = lanes[0] + lanes[1] + lanes[2] + lanes[3];

    // Handle remainder
    while i < len {
        sum += a[i] * b[i];
        i += 1;
    }

    sum
}

#[cfg(target_arch = "aarch64")]
unsafe fn mul_sum_neon(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len();
    let mut i = 0;
    let mut acc = vdupq_n_f32(0.0);

    while i + LANES <= len {
        let va = vld1q_f32(a.as_ptr().add(i));
        let vb = vld1q_f32(b.as_ptr().add(i));
        acc = vaddq_f32(acc, vmulq_f32(va, vb));
        i += LANES;
    }

    let mut lanes = [0.0f32; LANES];
    vst1q_f32(lanes.as_mut_ptr(), acc);
    let mut sum = lanes[0] + lanes[1] + lanes[2] + lanes[3];

    while i < len {
        sum += a[i] * b[i];
        i += 1;
    }

    sum
}

/// Scalar multiply-sum that mirrors the 4-lane register layout.
#[must_use]
pub fn scalar_mul_sum_lanes(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    let mut lanes = [0.0f32; LANES];

    let chunks = len / LANES;
    for chunk in 0..chunks {
        let base = chunk * LANES;
        for lane in 0..LANES {
            lanes[lane] += a[base + lane] * b[base + lane];
        }
    }

    let mut sum = lanes[0] + lanes[1] + lanes[2] + lanes[3];
    for i in (chunks * LANES)..len {
        sum += a[i] * b[i];
    }
    sum
}

/// Dot product through trueno's backend dispatch.
///
/// Falls back to [`simd_mul_sum`] if trueno rejects the operands.
#[must_use]
pub fn trueno_mul_sum(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    Vector::from_slice(&a[..len])
        .dot(&Vector::from_slice(&b[..len]))
        .unwrap_or_else(|_| simd_mul_sum(a, b))
}

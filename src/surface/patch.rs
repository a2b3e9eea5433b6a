//! Bicubic Bezier control patches and height-field evaluation.

use serde::{Deserialize, Serialize};

use super::Domain;

/// A 4×4 grid of scalar control points indexed `[u][v]`.
pub type PatchMatrix = [[f64; 4]; 4];

/// Top and bottom Bezier surfaces sharing one parametric domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPatch {
    /// Top-surface control heights.
    pub top: PatchMatrix,
    /// Bottom-surface control heights.
    pub bottom: PatchMatrix,
}

impl Default for ControlPatch {
    /// The classroom patch: `top[i][j]` is `TOPZij`, `bottom[i][j]` is `BOTZij`.
    fn default() -> Self {
        Self {
            top: [
                [0.0, 1.0, 0.0, 3.0],
                [1.0, 12.0, 1.0, 2.0],
                [0.0, 1.0, 0.0, 3.0],
                [0.0, 0.0, 4.0, 3.0],
            ],
            bottom: [
                [0.0, -2.0, 0.0, -3.0],
                [-3.0, 10.0, -5.0, 2.0],
                [0.0, -2.0, 0.0, -8.0],
                [0.0, 0.0, -6.0, -3.0],
            ],
        }
    }
}

impl ControlPatch {
    /// A patch whose surfaces are both flat at zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self { top: [[0.0; 4]; 4], bottom: [[0.0; 4]; 4] }
    }

    /// Separation `top − bottom` at parametric point `(u, v)`.
    ///
    /// Negative where the bottom surface sticks out above the top one.
    #[must_use]
    #[inline]
    pub fn height_at(&self, u: f64, v: f64) -> f64 {
        let bu = bernstein(u);
        let bv = bernstein(v);
        let mut top = 0.0;
        let mut bot = 0.0;
        for i in 0..4 {
            let mut top_row = 0.0;
            let mut bot_row = 0.0;
            for j in 0..4 {
                top_row += bv[j] * self.top[i][j];
                bot_row += bv[j] * self.bottom[i][j];
            }
            top += bu[i] * top_row;
            bot += bu[i] * bot_row;
        }
        top - bot
    }

    /// Separation at lattice node `(iu, iv)` of an `n`×`n` grid.
    #[must_use]
    #[inline]
    pub fn height(&self, iu: usize, iv: usize, n: usize) -> f64 {
        self.height_at(parameter(iu, n), parameter(iv, n))
    }

    /// Exact volume between the two surfaces over `domain`.
    ///
    /// Every cubic Bernstein polynomial integrates to 1/4 on [0,1], so the
    /// integral of the separation is the mean control-point difference.
    #[must_use]
    pub fn exact_volume(&self, domain: &Domain) -> f64 {
        let mut diff = 0.0;
        for i in 0..4 {
            for j in 0..4 {
                diff += self.top[i][j] - self.bottom[i][j];
            }
        }
        diff / 16.0 * domain.area()
    }
}

/// Cubic Bernstein basis `[(1-t)³, 3t(1-t)², 3t²(1-t), t³]`.
#[must_use]
#[inline]
pub fn bernstein(t: f64) -> [f64; 4] {
    let s = 1.0 - t;
    [s * s * s, 3.0 * t * s * s, 3.0 * t * t * s, t * t * t]
}

/// Normalized parameter `index / (n - 1)`; 0 for a single-node grid.
#[must_use]
#[inline]
pub fn parameter(index: usize, n: usize) -> f64 {
    if n < 2 {
        0.0
    } else {
        index as f64 / (n - 1) as f64
    }
}

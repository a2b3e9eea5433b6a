//! Weighted-tile volume quadrature over the height field.
//!
//! Interior nodes own a full tile, edge nodes half a tile and corner nodes a
//! quarter, which is the trapezoidal rule on a uniform grid.

use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};

use super::ControlPatch;

/// Rectangular extent of the patch in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    /// Left bound.
    pub x_min: f64,
    /// Right bound.
    pub x_max: f64,
    /// Lower bound.
    pub y_min: f64,
    /// Upper bound.
    pub y_max: f64,
}

impl Default for Domain {
    fn default() -> Self {
        Self { x_min: 0.0, x_max: 3.0, y_min: 0.0, y_max: 3.0 }
    }
}

impl Domain {
    /// Total area of the rectangle.
    #[must_use]
    pub fn area(&self) -> f64 {
        (self.x_max - self.x_min) * (self.y_max - self.y_min)
    }

    /// Area of one full tile on an `n`×`n` lattice.
    #[must_use]
    pub fn full_tile_area(&self, n: usize) -> f64 {
        let cells = n.saturating_sub(1).max(1) as f64;
        ((self.x_max - self.x_min) / cells) * ((self.y_max - self.y_min) / cells)
    }
}

/// Quadrature coefficient of a lattice node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileWeight {
    /// Interior node.
    Full,
    /// Node on an edge, not a corner.
    Half,
    /// Corner node.
    Quarter,
}

impl TileWeight {
    /// Classifies node `(iu, iv)` of an `n`×`n` lattice.
    #[must_use]
    #[inline]
    pub fn of(iu: usize, iv: usize, n: usize) -> Self {
        let last = n.saturating_sub(1);
        let u_edge = iu == 0 || iu == last;
        let v_edge = iv == 0 || iv == last;
        match (u_edge, v_edge) {
            (true, true) => Self::Quarter,
            (true, false) | (false, true) => Self::Half,
            (false, false) => Self::Full,
        }
    }

    /// Fraction of a full tile.
    #[must_use]
    #[inline]
    pub const fn factor(self) -> f64 {
        match self {
            Self::Full => 1.0,
            Self::Half => 0.5,
            Self::Quarter => 0.25,
        }
    }
}

/// Volume contributed by node `(iu, iv)`.
#[must_use]
#[inline]
pub fn cell_volume(patch: &ControlPatch, iu: usize, iv: usize, n: usize, tile_area: f64) -> f64 {
    patch.height(iu, iv, n) * tile_area * TileWeight::of(iu, iv, n).factor()
}

fn row_volume(patch: &ControlPatch, iv: usize, n: usize, tile_area: f64) -> f64 {
    (0..n).map(|iu| cell_volume(patch, iu, iv, n, tile_area)).sum()
}

/// Total volume computed on the calling thread.
#[must_use]
pub fn total_volume_serial(patch: &ControlPatch, n: usize, domain: &Domain) -> f64 {
    let tile_area = domain.full_tile_area(n);
    (0..n).map(|iv| row_volume(patch, iv, n, tile_area)).sum()
}

/// Total volume with rows distributed over `pool`.
///
/// Row partials are folded in row order after the join, so the result is
/// bit-identical to [`total_volume_serial`] for any pool size.
#[must_use]
pub fn total_volume(patch: &ControlPatch, n: usize, domain: &Domain, pool: &ThreadPool) -> f64 {
    let tile_area = domain.full_tile_area(n);
    let rows: Vec<f64> = pool.install(|| {
        (0..n).into_par_iter().map(|iv| row_volume(patch, iv, n, tile_area)).collect()
    });
    rows.iter().sum()
}

/// Σ weight × tile area over the lattice; equals the domain area.
#[must_use]
pub fn weighted_area(n: usize, domain: &Domain) -> f64 {
    let tile_area = domain.full_tile_area(n);
    let mut weights = 0.0;
    for iv in 0..n {
        for iu in 0..n {
            weights += TileWeight::of(iu, iv, n).factor();
        }
    }
    weights * tile_area
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rayon::ThreadPoolBuilder;

    fn pool(threads: usize) -> ThreadPool {
        ThreadPoolBuilder::new().num_threads(threads).build().unwrap()
    }

    #[test]
    fn test_tile_weight_classification() {
        let n = 5;
        assert_eq!(TileWeight::of(0, 0, n), TileWeight::Quarter);
        assert_eq!(TileWeight::of(4, 4, n), TileWeight::Quarter);
        assert_eq!(TileWeight::of(0, 4, n), TileWeight::Quarter);
        assert_eq!(TileWeight::of(2, 0, n), TileWeight::Half);
        assert_eq!(TileWeight::of(4, 2, n), TileWeight::Half);
        assert_eq!(TileWeight::of(2, 2, n), TileWeight::Full);
    }

    #[test]
    fn test_full_tile_area() {
        let domain = Domain::default();
        assert_relative_eq!(domain.full_tile_area(4), 1.0);
        assert_relative_eq!(domain.full_tile_area(2), 9.0);
    }

    #[test]
    fn test_minimal_grid_zero_patch_has_zero_volume() {
        let patch = ControlPatch::zero();
        let domain = Domain::default();
        assert_eq!(total_volume_serial(&patch, 2, &domain), 0.0);
        assert_eq!(total_volume(&patch, 2, &domain, &pool(2)), 0.0);
    }

    #[test]
    fn test_parallel_matches_serial_bitwise() {
        let patch = ControlPatch::default();
        let domain = Domain::default();
        let serial = total_volume_serial(&patch, 64, &domain);
        for threads in [1, 2, 4] {
            let parallel = total_volume(&patch, 64, &domain, &pool(threads));
            assert_eq!(serial.to_bits(), parallel.to_bits(), "threads = {threads}");
        }
    }

    #[test]
    fn test_volume_converges_to_closed_form() {
        let patch = ControlPatch::default();
        let domain = Domain::default();
        let exact = patch.exact_volume(&domain);
        let approx = total_volume_serial(&patch, 100, &domain);
        assert!(
            (approx - exact).abs() < 0.05,
            "quadrature {approx} too far from exact {exact}"
        );
    }

    #[test]
    fn test_constant_separation_volume_is_height_times_area() {
        let patch = ControlPatch { top: [[2.0; 4]; 4], bottom: [[0.5; 4]; 4] };
        let domain = Domain { x_min: -1.0, x_max: 1.0, y_min: 0.0, y_max: 4.0 };
        assert_relative_eq!(total_volume_serial(&patch, 17, &domain), 1.5 * 8.0, epsilon = 1e-9);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Invariant: weighted tile areas sum to (n-1)² full tiles, the domain area.
        #[test]
        fn prop_weighted_area_equals_domain_area(
            n in 2usize..200,
            width in 0.1f64..50.0,
            height in 0.1f64..50.0,
        ) {
            let domain = Domain { x_min: 0.0, x_max: width, y_min: 0.0, y_max: height };
            let cells = (n - 1) as f64;
            let expected = cells * cells * domain.full_tile_area(n);
            let area = weighted_area(n, &domain);
            prop_assert!((area - expected).abs() <= 1e-9 * expected.max(1.0));
            prop_assert!((area - domain.area()).abs() <= 1e-9 * domain.area().max(1.0));
        }
    }
}

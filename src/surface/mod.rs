//! Bezier surface-volume kernel.
//!
//! Evaluates the separation between two bicubic Bezier patches on an N×N
//! lattice and integrates it with half-weighted edges and quarter-weighted
//! corners. The lattice sum is a commutative reduction, computed here as
//! parallel row partials folded in a fixed order.

pub mod patch;
pub mod volume;

pub use patch::{bernstein, parameter, ControlPatch, PatchMatrix};
pub use volume::{
    cell_volume, total_volume, total_volume_serial, weighted_area, Domain, TileWeight,
};

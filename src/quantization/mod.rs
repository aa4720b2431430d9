//! Scalar lattice quantization: snap every component onto a uniform grid.
//!
//! # Scalar vs Vector Quantization
//!
//! **Grid quantization** (this module) maps each dimension independently:
//!
//! ```text
//! q(x) = round(x / step) · step
//! ```
//!
//! It needs no training, is idempotent, and its worst-case per-component error is
//! `step / 2`. Correlations between dimensions are ignored.
//!
//! **Vector quantization** (see [`crate::partitioning`] and [`crate::compression`])
//! learns centroids that capture multi-dimensional structure, then optionally snaps
//! those centroids onto the grid (the hybrid scheme).
//!
//! ```text
//! Original: [0.23, -0.71, 0.12]
//!    ↓ step = 0.25
//! Snapped:  [0.25, -0.75, 0.00]
//! ```

pub mod grid;

pub use grid::{snap_to_grid, snap_value, validate_step, GridQuantizer};

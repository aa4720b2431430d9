//! Metric suites comparing an original collection with its compressed counterpart.
//!
//! - [`fidelity`]: per-vector cosine/MSE aggregates, the Lattice Stability Index and
//!   semantic efficiency, plus the boundary/bulk MSE split.
//! - [`distortion`]: how pairwise geometry and neighborhoods deform.
//! - [`topology`]: kNN-graph indicators of a single collection's shape.
//!
//! All metrics are pure functions. Degenerate inputs (empty collections, fewer points
//! than neighbors requested, identical vectors) produce documented values rather than
//! errors; only validation failures (dimension mismatch, non-finite values, missing
//! keys) are errors.

pub mod distortion;
pub mod fidelity;
pub mod topology;

pub use distortion::{DistortionConfig, DistortionMetrics};
pub use fidelity::{BoundaryMseMetrics, FidelityMetrics};
pub use topology::{TopologyConfig, TopologyIndicators};

use crate::collection::EmbeddingCollection;
use crate::error::{Result, TesseraError};

/// Original and compressed vectors paired by key, in original order.
pub(crate) struct Paired<'a> {
    pub keys: Vec<&'a str>,
    pub original: Vec<&'a [f32]>,
    pub compressed: Vec<&'a [f32]>,
}

/// Pair the two collections by key after validating both.
pub(crate) fn pair<'a>(
    original: &'a EmbeddingCollection,
    compressed: &'a EmbeddingCollection,
) -> Result<Paired<'a>> {
    let dim = original.validate()?;
    compressed.validate()?;

    let mut paired = Paired {
        keys: Vec::with_capacity(original.len()),
        original: Vec::with_capacity(original.len()),
        compressed: Vec::with_capacity(original.len()),
    };
    for (key, o) in original.iter() {
        let c = compressed
            .get(key)
            .ok_or_else(|| TesseraError::MissingKey(key.to_string()))?;
        if c.len() != dim {
            return Err(TesseraError::DimensionMismatch {
                expected: dim,
                found: c.len(),
            });
        }
        paired.keys.push(key);
        paired.original.push(o);
        paired.compressed.push(c);
    }
    Ok(paired)
}

/// Population mean and variance. `(0, 0)` for an empty slice.
pub(crate) fn mean_and_variance(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance)
}

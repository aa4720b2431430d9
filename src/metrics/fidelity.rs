//! Basic fidelity metrics.
//!
//! # Lattice Stability Index
//!
//! ```text
//! LSI = mean_cos / (1 + energy)
//! ```
//!
//! where `mean_cos` is the mean cosine similarity between each original vector and its
//! compressed value and `energy` is the mean per-vector MSE. Since `mean_cos ∈ [-1, 1]`
//! and `energy ≥ 0`, LSI is at most 1, reached only by a lossless compression.
//!
//! # Semantic Efficiency
//!
//! ```text
//! SE = LSI / (energy + ε),   ε = 1e-9
//! ```
//!
//! Rewards high fidelity per unit of residual energy. Grows without bound as the
//! compression approaches identity.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::pair;
use crate::collection::EmbeddingCollection;
use crate::distance::{cosine_similarity, mse};
use crate::error::Result;

/// Guards the semantic-efficiency denominator.
pub const SEMANTIC_EPSILON: f64 = 1e-9;

/// `mean_cos / (1 + energy)`.
#[inline]
pub fn lattice_stability_index(mean_cosine: f64, energy: f64) -> f64 {
    mean_cosine / (1.0 + energy)
}

/// `lsi / (energy + ε)`.
#[inline]
pub fn semantic_efficiency(lsi: f64, energy: f64) -> f64 {
    lsi / (energy + SEMANTIC_EPSILON)
}

/// Aggregate fidelity of a compression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FidelityMetrics {
    pub mean_cosine: f64,
    /// Mean MSE between original and compressed vectors.
    pub energy: f64,
    pub lsi: f64,
    pub semantic_efficiency: f64,
}

impl FidelityMetrics {
    /// Single pass over the paired collections. All zeros for an empty collection.
    pub fn compute(original: &EmbeddingCollection, compressed: &EmbeddingCollection) -> Result<Self> {
        let p = pair(original, compressed)?;
        Ok(Self::from_pairs(&p.original, &p.compressed))
    }

    pub(crate) fn from_pairs(original: &[&[f32]], compressed: &[&[f32]]) -> Self {
        if original.is_empty() {
            return Self {
                mean_cosine: 0.0,
                energy: 0.0,
                lsi: 0.0,
                semantic_efficiency: 0.0,
            };
        }
        let n = original.len() as f64;
        let (cos_sum, mse_sum) = original.iter().zip(compressed).fold(
            (0.0f64, 0.0f64),
            |(cs, ms), (o, c)| (cs + cosine_similarity(o, c) as f64, ms + mse(o, c) as f64),
        );
        let mean_cosine = cos_sum / n;
        let energy = mse_sum / n;
        let lsi = lattice_stability_index(mean_cosine, energy);
        Self {
            mean_cosine,
            energy,
            lsi,
            semantic_efficiency: semantic_efficiency(lsi, energy),
        }
    }
}

/// Reconstruction error split between boundary and bulk vectors.
///
/// `delta_boundary > 0` means boundary vectors degrade more than the bulk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryMseMetrics {
    pub mse_global: f64,
    /// NaN when no vector is classified boundary.
    pub mse_boundary: f64,
    /// NaN when every vector is classified boundary.
    pub mse_bulk: f64,
    /// `mse_boundary − mse_bulk` (NaN if either side is empty).
    pub delta_boundary: f64,
    pub boundary_count: usize,
}

impl BoundaryMseMetrics {
    /// Split by an explicit set of boundary keys.
    pub fn compute(
        original: &EmbeddingCollection,
        compressed: &EmbeddingCollection,
        boundary_keys: &HashSet<&str>,
    ) -> Result<Self> {
        let p = pair(original, compressed)?;
        let mut global = Accumulator::default();
        let mut boundary = Accumulator::default();
        let mut bulk = Accumulator::default();
        for ((key, o), c) in p.keys.iter().zip(&p.original).zip(&p.compressed) {
            let e = mse(o, c) as f64;
            global.add(e);
            if boundary_keys.contains(key) {
                boundary.add(e);
            } else {
                bulk.add(e);
            }
        }
        let mse_boundary = boundary.mean();
        let mse_bulk = bulk.mean();
        Ok(Self {
            mse_global: if global.count == 0 { 0.0 } else { global.mean() },
            mse_boundary,
            mse_bulk,
            delta_boundary: mse_boundary - mse_bulk,
            boundary_count: boundary.count,
        })
    }
}

#[derive(Default)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn add(&mut self, x: f64) {
        self.sum += x;
        self.count += 1;
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.sum / self.count as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairwise() -> (EmbeddingCollection, EmbeddingCollection) {
        let original: EmbeddingCollection = vec![("a", vec![1.0, 0.0]), ("b", vec![0.0, 2.0])]
            .into_iter()
            .collect();
        let compressed: EmbeddingCollection = vec![("a", vec![1.0, 0.0]), ("b", vec![0.0, 1.0])]
            .into_iter()
            .collect();
        (original, compressed)
    }

    #[test]
    fn identity_has_unit_lsi() {
        let (o, _) = pairwise();
        let m = FidelityMetrics::compute(&o, &o).unwrap();
        assert!((m.mean_cosine - 1.0).abs() < 1e-9);
        assert_eq!(m.energy, 0.0);
        assert!((m.lsi - 1.0).abs() < 1e-9);
        assert!(m.semantic_efficiency > 1e8);
    }

    #[test]
    fn lsi_discounts_energy() {
        let (o, c) = pairwise();
        let m = FidelityMetrics::compute(&o, &c).unwrap();
        // cosines 1 and 1; MSE 0 and 0.5
        assert!((m.mean_cosine - 1.0).abs() < 1e-9);
        assert!((m.energy - 0.25).abs() < 1e-9);
        assert!((m.lsi - 0.8).abs() < 1e-9);
        assert!((m.semantic_efficiency - 0.8 / (0.25 + SEMANTIC_EPSILON)).abs() < 1e-6);
    }

    #[test]
    fn empty_collection_is_all_zero() {
        let e = EmbeddingCollection::new();
        let m = FidelityMetrics::compute(&e, &e).unwrap();
        assert_eq!(m.lsi, 0.0);
        assert_eq!(m.energy, 0.0);
    }

    #[test]
    fn boundary_split() {
        let (o, c) = pairwise();
        let keys: HashSet<&str> = ["b"].into_iter().collect();
        let m = BoundaryMseMetrics::compute(&o, &c, &keys).unwrap();
        assert!((m.mse_global - 0.25).abs() < 1e-9);
        assert!((m.mse_boundary - 0.5).abs() < 1e-9);
        assert_eq!(m.mse_bulk, 0.0);
        assert!((m.delta_boundary - 0.5).abs() < 1e-9);
        assert_eq!(m.boundary_count, 1);

        let none = BoundaryMseMetrics::compute(&o, &c, &HashSet::new()).unwrap();
        assert!(none.mse_boundary.is_nan());
        assert!(none.delta_boundary.is_nan());
    }
}

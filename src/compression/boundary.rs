//! Boundary-aware compression.
//!
//! # Intuition
//!
//! Vectors sitting between two centroids are the ones a coarse quantizer hurts most:
//! a small displacement flips them to the other cluster. Their *ambiguity*
//!
//! ```text
//! ξ(x) = d₂(x) − d₁(x)
//! ```
//!
//! (distance to the second-nearest minus the nearest snapped centroid) is close to
//! zero. The lowest `boundary_fraction` of vectors by ξ are treated as *boundary* and
//! kept on a finer grid (`step × fine_step_ratio`); the *bulk* is mapped onto the
//! hybrid centroids as usual.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::hybrid::fit_snapped_centroids;
use super::{CentroidSet, CompressionResult, CompressorConfig};
use crate::collection::EmbeddingCollection;
use crate::distance::l2_distance;
use crate::error::{Result, TesseraError};
use crate::partitioning::nearest_centroid;
use crate::quantization::GridQuantizer;

/// Boundary classification knobs.
///
/// Both defaults are hand-picked; treat them as configuration, not derived truths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoundaryConfig {
    /// Fraction of vectors (lowest ξ first) classified as boundary (default: 0.10).
    pub boundary_fraction: f32,
    /// Boundary grid step as a fraction of the nominal step (default: 0.5).
    pub fine_step_ratio: f32,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            boundary_fraction: 0.10,
            fine_step_ratio: 0.5,
        }
    }
}

impl BoundaryConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.boundary_fraction) {
            return Err(TesseraError::InvalidParameter(format!(
                "boundary fraction must be in [0, 1], got {}",
                self.boundary_fraction
            )));
        }
        if !self.fine_step_ratio.is_finite() || self.fine_step_ratio <= 0.0 {
            return Err(TesseraError::InvalidParameter(format!(
                "fine step ratio must be > 0, got {}",
                self.fine_step_ratio
            )));
        }
        Ok(())
    }
}

/// Which keys were treated as boundary, and on which grids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryPartition {
    /// Boundary keys in collection order.
    pub boundary_keys: Vec<String>,
    pub nominal_step: f32,
    pub fine_step: f32,
    /// Largest ξ among boundary vectors (`None` when there are none).
    pub ambiguity_cutoff: Option<f32>,
}

impl BoundaryPartition {
    pub fn key_set(&self) -> HashSet<&str> {
        self.boundary_keys.iter().map(String::as_str).collect()
    }

    pub fn boundary_len(&self) -> usize {
        self.boundary_keys.len()
    }
}

/// ξ = d₂ − d₁ per vector. With fewer than two centroids every score is `+∞`.
pub fn ambiguity_scores<V: AsRef<[f32]>>(vectors: &[V], centroids: &[Vec<f32>]) -> Vec<f32> {
    vectors
        .iter()
        .map(|v| {
            let mut d1 = f32::INFINITY;
            let mut d2 = f32::INFINITY;
            for c in centroids {
                let d = l2_distance(v.as_ref(), c);
                if d < d1 {
                    d2 = d1;
                    d1 = d;
                } else if d < d2 {
                    d2 = d;
                }
            }
            if d2.is_infinite() {
                f32::INFINITY
            } else {
                d2 - d1
            }
        })
        .collect()
}

/// Number of boundary vectors for `n` inputs: `ceil(n × fraction)`, at most `n`.
///
/// The small offset keeps `f32` representation error (`0.1f32 > 0.1`) from rounding
/// an exact product up.
pub fn boundary_count(n: usize, fraction: f32) -> usize {
    ((n as f64 * fraction as f64 - 1e-6).ceil().max(0.0) as usize).min(n)
}

/// Flag the lowest-ξ `boundary_count` vectors. Ties keep input order.
pub fn classify_boundary(scores: &[f32], fraction: f32) -> Vec<bool> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));
    let mut flags = vec![false; scores.len()];
    for &i in order.iter().take(boundary_count(scores.len(), fraction)) {
        flags[i] = true;
    }
    flags
}

pub(crate) fn compress_boundary_aware(
    collection: &EmbeddingCollection,
    grid: GridQuantizer,
    k: usize,
    config: &CompressorConfig,
) -> Result<CompressionResult> {
    config.boundary.validate()?;
    let fine = grid.scaled(config.boundary.fine_step_ratio)?;

    let snapped = fit_snapped_centroids(collection, grid, k, &config.kmeans)?;
    let scores = ambiguity_scores(collection.vectors(), &snapped);
    let flags = classify_boundary(&scores, config.boundary.boundary_fraction);

    let vectors: Vec<Vec<f32>> = collection
        .vectors()
        .iter()
        .zip(&flags)
        .map(|(v, &is_boundary)| {
            if is_boundary {
                fine.quantize(v)
            } else {
                snapped[nearest_centroid(v, &snapped).0].clone()
            }
        })
        .collect();

    let mut centroids = CentroidSet::new();
    for is_boundary_pass in [false, true] {
        for (v, _) in vectors.iter().zip(&flags).filter(|(_, b)| **b == is_boundary_pass) {
            centroids.insert(v);
        }
    }

    let boundary_keys: Vec<String> = collection
        .keys()
        .iter()
        .zip(&flags)
        .filter(|(_, b)| **b)
        .map(|(k, _)| k.clone())
        .collect();
    let ambiguity_cutoff = scores
        .iter()
        .zip(&flags)
        .filter(|(_, b)| **b)
        .map(|(&s, _)| s)
        .reduce(f32::max);

    debug!(
        step = grid.step(),
        fine_step = fine.step(),
        boundary = boundary_keys.len(),
        bulk = collection.len() - boundary_keys.len(),
        centroids = centroids.len(),
        "boundary-aware compression"
    );

    Ok(CompressionResult {
        compressed: collection.with_vectors(vectors),
        centroids: centroids.into_vec(),
        boundary: Some(BoundaryPartition {
            boundary_keys,
            nominal_step: grid.step(),
            fine_step: fine.step(),
            ambiguity_cutoff,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::{compress, CompressionOptions};

    #[test]
    fn ambiguity_is_gap_between_two_nearest() {
        let centroids = vec![vec![0.0], vec![4.0]];
        let s = ambiguity_scores(&[vec![1.0], vec![2.0]], &centroids);
        assert_eq!(s, vec![2.0, 0.0]);
        let single = ambiguity_scores(&[vec![1.0]], &centroids[..1]);
        assert!(single[0].is_infinite());
    }

    #[test]
    fn lowest_decile_is_boundary_with_stable_ties() {
        let scores = vec![5.0, 1.0, 1.0, 3.0, 9.0, 8.0, 7.0, 6.0, 4.0, 2.0, 1.0];
        // ceil(11 * 0.1) = 2: the first two 1.0s in input order.
        let flags = classify_boundary(&scores, 0.1);
        assert_eq!(
            flags.iter().enumerate().filter(|(_, f)| **f).map(|(i, _)| i).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn boundary_count_rounds_up_and_clamps() {
        assert_eq!(boundary_count(30, 0.1), 3);
        assert_eq!(boundary_count(3, 0.1), 1);
        assert_eq!(boundary_count(0, 0.1), 0);
        assert_eq!(boundary_count(4, 1.0), 4);
    }

    #[test]
    fn boundary_vectors_use_the_fine_grid() {
        let c: EmbeddingCollection = vec![
            ("a", vec![0.0, 0.0]),
            ("b", vec![0.1, 0.1]),
            ("mid", vec![1.9, 2.1]),
            ("c", vec![4.0, 4.0]),
            ("d", vec![3.9, 4.1]),
        ]
        .into_iter()
        .collect();
        let r = compress(&c, &CompressionOptions::BoundaryAware { step: 1.0, k: 2 }).unwrap();
        let partition = r.boundary.as_ref().unwrap();
        assert_eq!(partition.boundary_keys, vec!["mid".to_string()]);
        assert_eq!(partition.fine_step, 0.5);
        assert_eq!(r.compressed.get("mid"), Some(&[2.0, 2.0][..]));
        assert!(r.centroids.contains(&vec![2.0, 2.0]));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = BoundaryConfig {
            boundary_fraction: 1.5,
            ..BoundaryConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}

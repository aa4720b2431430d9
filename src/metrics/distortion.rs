//! Distortion metrics: how much a compression deforms pairwise geometry.
//!
//! Every function takes the original and compressed vectors as index-aligned slices
//! (position `i` in both is the same key). [`DistortionMetrics::compute`] does the key
//! pairing and validation; the free functions assume it has been done.

use serde::{Deserialize, Serialize};

use super::pair;
use crate::collection::EmbeddingCollection;
use crate::distance::{l2_distance, mean_vector, norm};
use crate::error::Result;
use crate::neighbors::{jaccard, k_nearest, knn_index_sets, mean_distance};

/// Triangle-inequality slack tolerated after compression.
const TRIANGLE_TOLERANCE: f64 = 1e-6;

/// Knobs for [`DistortionMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DistortionConfig {
    /// Neighbors per point for overlap and density (default: 5).
    pub k: usize,
    /// Relative displacement above which a vector counts as collapsed (default: 0.1).
    pub collapse_epsilon: f64,
    /// Leading points used for the triangle-violation proxy (default: 20).
    pub triangle_sample: usize,
}

impl Default for DistortionConfig {
    fn default() -> Self {
        Self {
            k: 5,
            collapse_epsilon: 0.1,
            triangle_sample: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistortionMetrics {
    pub pairwise_distortion: f64,
    pub neighborhood_overlap: f64,
    pub collapse_ratio: f64,
    pub cluster_drift: f64,
    pub density_change: f64,
    pub geodesic_distortion: f64,
}

impl DistortionMetrics {
    pub fn compute(
        original: &EmbeddingCollection,
        compressed: &EmbeddingCollection,
        config: &DistortionConfig,
    ) -> Result<Self> {
        let p = pair(original, compressed)?;
        let (o, c) = (&p.original, &p.compressed);
        Ok(Self {
            pairwise_distortion: pairwise_distortion(o, c),
            neighborhood_overlap: neighborhood_overlap(o, c, config.k),
            collapse_ratio: collapse_ratio(o, c, config.collapse_epsilon),
            cluster_drift: cluster_drift(o, c),
            density_change: density_change(o, c, config.k),
            geodesic_distortion: geodesic_distortion(o, c, config.triangle_sample),
        })
    }
}

/// Mean `|d_c − d_o| / d_o` over unordered pairs with `d_o > 0`. `0.0` if none.
pub fn pairwise_distortion<V: AsRef<[f32]>, W: AsRef<[f32]>>(original: &[V], compressed: &[W]) -> f64 {
    let n = original.len().min(compressed.len());
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for i in 0..n {
        for j in (i + 1)..n {
            let d_o = l2_distance(original[i].as_ref(), original[j].as_ref()) as f64;
            if d_o <= 0.0 {
                continue;
            }
            let d_c = l2_distance(compressed[i].as_ref(), compressed[j].as_ref()) as f64;
            sum += (d_c - d_o).abs() / d_o;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Mean Jaccard similarity of kNN sets. `1.0` when there are fewer than `k + 1` points.
pub fn neighborhood_overlap<V: AsRef<[f32]>, W: AsRef<[f32]>>(
    original: &[V],
    compressed: &[W],
    k: usize,
) -> f64 {
    let n = original.len();
    if n <= k {
        return 1.0;
    }
    let before = knn_index_sets(original, k);
    let after = knn_index_sets(compressed, k);
    before.iter().zip(&after).map(|(a, b)| jaccard(a, b)).sum::<f64>() / n as f64
}

/// Fraction of vectors whose relative displacement `‖c − o‖ / ‖o‖` exceeds `epsilon`.
///
/// Zero-norm originals use the absolute displacement.
pub fn collapse_ratio<V: AsRef<[f32]>, W: AsRef<[f32]>>(
    original: &[V],
    compressed: &[W],
    epsilon: f64,
) -> f64 {
    if original.is_empty() {
        return 0.0;
    }
    let collapsed = original
        .iter()
        .zip(compressed)
        .filter(|(o, c)| {
            let displacement = l2_distance(o.as_ref(), c.as_ref()) as f64;
            let magnitude = norm(o.as_ref()) as f64;
            let relative = if magnitude > 0.0 {
                displacement / magnitude
            } else {
                displacement
            };
            relative > epsilon
        })
        .count();
    collapsed as f64 / original.len() as f64
}

/// Shift of the collection mean, relative to the original mean's magnitude.
///
/// Falls back to the raw shift when the original mean is (nearly) the origin.
pub fn cluster_drift<V: AsRef<[f32]>, W: AsRef<[f32]>>(original: &[V], compressed: &[W]) -> f64 {
    let (Some(mo), Some(mc)) = (mean_vector(original), mean_vector(compressed)) else {
        return 0.0;
    };
    let shift = l2_distance(&mo, &mc) as f64;
    let magnitude = norm(&mo) as f64;
    if magnitude < 1e-9 {
        shift
    } else {
        shift / magnitude
    }
}

/// Mean relative change of local kNN density (mean neighbor distance).
///
/// Points whose original mean distance is zero are skipped. `0.0` when there are fewer
/// than `k + 1` points.
pub fn density_change<V: AsRef<[f32]>, W: AsRef<[f32]>>(original: &[V], compressed: &[W], k: usize) -> f64 {
    let n = original.len();
    if n <= k {
        return 0.0;
    }
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for i in 0..n {
        let m_o = mean_distance(&k_nearest(original, i, k));
        if m_o <= 0.0 {
            continue;
        }
        let m_c = mean_distance(&k_nearest(compressed, i, k));
        sum += (m_c - m_o).abs() / m_o;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Rate of triangles that satisfied the triangle inequality before compression and
/// break it afterwards, over all triples of the first `sample` points.
///
/// For a true metric this stays at zero; a nonzero rate flags numerical artifacts.
pub fn geodesic_distortion<V: AsRef<[f32]>, W: AsRef<[f32]>>(
    original: &[V],
    compressed: &[W],
    sample: usize,
) -> f64 {
    let n = original.len().min(compressed.len()).min(sample);
    if n < 3 {
        return 0.0;
    }
    let d = |pts: &[V], a: usize, b: usize| l2_distance(pts[a].as_ref(), pts[b].as_ref()) as f64;
    let dc = |a: usize, b: usize| l2_distance(compressed[a].as_ref(), compressed[b].as_ref()) as f64;

    let mut triples = 0usize;
    let mut violations = 0usize;
    for i in 0..n {
        for j in (i + 1)..n {
            for l in (j + 1)..n {
                triples += 1;
                let held = d(original, i, l) <= d(original, i, j) + d(original, j, l);
                let broken = dc(i, l) > dc(i, j) + dc(j, l) + TRIANGLE_TOLERANCE;
                if held && broken {
                    violations += 1;
                }
            }
        }
    }
    violations as f64 / triples as f64
}

//! Topology indicators of a single collection, read off its kNN graph.
//!
//! Run on the compressed collection, these show when quantization starts merging
//! neighborhoods (cycles vanish, components split, density concentrates on a few
//! lattice points).

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::mean_and_variance;
use crate::collection::EmbeddingCollection;
use crate::distance::l2_distance;
use crate::error::{Result, TesseraError};
use crate::graph::KnnGraph;
use crate::neighbors::{jaccard, k_nearest, knn_index_sets, mean_distance};

/// Floor for mean kNN distance before inverting it into a density.
const MIN_MEAN_DISTANCE: f64 = 1e-12;

/// Knobs for [`TopologyIndicators`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TopologyConfig {
    /// Graph degree (default: 5).
    pub k: usize,
    /// Histogram bin cap for cluster entropy (default: 10).
    pub max_bins: usize,
    /// Leading nodes used for geodesic stretch (default: 20).
    pub geodesic_sample: usize,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            k: 5,
            max_bins: 10,
            geodesic_sample: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyIndicators {
    pub cycle_count: usize,
    pub cluster_entropy: f64,
    pub boundary_sharpness: f64,
    pub density_variance: f64,
    pub geodesic_stretch: f64,
    pub component_count: usize,
    /// Present only when a perturbed counterpart was supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighbor_volatility: Option<f64>,
}

impl TopologyIndicators {
    pub fn compute(collection: &EmbeddingCollection, config: &TopologyConfig) -> Result<Self> {
        collection.validate()?;
        let points = collection.vectors();
        let graph = KnnGraph::build(points, config.k);
        let densities = local_densities(points, config.k);
        let (_, density_variance) = mean_and_variance(&densities);

        let indicators = Self {
            cycle_count: graph.approximate_cycle_count(),
            cluster_entropy: cluster_entropy(&densities, config.max_bins),
            boundary_sharpness: boundary_sharpness(points, config.k),
            density_variance,
            geodesic_stretch: geodesic_stretch(points, &graph, config.geodesic_sample),
            component_count: graph.component_count(),
            neighbor_volatility: None,
        };
        debug!(
            n = points.len(),
            k = config.k,
            cycles = indicators.cycle_count,
            components = indicators.component_count,
            "topology indicators"
        );
        Ok(indicators)
    }

    /// [`compute`](Self::compute) plus neighbor volatility against `perturbed`.
    pub fn compute_with_perturbation(
        collection: &EmbeddingCollection,
        perturbed: &EmbeddingCollection,
        config: &TopologyConfig,
    ) -> Result<Self> {
        let mut indicators = Self::compute(collection, config)?;
        indicators.neighbor_volatility = Some(neighbor_volatility(collection, perturbed, config.k)?);
        Ok(indicators)
    }
}

/// Local density `1 / mean distance to the k nearest neighbors`, per point.
pub fn local_densities<V: AsRef<[f32]>>(points: &[V], k: usize) -> Vec<f64> {
    (0..points.len())
        .map(|i| 1.0 / mean_distance(&k_nearest(points, i, k)).max(MIN_MEAN_DISTANCE))
        .collect()
}

/// Shannon entropy (nats) of the density histogram, `min(max_bins, ⌈√n⌉)` bins.
///
/// `0.0` for fewer than two points or when all densities agree within `1e-10`.
pub fn cluster_entropy(densities: &[f64], max_bins: usize) -> f64 {
    let n = densities.len();
    if n < 2 {
        return 0.0;
    }
    let min = densities.iter().copied().fold(f64::INFINITY, f64::min);
    let max = densities.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range < 1e-10 {
        return 0.0;
    }
    let bins = max_bins.min((n as f64).sqrt().ceil() as usize).max(1);
    let mut histogram = vec![0usize; bins];
    for &d in densities {
        let bin = (((d - min) / range) * bins as f64) as usize;
        histogram[bin.min(bins - 1)] += 1;
    }
    histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / n as f64;
            -p * p.ln()
        })
        .sum()
}

/// Mean relative jump from the k-th to the (k+1)-th neighbor distance.
///
/// Large values mean neighborhoods end abruptly, as at the edge of a tight cluster.
pub fn boundary_sharpness<V: AsRef<[f32]>>(points: &[V], k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for i in 0..points.len() {
        let ns = k_nearest(points, i, k.saturating_add(1));
        if ns.len() <= k {
            continue;
        }
        let d_k = ns[k - 1].distance as f64;
        if d_k <= 0.0 {
            continue;
        }
        sum += (ns[k].distance as f64 - d_k) / d_k;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Mean ratio of graph shortest path to straight-line distance over all pairs among the
/// first `sample` nodes. Unreachable and coincident pairs are skipped; `1.0` if none remain.
pub fn geodesic_stretch<V: AsRef<[f32]>>(points: &[V], graph: &KnnGraph, sample: usize) -> f64 {
    let n = points.len().min(graph.node_count()).min(sample);
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for i in 0..n {
        for j in (i + 1)..n {
            let euclidean = l2_distance(points[i].as_ref(), points[j].as_ref()) as f64;
            if euclidean <= 0.0 {
                continue;
            }
            if let Some(path) = graph.shortest_path(i, j) {
                sum += path as f64 / euclidean;
                count += 1;
            }
        }
    }
    if count == 0 {
        1.0
    } else {
        sum / count as f64
    }
}

/// Mean Jaccard distance between each key's kNN set in `base` and in `perturbed`.
///
/// Only keys present in both take part; neighborhoods are computed among those keys.
pub fn neighbor_volatility(
    base: &EmbeddingCollection,
    perturbed: &EmbeddingCollection,
    k: usize,
) -> Result<f64> {
    let dim = base.validate()?;
    let perturbed_dim = perturbed.validate()?;
    if !base.is_empty() && !perturbed.is_empty() && dim != perturbed_dim {
        return Err(TesseraError::DimensionMismatch {
            expected: dim,
            found: perturbed_dim,
        });
    }

    let (before, after): (Vec<&[f32]>, Vec<&[f32]>) = base
        .iter()
        .filter_map(|(key, v)| perturbed.get(key).map(|p| (v, p)))
        .unzip();
    if before.is_empty() {
        return Ok(0.0);
    }
    let a = knn_index_sets(&before, k);
    let b = knn_index_sets(&after, k);
    let total: f64 = a.iter().zip(&b).map(|(x, y)| 1.0 - jaccard(x, y)).sum();
    Ok(total / before.len() as f64)
}

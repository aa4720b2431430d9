//! Hybrid compressor: k-means centroids snapped onto the grid.
//!
//! 1. k-means gives the "ideal" centroids.
//! 2. They are deduplicated and snapped; snapping may merge distinct centroids, so the
//!    snapped set can be smaller than `k`.
//! 3. Every original vector is reassigned to its nearest *snapped* centroid. This
//!    ignores the k-means membership and may move vectors between clusters.

use tracing::debug;

use super::{clamp_k, CentroidSet, CompressionResult};
use crate::collection::EmbeddingCollection;
use crate::error::Result;
use crate::partitioning::{nearest_centroid, KMeans, KMeansConfig};
use crate::quantization::GridQuantizer;

/// Deduplicate, snap and deduplicate again.
pub fn snapped_centroids(centroids: &[Vec<f32>], grid: GridQuantizer) -> Vec<Vec<f32>> {
    let unique = CentroidSet::from_vectors(centroids);
    let mut snapped = CentroidSet::new();
    for c in unique.as_slice() {
        snapped.insert(&grid.quantize(c));
    }
    snapped.into_vec()
}

/// k-means centroids of `collection`, snapped onto the grid. Empty for an empty input.
pub(crate) fn fit_snapped_centroids(
    collection: &EmbeddingCollection,
    grid: GridQuantizer,
    k: usize,
    config: &KMeansConfig,
) -> Result<Vec<Vec<f32>>> {
    if collection.is_empty() {
        return Ok(Vec::new());
    }
    let k = clamp_k(k, collection.len());
    let dimension = collection.validate()?;
    let mut kmeans = KMeans::new(dimension, k)?.with_config(config.clone());
    kmeans.fit(collection.vectors())?;
    let snapped = snapped_centroids(kmeans.centroids(), grid);
    debug!(k, step = grid.step(), snapped = snapped.len(), "snapped k-means centroids");
    Ok(snapped)
}

/// k-means, then grid-snap the centroids, then reassign by nearest snapped centroid.
pub(crate) fn compress_kmeans_grid(
    collection: &EmbeddingCollection,
    grid: GridQuantizer,
    k: usize,
    config: &KMeansConfig,
) -> Result<CompressionResult> {
    let snapped = fit_snapped_centroids(collection, grid, k, config)?;
    let compressed = collection.map_vectors(|_, v| snapped[nearest_centroid(v, &snapped).0].clone());
    Ok(CompressionResult {
        compressed,
        centroids: snapped,
        boundary: None,
    })
}

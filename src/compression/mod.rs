//! Lossy compressors for embedding collections.
//!
//! Every compressor maps a collection onto a (usually much smaller) set of
//! representative vectors, the *centroids*, and returns a compressed collection with
//! exactly the same key set in which every value equals one of those centroids.
//!
//! | Method | Centroids | Knobs |
//! |--------|-----------|-------|
//! | [`CompressionOptions::Grid`] | distinct grid points hit | `step` |
//! | [`CompressionOptions::KMeans`] | k-means means | `k` |
//! | [`CompressionOptions::KMeansGrid`] | k-means means snapped to the grid | `step`, `k` |
//! | [`CompressionOptions::BoundaryAware`] | hybrid set, plus a finer grid near decision boundaries | `step`, `k` |
//!
//! `k` is clamped silently: `0 → 1`, `k > N → N` (the identity mapping).

pub mod boundary;
pub mod hybrid;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collection::EmbeddingCollection;
use crate::error::Result;
use crate::partitioning::{KMeans, KMeansConfig};
use crate::quantization::{validate_step, GridQuantizer};

pub use boundary::{
    ambiguity_scores, boundary_count, classify_boundary, BoundaryConfig, BoundaryPartition,
};
pub use hybrid::snapped_centroids;

/// Which compressor to run, with its typed parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum CompressionOptions {
    /// Snap every component onto a uniform grid.
    #[serde(rename = "grid")]
    Grid { step: f32 },
    /// Replace each vector by its k-means centroid.
    #[serde(rename = "kmeans")]
    KMeans { k: usize },
    /// k-means, then snap the centroids onto the grid and reassign.
    #[serde(rename = "kmeans-grid")]
    KMeansGrid { step: f32, k: usize },
    /// Hybrid, with a finer grid for vectors near a decision boundary.
    #[serde(rename = "boundary-aware")]
    BoundaryAware { step: f32, k: usize },
}

impl CompressionOptions {
    pub fn step(&self) -> Option<f32> {
        match *self {
            Self::Grid { step } | Self::KMeansGrid { step, .. } | Self::BoundaryAware { step, .. } => {
                Some(step)
            }
            Self::KMeans { .. } => None,
        }
    }

    pub fn k(&self) -> Option<usize> {
        match *self {
            Self::KMeans { k } | Self::KMeansGrid { k, .. } | Self::BoundaryAware { k, .. } => Some(k),
            Self::Grid { .. } => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Grid { .. } => "grid",
            Self::KMeans { .. } => "kmeans",
            Self::KMeansGrid { .. } => "kmeans-grid",
            Self::BoundaryAware { .. } => "boundary-aware",
        }
    }
}

/// Output of a compressor.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionResult {
    /// Same keys, same order as the input.
    pub compressed: EmbeddingCollection,
    /// Distinct representative vectors, first-seen order.
    pub centroids: Vec<Vec<f32>>,
    /// Boundary/bulk split, for the boundary-aware compressor only.
    pub boundary: Option<BoundaryPartition>,
}

impl CompressionResult {
    pub fn centroid_count(&self) -> usize {
        self.centroids.len()
    }

    /// Distinct representatives per input vector, in `(0, 1]` (0 for an empty input).
    pub fn compression_ratio(&self) -> f64 {
        if self.compressed.is_empty() {
            return 0.0;
        }
        self.centroids.len() as f64 / self.compressed.len() as f64
    }
}

/// Knobs shared by all compressors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorConfig {
    pub kmeans: KMeansConfig,
    pub boundary: BoundaryConfig,
}

/// Compress with default configuration.
pub fn compress(
    collection: &EmbeddingCollection,
    options: &CompressionOptions,
) -> Result<CompressionResult> {
    compress_with(collection, options, &CompressorConfig::default())
}

/// Compress with explicit configuration.
///
/// Validates the step (if any) and the collection (consistent dimension, finite values)
/// before doing any work.
pub fn compress_with(
    collection: &EmbeddingCollection,
    options: &CompressionOptions,
    config: &CompressorConfig,
) -> Result<CompressionResult> {
    if let Some(step) = options.step() {
        validate_step(step)?;
    }
    collection.validate()?;

    match *options {
        CompressionOptions::Grid { step } => Ok(compress_grid(collection, GridQuantizer::new(step)?)),
        CompressionOptions::KMeans { k } => compress_kmeans(collection, k, &config.kmeans),
        CompressionOptions::KMeansGrid { step, k } => {
            hybrid::compress_kmeans_grid(collection, GridQuantizer::new(step)?, k, &config.kmeans)
        }
        CompressionOptions::BoundaryAware { step, k } => {
            boundary::compress_boundary_aware(collection, GridQuantizer::new(step)?, k, config)
        }
    }
}

/// Grid quantization of every vector.
pub(crate) fn compress_grid(collection: &EmbeddingCollection, grid: GridQuantizer) -> CompressionResult {
    let compressed = collection.map_vectors(|_, v| grid.quantize(v));
    let centroids = CentroidSet::from_vectors(compressed.vectors()).into_vec();
    debug!(step = grid.step(), n = collection.len(), centroids = centroids.len(), "grid compression");
    CompressionResult {
        compressed,
        centroids,
        boundary: None,
    }
}

pub(crate) fn compress_kmeans(
    collection: &EmbeddingCollection,
    k: usize,
    config: &KMeansConfig,
) -> Result<CompressionResult> {
    if collection.is_empty() {
        return Ok(CompressionResult {
            compressed: collection.clone(),
            centroids: Vec::new(),
            boundary: None,
        });
    }
    let k = clamp_k(k, collection.len());
    let dimension = collection.validate()?;

    let mut kmeans = KMeans::new(dimension, k)?.with_config(config.clone());
    kmeans.fit(collection.vectors())?;
    let assignments = kmeans.assign_clusters(collection.vectors());
    let centroids = kmeans.into_centroids();

    let compressed = collection.with_vectors(
        assignments
            .iter()
            .map(|&cluster| centroids[cluster].clone())
            .collect(),
    );
    let used = CentroidSet::from_vectors(compressed.vectors()).into_vec();
    debug!(k, n = collection.len(), centroids = used.len(), "k-means compression");
    Ok(CompressionResult {
        compressed,
        centroids: used,
        boundary: None,
    })
}

/// Clamp a requested cluster count into `1..=n` (`1` when `n == 0`).
pub fn clamp_k(k: usize, n: usize) -> usize {
    let clamped = k.max(1).min(n.max(1));
    if clamped != k {
        debug!(requested = k, clamped, n, "cluster count clamped");
    }
    clamped
}

/// Distinct vectors under exact component equality, in first-seen order.
///
/// Equality is on bit patterns with `-0.0` folded into `0.0`.
#[derive(Debug, Clone, Default)]
pub struct CentroidSet {
    seen: HashSet<Vec<u32>>,
    centroids: Vec<Vec<f32>>,
}

impl CentroidSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vectors<V: AsRef<[f32]>>(vectors: &[V]) -> Self {
        let mut set = Self::new();
        for v in vectors {
            set.insert(v.as_ref());
        }
        set
    }

    /// Insert a vector; `true` if it was not present yet.
    pub fn insert(&mut self, v: &[f32]) -> bool {
        if self.seen.insert(bit_key(v)) {
            self.centroids.push(v.to_vec());
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    pub fn as_slice(&self) -> &[Vec<f32>] {
        &self.centroids
    }

    pub fn into_vec(self) -> Vec<Vec<f32>> {
        self.centroids
    }
}

fn bit_key(v: &[f32]) -> Vec<u32> {
    v.iter().map(|&x| (x + 0.0).to_bits()).collect()
}

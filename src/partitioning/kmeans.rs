//! Lightweight k-means clustering.
//!
//! Lloyd iterations with deterministic seeding, used by the k-means and hybrid
//! compressors. Two choices are fixed on purpose and exposed as configuration rather
//! than hidden literals, because reproducibility tests depend on them:
//!
//! - **Seeding**: the first `k` vectors in collection order (no randomness).
//! - **Iterations**: exactly [`DEFAULT_ITERATIONS`] rounds, no convergence check.

use serde::{Deserialize, Serialize};

use crate::distance::l2_distance;
use crate::error::{Result, TesseraError};

/// Number of Lloyd rounds.
pub const DEFAULT_ITERATIONS: usize = 10;

/// How initial centroids are chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Seeding {
    /// The first `k` vectors in collection order.
    #[default]
    FirstK,
}

/// k-means configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansConfig {
    /// Lloyd rounds (default: 10).
    pub iterations: usize,
    /// Seeding strategy (default: first k).
    pub seeding: Seeding,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            seeding: Seeding::FirstK,
        }
    }
}

/// k-means clustering over dense vectors.
pub struct KMeans {
    centroids: Vec<Vec<f32>>,
    dimension: usize,
    k: usize,
    config: KMeansConfig,
}

impl KMeans {
    /// Create new k-means with k clusters.
    pub fn new(dimension: usize, k: usize) -> Result<Self> {
        if dimension == 0 || k == 0 {
            return Err(TesseraError::InvalidParameter(
                "dimension and k must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            centroids: Vec::new(),
            dimension,
            k,
            config: KMeansConfig::default(),
        })
    }

    #[must_use]
    pub fn with_config(mut self, config: KMeansConfig) -> Self {
        self.config = config;
        self
    }

    /// Train on `vectors`.
    ///
    /// With `vectors.len() <= k` every vector becomes its own centroid.
    pub fn fit<V: AsRef<[f32]>>(&mut self, vectors: &[V]) -> Result<()> {
        if let Some(v) = vectors.iter().find(|v| v.as_ref().len() != self.dimension) {
            return Err(TesseraError::DimensionMismatch {
                expected: self.dimension,
                found: v.as_ref().len(),
            });
        }

        if vectors.len() <= self.k {
            self.centroids = vectors.iter().map(|v| v.as_ref().to_vec()).collect();
            return Ok(());
        }

        self.centroids = self.seed(vectors);

        for _iteration in 0..self.config.iterations {
            let assignments = self.assign_clusters(vectors);
            self.centroids = self.update_centroids(vectors, &assignments);
        }

        Ok(())
    }

    fn seed<V: AsRef<[f32]>>(&self, vectors: &[V]) -> Vec<Vec<f32>> {
        match self.config.seeding {
            Seeding::FirstK => vectors
                .iter()
                .take(self.k)
                .map(|v| v.as_ref().to_vec())
                .collect(),
        }
    }

    /// Assign vectors to nearest clusters.
    pub fn assign_clusters<V: AsRef<[f32]>>(&self, vectors: &[V]) -> Vec<usize> {
        vectors
            .iter()
            .map(|v| nearest_centroid(v.as_ref(), &self.centroids).0)
            .collect()
    }

    /// Update centroids based on assignments.
    fn update_centroids<V: AsRef<[f32]>>(&self, vectors: &[V], assignments: &[usize]) -> Vec<Vec<f32>> {
        let k = self.centroids.len();
        let mut cluster_sums = vec![vec![0.0f64; self.dimension]; k];
        let mut cluster_counts = vec![0usize; k];

        for (vec, &cluster) in vectors.iter().zip(assignments) {
            cluster_counts[cluster] += 1;
            for (s, &val) in cluster_sums[cluster].iter_mut().zip(vec.as_ref()) {
                *s += val as f64;
            }
        }

        cluster_sums
            .iter()
            .zip(&cluster_counts)
            .zip(&self.centroids)
            .map(|((sums, &count), old)| {
                if count > 0 {
                    sums.iter().map(|&s| (s / count as f64) as f32).collect()
                } else {
                    // Empty cluster: keep old centroid
                    old.clone()
                }
            })
            .collect()
    }

    pub fn centroids(&self) -> &[Vec<f32>] {
        &self.centroids
    }

    pub fn into_centroids(self) -> Vec<Vec<f32>> {
        self.centroids
    }
}

/// Index and distance of the nearest centroid. Ties keep the first minimum.
///
/// Returns `(0, f32::INFINITY)` when there are no centroids.
pub fn nearest_centroid(v: &[f32], centroids: &[Vec<f32>]) -> (usize, f32) {
    let mut best_cluster = 0;
    let mut best_dist = f32::INFINITY;
    for (idx, centroid) in centroids.iter().enumerate() {
        let dist = l2_distance(v, centroid);
        if dist < best_dist {
            best_dist = dist;
            best_cluster = idx;
        }
    }
    (best_cluster, best_dist)
}

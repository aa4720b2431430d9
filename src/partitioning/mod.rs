//! Partitioning: k-means clustering used by the clustering compressors.

pub mod kmeans;

pub use kmeans::{nearest_centroid, KMeans, KMeansConfig, Seeding, DEFAULT_ITERATIONS};

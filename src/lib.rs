//! tessera: lattice compression of embedding collections, and how it breaks.
//!
//! Lossy compressors (grid quantization, k-means, a hybrid of the two, and a
//! boundary-aware variant) map a collection onto a small set of representative
//! vectors. Metric suites measure what survives; stability analysis finds where in the
//! (step × k) parameter plane fidelity holds, degrades or collapses.
//!
//! - [`collection`]: ordered, key-unique [`EmbeddingCollection`] with validation.
//! - [`distance`], [`projection`], [`neighbors`], [`graph`]: vector and kNN primitives.
//! - [`quantization`], [`partitioning`], [`compression`]: the compressors.
//! - [`metrics`]: fidelity (LSI, semantic efficiency, boundary/bulk MSE), distortion,
//!   topology.
//! - [`stability`]: ridge line, zones, collapse threshold, phase transitions,
//!   confidence, run-to-run Δ_boundary stability.
//! - [`experiment`]: (step × k) sweeps with a serializable result.
//! - [`datasets`]: seeded synthetic collections.
//!
//! # Lattice Stability Index
//!
//! The headline metric is
//!
//! ```text
//! LSI = mean_cos / (1 + energy)
//! ```
//!
//! with `mean_cos` the mean cosine between original and compressed vectors and
//! `energy` their mean squared error. It is 1 for a lossless compression and drops as
//! the lattice coarsens. Zones use LSI ≥ 0.5 (stable) and LSI < 0.2 (collapse).
//!
//! # Determinism
//!
//! Everything except [`datasets`] is a pure function of its inputs: k-means seeds
//! from the first k vectors, and every "nearest" search keeps the first minimum.
//! Nearest-neighbor queries are exact brute force.
//!
//! # Example
//!
//! ```
//! use tessera::{compress, CompressionOptions, EmbeddingCollection, FidelityMetrics};
//!
//! let collection: EmbeddingCollection = vec![
//!     ("a", vec![0.12, 0.91]),
//!     ("b", vec![0.10, 0.88]),
//!     ("c", vec![0.95, 0.07]),
//! ]
//! .into_iter()
//! .collect();
//!
//! let result = compress(&collection, &CompressionOptions::KMeansGrid { step: 0.1, k: 2 }).unwrap();
//! assert_eq!(result.compressed.len(), 3);
//!
//! let fidelity = FidelityMetrics::compute(&collection, &result.compressed).unwrap();
//! assert!(fidelity.lsi > 0.9);
//! ```

pub mod collection;
pub mod compression;
pub mod datasets;
pub mod distance;
pub mod error;
pub mod experiment;
pub mod graph;
pub mod metrics;
pub mod neighbors;
pub mod partitioning;
pub mod projection;
pub mod quantization;
pub mod stability;

pub use collection::EmbeddingCollection;
pub use compression::{compress, compress_with, CompressionOptions, CompressionResult, CompressorConfig};
pub use error::{Result, TesseraError};
pub use experiment::{run_experiment, CompressionStrategy, ExperimentConfig, ExperimentResult, MetricKind};
pub use metrics::{BoundaryMseMetrics, DistortionMetrics, FidelityMetrics, TopologyIndicators};
pub use stability::{DeltaBoundaryStability, StabilityBoundary, SurfaceMetricPoint};

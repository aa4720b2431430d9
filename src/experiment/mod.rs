//! Parameter sweeps over (step × k).
//!
//! An [`ExperimentConfig`] names a compression strategy, the step and k ranges to
//! sweep, and which metric suites to compute. [`run_experiment`] compresses the
//! collection once per grid point, measures it, optionally analyzes the resulting
//! surface, and returns a serializable [`ExperimentResult`].
//!
//! ```no_run
//! use tessera::datasets::gaussian_clusters;
//! use tessera::experiment::{run_experiment, CompressionStrategy, ExperimentConfig, MetricKind};
//!
//! let collection = gaussian_clusters(60, 3, 16, 0.5, 7).unwrap();
//! let config = ExperimentConfig::new(CompressionStrategy::BoundaryAware)
//!     .with_step_range(0.05, 0.5, 6)
//!     .with_k_range(2.0, 12.0, 4)
//!     .with_metrics([MetricKind::Distortion, MetricKind::Boundary])
//!     .with_stability_analysis(true);
//! let result = run_experiment(&collection, &config).unwrap();
//! println!("{}", serde_json::to_string_pretty(&result).unwrap());
//! ```

mod result;
mod runner;

pub use result::{
    delta_boundary_stability, metric_names, ExperimentMetadata, ExperimentPoint, ExperimentResult,
    ExperimentSummary,
};
pub use runner::run_experiment;

use serde::{Deserialize, Serialize};

use crate::compression::{CompressionOptions, CompressorConfig};
use crate::error::{Result, TesseraError};
use crate::metrics::{DistortionConfig, TopologyConfig};
use crate::stability::{ConfidenceConfig, PhaseConfig, ZoneThresholds};

/// Compressor family swept by an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompressionStrategy {
    #[serde(rename = "grid")]
    Grid,
    #[serde(rename = "kmeans")]
    KMeans,
    #[serde(rename = "kmeans-grid")]
    KMeansGrid,
    #[serde(rename = "boundary-aware")]
    BoundaryAware,
}

impl CompressionStrategy {
    pub fn uses_step(self) -> bool {
        !matches!(self, Self::KMeans)
    }

    pub fn uses_k(self) -> bool {
        !matches!(self, Self::Grid)
    }

    /// Options for one grid point; parameters the strategy does not use are ignored.
    pub fn options(self, step: f64, k: usize) -> CompressionOptions {
        let step = step as f32;
        match self {
            Self::Grid => CompressionOptions::Grid { step },
            Self::KMeans => CompressionOptions::KMeans { k },
            Self::KMeansGrid => CompressionOptions::KMeansGrid { step, k },
            Self::BoundaryAware => CompressionOptions::BoundaryAware { step, k },
        }
    }

    pub fn name(self) -> &'static str {
        self.options(1.0, 1).name()
    }
}

/// Linearly interpolated sweep axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub min: f64,
    pub max: f64,
    pub steps: usize,
}

impl ParameterRange {
    pub fn new(min: f64, max: f64, steps: usize) -> Self {
        Self { min, max, steps }
    }

    /// `min + i·(max − min)/(steps − 1)`; a single step yields `[min]`.
    pub fn values(&self) -> Vec<f64> {
        match self.steps {
            0 => Vec::new(),
            1 => vec![self.min],
            n => {
                let span = (self.max - self.min) / (n - 1) as f64;
                (0..n).map(|i| self.min + i as f64 * span).collect()
            }
        }
    }

    /// [`values`](Self::values) rounded to integers, deduplicated, ascending.
    pub fn k_values(&self) -> Vec<usize> {
        let mut ks: Vec<usize> = self.values().iter().map(|v| v.round().max(0.0) as usize).collect();
        ks.sort_unstable();
        ks.dedup();
        ks
    }

    fn validate(&self, axis: &str, positive: bool) -> Result<()> {
        if self.steps == 0 {
            return Err(TesseraError::InvalidParameter(format!("{axis} range needs at least one step")));
        }
        if !self.min.is_finite() || !self.max.is_finite() || self.max < self.min {
            return Err(TesseraError::InvalidParameter(format!(
                "{axis} range [{}, {}] is not a finite ascending interval",
                self.min, self.max
            )));
        }
        if positive && self.min <= 0.0 {
            return Err(TesseraError::InvalidParameter(format!(
                "{axis} range must be positive, got min {}",
                self.min
            )));
        }
        if !positive && self.min < 0.0 {
            return Err(TesseraError::InvalidParameter(format!(
                "{axis} range must be non-negative, got min {}",
                self.min
            )));
        }
        Ok(())
    }
}

/// Optional metric suites. Fidelity is always computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Fidelity,
    Distortion,
    Topology,
    Boundary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExperimentConfig {
    pub strategy: CompressionStrategy,
    pub step_range: ParameterRange,
    pub k_range: ParameterRange,
    pub metrics: Vec<MetricKind>,
    pub analyze_stability: bool,
    pub compressor: CompressorConfig,
    pub distortion: DistortionConfig,
    pub topology: TopologyConfig,
    pub zones: ZoneThresholds,
    pub phase: PhaseConfig,
    pub confidence: ConfidenceConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            strategy: CompressionStrategy::KMeansGrid,
            step_range: ParameterRange::new(0.05, 0.5, 10),
            k_range: ParameterRange::new(2.0, 20.0, 5),
            metrics: vec![MetricKind::Fidelity],
            analyze_stability: false,
            compressor: CompressorConfig::default(),
            distortion: DistortionConfig::default(),
            topology: TopologyConfig::default(),
            zones: ZoneThresholds::default(),
            phase: PhaseConfig::default(),
            confidence: ConfidenceConfig::default(),
        }
    }
}

impl ExperimentConfig {
    pub fn new(strategy: CompressionStrategy) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }

    pub fn with_step_range(mut self, min: f64, max: f64, steps: usize) -> Self {
        self.step_range = ParameterRange::new(min, max, steps);
        self
    }

    pub fn with_k_range(mut self, min: f64, max: f64, steps: usize) -> Self {
        self.k_range = ParameterRange::new(min, max, steps);
        self
    }

    /// Request metric suites in addition to fidelity.
    pub fn with_metrics(mut self, metrics: impl IntoIterator<Item = MetricKind>) -> Self {
        for m in metrics {
            if !self.metrics.contains(&m) {
                self.metrics.push(m);
            }
        }
        self
    }

    pub fn with_stability_analysis(mut self, analyze: bool) -> Self {
        self.analyze_stability = analyze;
        self
    }

    pub fn with_compressor_config(mut self, compressor: CompressorConfig) -> Self {
        self.compressor = compressor;
        self
    }

    pub fn wants(&self, kind: MetricKind) -> bool {
        kind == MetricKind::Fidelity || self.metrics.contains(&kind)
    }

    /// Check the ranges the strategy actually sweeps.
    pub fn validate(&self) -> Result<()> {
        if self.strategy.uses_step() {
            self.step_range.validate("step", true)?;
        }
        if self.strategy.uses_k() {
            self.k_range.validate("k", false)?;
        }
        self.compressor.boundary.validate()
    }
}

//! Serializable experiment output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{CompressionStrategy, MetricKind, ParameterRange};
use crate::stability::{DeltaBoundaryStability, PhaseTransition, StabilityBoundary, StabilityConfidence};

/// Keys of [`ExperimentPoint::metrics`].
pub mod metric_names {
    pub const LSI: &str = "lsi";
    pub const COSINE: &str = "cosine";
    pub const ENERGY: &str = "energy";
    pub const SEMANTIC_EFFICIENCY: &str = "semanticEfficiency";
    pub const CENTROID_COUNT: &str = "centroidCount";
    pub const COMPRESSION_RATIO: &str = "compressionRatio";

    pub const PAIRWISE_DISTORTION: &str = "pairwiseDistortion";
    pub const NEIGHBORHOOD_OVERLAP: &str = "neighborhoodOverlap";
    pub const COLLAPSE_RATIO: &str = "collapseRatio";
    pub const CLUSTER_DRIFT: &str = "clusterDrift";
    pub const DENSITY_CHANGE: &str = "densityChange";
    pub const GEODESIC_DISTORTION: &str = "geodesicDistortion";

    pub const CYCLE_COUNT: &str = "cycleCount";
    pub const CLUSTER_ENTROPY: &str = "clusterEntropy";
    pub const BOUNDARY_SHARPNESS: &str = "boundarySharpness";
    pub const DENSITY_VARIANCE: &str = "densityVariance";
    pub const GEODESIC_STRETCH: &str = "geodesicStretch";
    pub const COMPONENT_COUNT: &str = "componentCount";

    pub const MSE_GLOBAL: &str = "mse_global";
    pub const MSE_BOUNDARY: &str = "mse_boundary";
    pub const MSE_BULK: &str = "mse_bulk";
    pub const DELTA_BOUNDARY: &str = "delta_boundary";
    pub const BOUNDARY_COUNT: &str = "boundaryCount";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentMetadata {
    pub strategy: CompressionStrategy,
    pub sample_size: usize,
    pub dimension: usize,
    /// `None` when the strategy has no step.
    pub step_range: Option<ParameterRange>,
    /// `None` when the strategy has no cluster count.
    pub k_range: Option<ParameterRange>,
    pub metrics: Vec<MetricKind>,
}

/// One measured configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentPoint {
    pub step: Option<f64>,
    pub k: Option<usize>,
    /// Metric name → value. Undefined values (NaN) serialize as `null`.
    #[serde(with = "nan_as_null")]
    pub metrics: BTreeMap<String, f64>,
}

impl ExperimentPoint {
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    pub fn lsi(&self) -> f64 {
        self.metric(metric_names::LSI).unwrap_or(f64::NAN)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentSummary {
    pub total_points: usize,
    /// Highest-LSI point (first on ties).
    pub best_point: Option<ExperimentPoint>,
    /// Mean LSI over stable-zone points, `0` when there are none.
    pub stability_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentResult {
    pub metadata: ExperimentMetadata,
    pub points: Vec<ExperimentPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary: Option<StabilityBoundary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_transitions: Option<Vec<PhaseTransition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidences: Option<Vec<StabilityConfidence>>,
    pub summary: ExperimentSummary,
}

impl ExperimentResult {
    /// `(step, Δ_boundary)` for every point that has both.
    pub fn delta_boundary_series(&self) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .filter_map(|p| Some((p.step?, p.metric(metric_names::DELTA_BOUNDARY)?)))
            .collect()
    }
}

/// Δ_boundary stability across repeated experiments.
pub fn delta_boundary_stability(runs: &[ExperimentResult]) -> DeltaBoundaryStability {
    let series: Vec<Vec<(f64, f64)>> = runs.iter().map(ExperimentResult::delta_boundary_series).collect();
    DeltaBoundaryStability::from_runs(&series)
}

mod nan_as_null {
    use std::collections::BTreeMap;

    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(metrics: &BTreeMap<String, f64>, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(metrics.len()))?;
        for (name, &value) in metrics {
            let value = value.is_finite().then_some(value);
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error> {
        let raw = BTreeMap::<String, Option<f64>>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(name, value)| (name, value.unwrap_or(f64::NAN)))
            .collect())
    }
}

//! Stability analysis over a (step × k) parameter surface.
//!
//! The unit of analysis is a [`SurfaceMetricPoint`]: one compressed configuration and
//! its fidelity metrics. From an accumulated surface this module derives
//!
//! - the [`StabilityBoundary`] (ridge line, collapse threshold, zone membership),
//! - [`PhaseTransition`]s on fixed-k slices,
//! - a per-point [`StabilityConfidence`],
//! - across repeated runs, the [`DeltaBoundaryStability`] of the boundary/bulk MSE gap.

pub mod boundary;
pub mod confidence;
pub mod phase;
pub mod variance;

pub use boundary::{StabilityBoundary, ZoneMembership};
pub use confidence::{score_surface, ConfidenceConfig, ConfidenceWeights, MetricLevel, StabilityConfidence};
pub use phase::{detect_phase_transitions, PhaseConfig, PhaseTransition, TransitionKind};
pub use variance::{DeltaBoundaryStability, StepDeltaSummary};

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::metrics::{DistortionMetrics, FidelityMetrics};

/// One sample of the parameter surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceMetricPoint {
    /// Grid step, `None` for strategies without one (plain k-means).
    pub step: Option<f64>,
    /// Cluster count, `None` for strategies without one (plain grid).
    pub k: Option<usize>,
    pub lsi: f64,
    pub cosine: f64,
    pub energy: f64,
    pub semantic_efficiency: f64,
    /// Distortion metrics, when they were computed for this point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distortion: Option<DistortionMetrics>,
}

impl SurfaceMetricPoint {
    pub fn from_fidelity(step: Option<f64>, k: Option<usize>, fidelity: &FidelityMetrics) -> Self {
        Self {
            step,
            k,
            lsi: fidelity.lsi,
            cosine: fidelity.mean_cosine,
            energy: fidelity.energy,
            semantic_efficiency: fidelity.semantic_efficiency,
            distortion: None,
        }
    }

    pub fn with_distortion(mut self, distortion: DistortionMetrics) -> Self {
        self.distortion = Some(distortion);
        self
    }
}

/// Qualitative region of the surface a point falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Zone {
    Stable,
    Degradation,
    Collapse,
}

/// LSI cutoffs between zones.
///
/// The defaults (0.5 and 0.2) are hand-picked operating points, not derived from data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ZoneThresholds {
    /// LSI at or above this is stable (default: 0.5).
    pub stable: f64,
    /// LSI below this is collapse (default: 0.2).
    pub collapse: f64,
}

impl Default for ZoneThresholds {
    fn default() -> Self {
        Self {
            stable: 0.5,
            collapse: 0.2,
        }
    }
}

impl ZoneThresholds {
    /// NaN LSI classifies as collapse.
    pub fn classify(&self, lsi: f64) -> Zone {
        if lsi >= self.stable {
            Zone::Stable
        } else if lsi >= self.collapse {
            Zone::Degradation
        } else {
            Zone::Collapse
        }
    }
}

/// Orders steps with `None` first, then by value.
pub(crate) fn cmp_step(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (a, b) => a.is_some().cmp(&b.is_some()),
    }
}

pub(crate) fn same_step(a: Option<f64>, b: Option<f64>) -> bool {
    cmp_step(a, b) == Ordering::Equal
}

/// Distinct steps of the surface, ascending.
pub(crate) fn distinct_steps(points: &[SurfaceMetricPoint]) -> Vec<Option<f64>> {
    let mut steps: Vec<Option<f64>> = points.iter().map(|p| p.step).collect();
    steps.sort_by(|a, b| cmp_step(*a, *b));
    steps.dedup_by(|a, b| same_step(*a, *b));
    steps
}

/// `ΔLSI / Δstep`, or the raw difference when the steps coincide.
pub(crate) fn slope(from: &SurfaceMetricPoint, to: &SurfaceMetricPoint) -> f64 {
    let d_lsi = to.lsi - from.lsi;
    match (from.step, to.step) {
        (Some(a), Some(b)) if b != a => d_lsi / (b - a),
        _ => d_lsi,
    }
}

#[cfg(test)]
pub(crate) fn point(step: f64, k: usize, lsi: f64) -> SurfaceMetricPoint {
    SurfaceMetricPoint {
        step: Some(step),
        k: Some(k),
        lsi,
        cosine: lsi,
        energy: 0.0,
        semantic_efficiency: 0.0,
        distortion: None,
    }
}

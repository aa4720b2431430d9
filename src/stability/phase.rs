//! Phase-transition detection on fixed-k slices of the surface.
//!
//! # Method
//!
//! For a slice sorted by step with LSI values `y₀ … yₙ₋₁`:
//!
//! ```text
//! sᵢ = (yᵢ₊₁ − yᵢ) / (stepᵢ₊₁ − stepᵢ)      slopes
//! cᵢ = sᵢ₊₁ − sᵢ                            curvatures
//! τ  = 1.5 · σ(c)                           threshold (population σ)
//! ```
//!
//! Index `i` is flagged when `|cᵢ| > τ` (and `τ > 0`). The inflection sits at sample
//! `i + 1`; the slope leaving it, `sᵢ₊₁`, decides the kind of transition.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{cmp_step, slope, SurfaceMetricPoint};
use crate::metrics::mean_and_variance;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhaseConfig {
    /// Curvature threshold in standard deviations (default: 1.5).
    pub sigma_multiplier: f64,
    /// Slope below which a sharp transition is a cliff (default: −0.5).
    pub cliff_slope: f64,
    /// Curvature, in thresholds, a cliff must exceed (default: 2.0).
    pub cliff_curvature_ratio: f64,
    /// Slope below which a transition heads into collapse (default: −0.2).
    pub collapse_slope: f64,
    /// Lower bound of the gentle-decline band `[ridge_slope, 0)` (default: −0.1).
    pub ridge_slope: f64,
    /// Curvature, in thresholds, that maps to full confidence (default: 3.0).
    pub confidence_ratio: f64,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            sigma_multiplier: 1.5,
            cliff_slope: -0.5,
            cliff_curvature_ratio: 2.0,
            collapse_slope: -0.2,
            ridge_slope: -0.1,
            confidence_ratio: 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionKind {
    Cliff,
    DegradationToCollapse,
    RidgeToDegradation,
    Smooth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTransition {
    pub k: Option<usize>,
    /// Step of the inflection sample.
    pub step: f64,
    /// Position of the inflection sample within its slice.
    pub index: usize,
    pub kind: TransitionKind,
    pub slope: f64,
    pub curvature: f64,
    pub steepness: f64,
    pub confidence: f64,
}

impl PhaseConfig {
    fn classify(&self, slope: f64, curvature: f64, threshold: f64) -> TransitionKind {
        if slope < self.cliff_slope && curvature.abs() > self.cliff_curvature_ratio * threshold {
            TransitionKind::Cliff
        } else if slope < self.collapse_slope {
            TransitionKind::DegradationToCollapse
        } else if slope >= self.ridge_slope && slope < 0.0 {
            TransitionKind::RidgeToDegradation
        } else {
            TransitionKind::Smooth
        }
    }
}

/// Transitions on every fixed-k slice, slices ordered by k.
///
/// Points without a step are ignored; slices with fewer than three samples yield nothing.
pub fn detect_phase_transitions(points: &[SurfaceMetricPoint], config: &PhaseConfig) -> Vec<PhaseTransition> {
    let mut ks: Vec<Option<usize>> = points.iter().map(|p| p.k).collect();
    ks.sort_unstable();
    ks.dedup();

    let mut transitions = Vec::new();
    for k in ks {
        let mut slice: Vec<&SurfaceMetricPoint> = points.iter().filter(|p| p.k == k && p.step.is_some()).collect();
        slice.sort_by(|a, b| cmp_step(a.step, b.step));
        transitions.extend(detect_in_slice(&slice, k, config));
    }
    debug!(transitions = transitions.len(), "phase detection");
    transitions
}

fn detect_in_slice(slice: &[&SurfaceMetricPoint], k: Option<usize>, config: &PhaseConfig) -> Vec<PhaseTransition> {
    if slice.len() < 3 {
        return Vec::new();
    }
    let slopes: Vec<f64> = slice.windows(2).map(|w| slope(w[0], w[1])).collect();
    let curvatures: Vec<f64> = slopes.windows(2).map(|w| w[1] - w[0]).collect();
    let (_, variance) = mean_and_variance(&curvatures);
    let threshold = config.sigma_multiplier * variance.sqrt();
    if threshold.is_nan() || threshold <= 0.0 {
        return Vec::new();
    }

    curvatures
        .iter()
        .enumerate()
        .filter(|(_, c)| c.abs() > threshold)
        .filter_map(|(i, &curvature)| {
            let leaving = slopes[i + 1];
            let step = slice[i + 1].step?;
            Some(PhaseTransition {
                k,
                step,
                index: i + 1,
                kind: config.classify(leaving, curvature, threshold),
                slope: leaving,
                curvature,
                steepness: leaving.abs(),
                confidence: (curvature.abs() / (config.confidence_ratio * threshold)).min(1.0),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stability::point;

    fn drop_slice(k: usize) -> Vec<SurfaceMetricPoint> {
        let lsi = [0.9, 0.9, 0.9, 0.9, 0.9, 0.2, 0.2, 0.2];
        lsi.iter()
            .enumerate()
            .map(|(i, &y)| point((i + 1) as f64 / 10.0, k, y))
            .collect()
    }

    #[test]
    fn step_drop_is_a_transition_into_collapse() {
        let t = detect_phase_transitions(&drop_slice(4), &PhaseConfig::default());
        let into = t
            .iter()
            .find(|t| t.kind == TransitionKind::DegradationToCollapse)
            .expect("transition");
        assert!((into.step - 0.5).abs() < 1e-12);
        assert_eq!(into.index, 4);
        assert_eq!(into.k, Some(4));
        assert!(into.slope < -6.0);
        assert!(into.confidence > 0.0 && into.confidence <= 1.0);
        // leaving the floor again is flat
        assert!(t.iter().any(|t| t.kind == TransitionKind::Smooth && (t.step - 0.6).abs() < 1e-12));
    }

    #[test]
    fn linear_and_short_slices_have_no_transitions() {
        let linear: Vec<SurfaceMetricPoint> = (0..5).map(|i| point(i as f64, 1, 1.0 - 0.25 * i as f64)).collect();
        assert!(detect_phase_transitions(&linear, &PhaseConfig::default()).is_empty());
        assert!(detect_phase_transitions(&drop_slice(1)[..2], &PhaseConfig::default()).is_empty());
    }

    #[test]
    fn classification_bands() {
        let c = PhaseConfig::default();
        assert_eq!(c.classify(-1.0, 10.0, 1.0), TransitionKind::Cliff);
        assert_eq!(c.classify(-1.0, 1.5, 1.0), TransitionKind::DegradationToCollapse);
        assert_eq!(c.classify(-0.05, 1.5, 1.0), TransitionKind::RidgeToDegradation);
        assert_eq!(c.classify(-0.15, 1.5, 1.0), TransitionKind::Smooth);
        assert_eq!(c.classify(0.3, 1.5, 1.0), TransitionKind::Smooth);
    }

    #[test]
    fn kinds_serialize_kebab_case() {
        let s = serde_json::to_string(&TransitionKind::DegradationToCollapse).unwrap();
        assert_eq!(s, "\"degradation-to-collapse\"");
    }
}

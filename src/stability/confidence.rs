//! Composite confidence that a surface point's zone is real and not sampling noise.
//!
//! Four sub-scores in `[0, 1]`, combined with fixed weights:
//!
//! | factor              | weight | high when                                          |
//! |---------------------|--------|----------------------------------------------------|
//! | ridge sharpness     | 0.3    | the point clearly beats other k at the same step   |
//! | cliff steepness     | 0.3    | LSI changes fast across neighboring steps          |
//! | neighbor continuity | 0.2    | spatial neighbors agree on LSI                     |
//! | metric consistency  | 0.2    | distortion metrics tell the same story as LSI      |

use serde::{Deserialize, Serialize};

use super::{cmp_step, same_step, slope, SurfaceMetricPoint};
use crate::metrics::mean_and_variance;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfidenceWeights {
    pub ridge_sharpness: f64,
    pub cliff_steepness: f64,
    pub neighbor_continuity: f64,
    pub metric_consistency: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            ridge_sharpness: 0.3,
            cliff_steepness: 0.3,
            neighbor_continuity: 0.2,
            metric_consistency: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfidenceConfig {
    pub weights: ConfidenceWeights,
    /// LSI standard deviation among neighbors that zeroes continuity (default: 0.2).
    pub continuity_scale: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            weights: ConfidenceWeights::default(),
            continuity_scale: 0.2,
        }
    }
}

/// Coarse quality bucket shared by LSI and the distortion metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricLevel {
    Low,
    Medium,
    High,
}

impl MetricLevel {
    /// Higher is better: `high ≥ high_at`, `medium ≥ medium_at`.
    fn at_least(value: f64, high_at: f64, medium_at: f64) -> Self {
        if value >= high_at {
            Self::High
        } else if value >= medium_at {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Lower is better: `high ≤ high_at`, `medium ≤ medium_at`.
    fn at_most(value: f64, high_at: f64, medium_at: f64) -> Self {
        if value <= high_at {
            Self::High
        } else if value <= medium_at {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn of_lsi(lsi: f64) -> Self {
        Self::at_least(lsi, 0.5, 0.2)
    }

    pub fn of_neighborhood_overlap(overlap: f64) -> Self {
        Self::at_least(overlap, 0.8, 0.5)
    }

    pub fn of_pairwise_distortion(distortion: f64) -> Self {
        Self::at_most(distortion, 0.1, 0.3)
    }

    pub fn of_collapse_ratio(ratio: f64) -> Self {
        Self::at_most(ratio, 0.1, 0.3)
    }

    fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilityConfidence {
    pub step: Option<f64>,
    pub k: Option<usize>,
    pub ridge_sharpness: f64,
    pub cliff_steepness: f64,
    pub neighbor_continuity: f64,
    pub metric_consistency: f64,
    pub composite: f64,
    pub rationale: String,
}

/// Score every point of the surface, in surface order.
pub fn score_surface(points: &[SurfaceMetricPoint], config: &ConfidenceConfig) -> Vec<StabilityConfidence> {
    let max_slope = points
        .iter()
        .map(|p| step_neighbors(points, p).map(|n| slope(p, n).abs()).fold(0.0, f64::max))
        .fold(0.0, f64::max);

    points
        .iter()
        .map(|p| {
            let ridge_sharpness = ridge_sharpness(points, p);
            let cliff_steepness = cliff_steepness(points, p, max_slope);
            let neighbor_continuity = neighbor_continuity(points, p, config.continuity_scale);
            let metric_consistency = metric_consistency(p);
            let w = &config.weights;
            let composite = w.ridge_sharpness * ridge_sharpness
                + w.cliff_steepness * cliff_steepness
                + w.neighbor_continuity * neighbor_continuity
                + w.metric_consistency * metric_consistency;
            let rationale = rationale(
                composite,
                &[
                    ("ridge sharpness", ridge_sharpness),
                    ("cliff steepness", cliff_steepness),
                    ("neighbor continuity", neighbor_continuity),
                    ("metric consistency", metric_consistency),
                ],
            );
            StabilityConfidence {
                step: p.step,
                k: p.k,
                ridge_sharpness,
                cliff_steepness,
                neighbor_continuity,
                metric_consistency,
                composite,
                rationale,
            }
        })
        .collect()
}

/// Samples at the same k and the adjacent distinct steps on either side.
fn step_neighbors<'a>(
    points: &'a [SurfaceMetricPoint],
    p: &'a SurfaceMetricPoint,
) -> impl Iterator<Item = &'a SurfaceMetricPoint> + 'a {
    let slice = points.iter().filter(move |q| q.k == p.k && q.step.is_some());
    let below = slice
        .clone()
        .filter(move |q| cmp_step(q.step, p.step).is_lt())
        .max_by(|a, b| cmp_step(a.step, b.step))
        .map(|q| q.step);
    let above = slice
        .clone()
        .filter(move |q| cmp_step(q.step, p.step).is_gt())
        .min_by(|a, b| cmp_step(a.step, b.step))
        .map(|q| q.step);
    let usable = p.step.is_some();
    slice.filter(move |q| {
        usable && [below, above].iter().flatten().any(|&s| same_step(q.step, s))
    })
}

/// Samples at the same step and the adjacent distinct k on either side.
fn k_neighbors<'a>(
    points: &'a [SurfaceMetricPoint],
    p: &'a SurfaceMetricPoint,
) -> impl Iterator<Item = &'a SurfaceMetricPoint> + 'a {
    let column = points.iter().filter(move |q| same_step(q.step, p.step) && q.k.is_some());
    let below = column.clone().filter_map(|q| q.k).filter(move |&k| Some(k) < p.k).max();
    let above = column.clone().filter_map(|q| q.k).filter(move |&k| Some(k) > p.k).min();
    let usable = p.k.is_some();
    column.filter(move |q| {
        usable && ((below.is_some() && q.k == below) || (above.is_some() && q.k == above))
    })
}

fn ridge_sharpness(points: &[SurfaceMetricPoint], p: &SurfaceMetricPoint) -> f64 {
    let others: Vec<f64> = points
        .iter()
        .filter(|q| same_step(q.step, p.step) && q.k != p.k)
        .map(|q| q.lsi)
        .collect();
    if others.is_empty() {
        return 0.0;
    }
    let mean = others.iter().sum::<f64>() / others.len() as f64;
    let is_peak = others.iter().all(|&o| p.lsi >= o);
    if is_peak && mean > 0.0 {
        ((p.lsi - mean) / mean).min(1.0)
    } else {
        0.0
    }
}

fn cliff_steepness(points: &[SurfaceMetricPoint], p: &SurfaceMetricPoint, max_slope: f64) -> f64 {
    if max_slope <= 0.0 {
        return 0.0;
    }
    step_neighbors(points, p)
        .map(|n| slope(p, n).abs())
        .reduce(f64::max)
        .map_or(0.0, |s| (s / max_slope).min(1.0))
}

fn neighbor_continuity(points: &[SurfaceMetricPoint], p: &SurfaceMetricPoint, scale: f64) -> f64 {
    let mut values = vec![p.lsi];
    values.extend(step_neighbors(points, p).map(|q| q.lsi));
    values.extend(k_neighbors(points, p).map(|q| q.lsi));
    if values.len() < 2 {
        return 1.0;
    }
    let (_, variance) = mean_and_variance(&values);
    1.0 - (variance.sqrt() / scale).min(1.0)
}

fn metric_consistency(p: &SurfaceMetricPoint) -> f64 {
    let Some(d) = &p.distortion else {
        return 0.5;
    };
    let expected = MetricLevel::of_lsi(p.lsi);
    let levels = [
        MetricLevel::of_neighborhood_overlap(d.neighborhood_overlap),
        MetricLevel::of_pairwise_distortion(d.pairwise_distortion),
        MetricLevel::of_collapse_ratio(d.collapse_ratio),
    ];
    levels.iter().filter(|&&l| l == expected).count() as f64 / levels.len() as f64
}

fn rationale(composite: f64, factors: &[(&str, f64)]) -> String {
    let level = MetricLevel::at_least(composite, 0.7, 0.4);
    let mut dominant: Vec<&str> = factors.iter().filter(|(_, v)| *v >= 0.7).map(|(n, _)| *n).collect();
    if dominant.is_empty() {
        if let Some((name, _)) = factors.iter().max_by(|a, b| a.1.total_cmp(&b.1)) {
            dominant.push(*name);
        }
    }
    format!(
        "{} confidence ({composite:.2}), driven by {}",
        level.label(),
        dominant.join(" and ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::DistortionMetrics;
    use crate::stability::point;

    fn surface() -> Vec<SurfaceMetricPoint> {
        vec![
            point(0.1, 2, 0.8),
            point(0.1, 4, 0.9),
            point(0.1, 8, 0.85),
            point(0.2, 2, 0.4),
            point(0.2, 4, 0.5),
            point(0.2, 8, 0.45),
        ]
    }

    #[test]
    fn ridge_peak_scores_relative_gain() {
        let s = surface();
        let c = score_surface(&s, &ConfidenceConfig::default());
        // k = 4 at 0.1 beats mean 0.825
        assert!((c[1].ridge_sharpness - (0.9 - 0.825) / 0.825).abs() < 1e-9);
        assert_eq!(c[0].ridge_sharpness, 0.0);
    }

    #[test]
    fn steepest_pair_normalizes_to_one() {
        let c = score_surface(&surface(), &ConfidenceConfig::default());
        // |slopes| are 4, 4 and 4: all maximal
        for sc in &c {
            assert!((sc.cliff_steepness - 1.0).abs() < 1e-6, "{sc:?}");
        }
    }

    #[test]
    fn isolated_point_is_continuous_and_neutral() {
        let c = score_surface(&[point(0.1, 2, 0.3)], &ConfidenceConfig::default());
        assert_eq!(c[0].neighbor_continuity, 1.0);
        assert_eq!(c[0].metric_consistency, 0.5);
        assert_eq!(c[0].cliff_steepness, 0.0);
        assert_eq!(c[0].ridge_sharpness, 0.0);
        assert!((c[0].composite - 0.3).abs() < 1e-12);
        assert!(c[0].rationale.starts_with("low confidence"));
    }

    #[test]
    fn continuity_uses_adjacent_step_and_k() {
        let s = surface();
        // (0.1, 2): itself 0.8, step neighbor 0.4, k neighbor 0.9
        let values = [0.8, 0.4, 0.9];
        let (_, var) = mean_and_variance(&values);
        let expected = 1.0 - (var.sqrt() / 0.2).min(1.0);
        let c = score_surface(&s, &ConfidenceConfig::default());
        assert!((c[0].neighbor_continuity - expected).abs() < 1e-12);
    }

    #[test]
    fn consistency_counts_agreeing_metrics() {
        let p = point(0.1, 2, 0.9).with_distortion(DistortionMetrics {
            pairwise_distortion: 0.05,
            neighborhood_overlap: 0.6,
            collapse_ratio: 0.0,
            cluster_drift: 0.0,
            density_change: 0.0,
            geodesic_distortion: 0.0,
        });
        assert!((metric_consistency(&p) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn levels() {
        assert_eq!(MetricLevel::of_lsi(0.5), MetricLevel::High);
        assert_eq!(MetricLevel::of_pairwise_distortion(0.3), MetricLevel::Medium);
        assert_eq!(MetricLevel::of_collapse_ratio(0.31), MetricLevel::Low);
    }
}

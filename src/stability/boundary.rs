//! Ridge line, collapse threshold and zone membership of a parameter surface.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{distinct_steps, same_step, SurfaceMetricPoint, Zone, ZoneThresholds};

/// Indices into the surface, grouped by zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneMembership {
    pub stable: Vec<usize>,
    pub degradation: Vec<usize>,
    pub collapse: Vec<usize>,
}

impl ZoneMembership {
    pub fn get(&self, zone: Zone) -> &[usize] {
        match zone {
            Zone::Stable => &self.stable,
            Zone::Degradation => &self.degradation,
            Zone::Collapse => &self.collapse,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilityBoundary {
    /// Best-LSI point per distinct step, ascending by step.
    pub ridge_line: Vec<SurfaceMetricPoint>,
    /// Smallest step from which every sample, at that step and all larger ones, is in
    /// the collapse zone.
    pub collapse_threshold: Option<f64>,
    pub zones: ZoneMembership,
}

impl StabilityBoundary {
    pub fn detect(points: &[SurfaceMetricPoint], thresholds: &ZoneThresholds) -> Self {
        let steps = distinct_steps(points);

        let ridge_line: Vec<SurfaceMetricPoint> = steps
            .iter()
            .filter_map(|&step| {
                points
                    .iter()
                    .filter(|p| same_step(p.step, step))
                    .fold(None, |best: Option<&SurfaceMetricPoint>, p| match best {
                        Some(b) if b.lsi >= p.lsi => Some(b),
                        _ => Some(p),
                    })
                    .cloned()
            })
            .collect();

        let mut collapse_threshold = None;
        for &step in steps.iter().rev() {
            let Some(value) = step else { break };
            let collapsed = points
                .iter()
                .filter(|p| same_step(p.step, step))
                .all(|p| thresholds.classify(p.lsi) == Zone::Collapse);
            if !collapsed {
                break;
            }
            collapse_threshold = Some(value);
        }

        let mut zones = ZoneMembership::default();
        for (i, p) in points.iter().enumerate() {
            match thresholds.classify(p.lsi) {
                Zone::Stable => zones.stable.push(i),
                Zone::Degradation => zones.degradation.push(i),
                Zone::Collapse => zones.collapse.push(i),
            }
        }

        debug!(
            ridge = ridge_line.len(),
            ?collapse_threshold,
            stable = zones.stable.len(),
            degradation = zones.degradation.len(),
            collapse = zones.collapse.len(),
            "stability boundary"
        );

        Self {
            ridge_line,
            collapse_threshold,
            zones,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stability::point;

    fn surface() -> Vec<SurfaceMetricPoint> {
        vec![
            point(0.1, 2, 0.8),
            point(0.1, 4, 0.9),
            point(0.2, 2, 0.4),
            point(0.2, 4, 0.4),
            point(0.3, 2, 0.1),
            point(0.3, 4, 0.15),
            point(0.4, 2, 0.05),
            point(0.4, 4, 0.1),
        ]
    }

    #[test]
    fn ridge_takes_best_k_per_step_first_on_ties() {
        let b = StabilityBoundary::detect(&surface(), &ZoneThresholds::default());
        let ridge: Vec<(Option<f64>, Option<usize>)> = b.ridge_line.iter().map(|p| (p.step, p.k)).collect();
        assert_eq!(
            ridge,
            vec![(Some(0.1), Some(4)), (Some(0.2), Some(2)), (Some(0.3), Some(4)), (Some(0.4), Some(4))]
        );
    }

    #[test]
    fn collapse_threshold_is_start_of_collapsed_tail() {
        let b = StabilityBoundary::detect(&surface(), &ZoneThresholds::default());
        assert_eq!(b.collapse_threshold, Some(0.3));
        assert_eq!(b.zones.stable, vec![0, 1]);
        assert_eq!(b.zones.degradation, vec![2, 3]);
        assert_eq!(b.zones.get(Zone::Collapse), &[4, 5, 6, 7]);
    }

    #[test]
    fn no_threshold_when_largest_step_survives() {
        let mut s = surface();
        s.push(point(0.5, 2, 0.6));
        let b = StabilityBoundary::detect(&s, &ZoneThresholds::default());
        assert_eq!(b.collapse_threshold, None);
    }

    #[test]
    fn empty_surface() {
        let b = StabilityBoundary::detect(&[], &ZoneThresholds::default());
        assert!(b.ridge_line.is_empty());
        assert_eq!(b.collapse_threshold, None);
    }
}

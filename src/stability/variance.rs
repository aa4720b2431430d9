//! Run-to-run stability of the boundary/bulk MSE gap (Δ_boundary).
//!
//! Repeating a sweep with different seeds or subsamples gives, per step, several
//! Δ_boundary values. A step where the mean changes sign marks where boundary vectors
//! stop (or start) degrading faster than the bulk; steps with unusually spread values
//! are where that conclusion is least trustworthy.

use serde::{Deserialize, Serialize};

use crate::metrics::mean_and_variance;

/// A step is high-variance when its std exceeds this multiple of the median std.
const HIGH_VARIANCE_RATIO: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDeltaSummary {
    pub step: f64,
    pub mean: f64,
    /// Population standard deviation across runs.
    pub std: f64,
    /// Runs contributing a finite value at this step.
    pub runs: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaBoundaryStability {
    /// One entry per step, ascending.
    pub steps: Vec<StepDeltaSummary>,
    /// Steps after which the mean Δ crosses or leaves zero: `≤ 0` then `> 0`, or `≥ 0`
    /// then `< 0`.
    pub zero_crossings: Vec<f64>,
    pub high_variance_steps: Vec<f64>,
}

impl DeltaBoundaryStability {
    /// Aggregate `(step, Δ_boundary)` series, one per run. Non-finite values are skipped.
    pub fn from_runs<S: AsRef<[(f64, f64)]>>(runs: &[S]) -> Self {
        let mut samples: Vec<(f64, f64)> = runs
            .iter()
            .flat_map(|r| r.as_ref().iter().copied())
            .filter(|(step, delta)| step.is_finite() && delta.is_finite())
            .collect();
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));

        let steps: Vec<StepDeltaSummary> = samples
            .chunk_by(|a, b| a.0 == b.0)
            .map(|group| {
                let values: Vec<f64> = group.iter().map(|(_, d)| *d).collect();
                let (mean, variance) = mean_and_variance(&values);
                StepDeltaSummary {
                    step: group[0].0,
                    mean,
                    std: variance.sqrt(),
                    runs: values.len(),
                }
            })
            .collect();

        let zero_crossings = steps
            .windows(2)
            .filter(|w| {
                let (a, b) = (w[0].mean, w[1].mean);
                (a <= 0.0 && b > 0.0) || (a >= 0.0 && b < 0.0)
            })
            .map(|w| w[0].step)
            .collect();

        let high_variance_steps = match median(steps.iter().map(|s| s.std).collect()) {
            Some(m) => steps
                .iter()
                .filter(|s| s.std > HIGH_VARIANCE_RATIO * m)
                .map(|s| s.step)
                .collect(),
            None => Vec::new(),
        };

        Self {
            steps,
            zero_crossings,
            high_variance_steps,
        }
    }
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

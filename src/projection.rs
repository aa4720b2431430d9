//! Two-component PCA projection for visual inspection of a collection.
//!
//! The top two principal axes are found by power iteration on the (implicit) covariance
//! matrix, the second with deflation against the first, so no `D × D` matrix is ever
//! formed. Deterministic: the start vector is fixed.

use serde::{Deserialize, Serialize};

use crate::collection::EmbeddingCollection;
use crate::error::Result;

const MAX_POWER_ITERATIONS: usize = 100;
const CONVERGENCE_THRESHOLD: f64 = 1e-10;

/// Result of projecting a collection onto its first two principal components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PcaProjection {
    /// Per-dimension mean that was subtracted before projecting.
    pub mean: Vec<f32>,
    /// Unit principal axes, largest variance first.
    pub components: [Vec<f32>; 2],
    /// Variance captured along each axis.
    pub explained_variance: [f32; 2],
    /// `(key, [pc1, pc2])` in collection order.
    pub points: Vec<(String, [f32; 2])>,
}

/// Project a collection onto its first two principal components.
///
/// Dimensions below two are padded with a zero axis. An empty collection yields an
/// empty projection.
pub fn pca_2d(collection: &EmbeddingCollection) -> Result<PcaProjection> {
    let dim = collection.validate()?;
    let n = collection.len();
    if n == 0 {
        return Ok(PcaProjection {
            mean: Vec::new(),
            components: [Vec::new(), Vec::new()],
            explained_variance: [0.0, 0.0],
            points: Vec::new(),
        });
    }

    let mut mean = vec![0.0f64; dim];
    for v in collection.vectors() {
        for (m, &x) in mean.iter_mut().zip(v) {
            *m += x as f64;
        }
    }
    for m in &mut mean {
        *m /= n as f64;
    }

    let centered: Vec<Vec<f64>> = collection
        .vectors()
        .iter()
        .map(|v| v.iter().zip(&mean).map(|(&x, &m)| x as f64 - m).collect())
        .collect();

    let (pc1, var1) = principal_axis(&centered, dim, None);
    let (pc2, var2) = principal_axis(&centered, dim, Some(&pc1));

    let points = collection
        .keys()
        .iter()
        .zip(&centered)
        .map(|(key, row)| (key.clone(), [dot64(row, &pc1) as f32, dot64(row, &pc2) as f32]))
        .collect();

    Ok(PcaProjection {
        mean: mean.iter().map(|&m| m as f32).collect(),
        components: [to_f32(&pc1), to_f32(&pc2)],
        explained_variance: [var1 as f32, var2 as f32],
        points,
    })
}

/// Power iteration for the dominant eigenvector of `XᵀX / n`, optionally orthogonal to
/// `exclude`. Returns `(axis, variance)`; a zero axis when there is no variance left.
fn principal_axis(centered: &[Vec<f64>], dim: usize, exclude: Option<&[f64]>) -> (Vec<f64>, f64) {
    if dim == 0 {
        return (Vec::new(), 0.0);
    }
    let n = centered.len() as f64;

    // Fixed start vector, tilted so it is never exactly orthogonal to a coordinate axis.
    let mut v: Vec<f64> = (0..dim).map(|i| 1.0 + i as f64 * 1e-3).collect();
    if let Some(e) = exclude {
        orthogonalize(&mut v, e);
    }
    if !normalize64(&mut v) {
        return (vec![0.0; dim], 0.0);
    }

    let mut eigenvalue = 0.0;
    for _ in 0..MAX_POWER_ITERATIONS {
        let mut next = vec![0.0f64; dim];
        for row in centered {
            let proj = dot64(row, &v);
            for (acc, &x) in next.iter_mut().zip(row) {
                *acc += proj * x;
            }
        }
        for x in &mut next {
            *x /= n;
        }
        if let Some(e) = exclude {
            orthogonalize(&mut next, e);
        }
        let new_eigenvalue = dot64(&next, &v);
        if !normalize64(&mut next) {
            return (vec![0.0; dim], 0.0);
        }
        let delta: f64 = next.iter().zip(&v).map(|(a, b)| (a - b).abs()).sum();
        v = next;
        eigenvalue = new_eigenvalue;
        if delta < CONVERGENCE_THRESHOLD {
            break;
        }
    }
    (v, eigenvalue.max(0.0))
}

fn dot64(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn orthogonalize(v: &mut [f64], axis: &[f64]) {
    let proj = dot64(v, axis);
    for (x, &a) in v.iter_mut().zip(axis) {
        *x -= proj * a;
    }
}

fn normalize64(v: &mut [f64]) -> bool {
    let n = dot64(v, v).sqrt();
    if n < 1e-12 {
        return false;
    }
    for x in v.iter_mut() {
        *x /= n;
    }
    true
}

fn to_f32(v: &[f64]) -> Vec<f32> {
    v.iter().map(|&x| x as f32).collect()
}

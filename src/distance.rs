//! Vector primitives for dense embeddings.
//!
//! All kernels take plain slices. Like most of the crate they are total: a length
//! mismatch yields `f32::INFINITY` for distances (so a mismatched vector is never picked
//! as a nearest neighbor) rather than a panic. Collections are validated before they
//! reach these kernels.

const NORM_EPSILON: f32 = 1e-9;

/// Dot product.
#[inline]
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// L2 norm.
#[inline]
#[must_use]
pub fn norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

/// Squared Euclidean distance.
#[inline]
#[must_use]
pub fn l2_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Euclidean (L2) distance.
#[inline]
#[must_use]
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    l2_distance_squared(a, b).sqrt()
}

/// Cosine similarity in `[-1, 1]`.
///
/// Returns `0.0` when either vector has (near) zero norm, and for mismatched lengths.
#[inline]
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let na = norm(a);
    let nb = norm(b);
    if na > NORM_EPSILON && nb > NORM_EPSILON {
        (dot(a, b) / (na * nb)).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Mean squared error between two vectors ("energy" of the residual).
///
/// Empty vectors have zero error.
#[inline]
#[must_use]
pub fn mse(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() {
        return 0.0;
    }
    l2_distance_squared(a, b) / a.len() as f32
}


/// Component-wise mean of a set of vectors. `None` for an empty set.
#[must_use]
pub fn mean_vector<V: AsRef<[f32]>>(vectors: &[V]) -> Option<Vec<f32>> {
    let first = vectors.first()?.as_ref();
    let mut sums = vec![0.0f64; first.len()];
    for v in vectors {
        for (s, &x) in sums.iter_mut().zip(v.as_ref()) {
            *s += x as f64;
        }
    }
    let n = vectors.len() as f64;
    Some(sums.into_iter().map(|s| (s / n) as f32).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_is_one_for_identical() {
        let a = [1.0_f32, 2.0, 3.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn mse_matches_hand_computation() {
        let a = [1.0_f32, 2.0, 3.0, 4.0];
        let b = [1.0_f32, 2.0, 3.0, 6.0];
        assert!((mse(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn mismatched_lengths_are_never_nearest() {
        assert!(l2_distance(&[1.0, 2.0], &[1.0]).is_infinite());
    }

    #[test]
    fn mean_vector_of_two_points() {
        let m = mean_vector(&[vec![0.0_f32, 2.0], vec![2.0, 4.0]]).unwrap();
        assert_eq!(m, vec![1.0, 3.0]);
        assert!(mean_vector::<Vec<f32>>(&[]).is_none());
    }
}

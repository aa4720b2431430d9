//! Brute-force k-nearest-neighbor queries.
//!
//! Every neighbor-based metric in the crate goes through these helpers. They are exact
//! and O(n²·d) on purpose: results must be reproducible, and the collections studied
//! are small to moderate. Ties in distance resolve to the lower index.

use std::collections::HashSet;

/// A neighbor of some query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f32,
}

/// All other points sorted by Euclidean distance from `points[query]`.
pub fn sorted_neighbors<V: AsRef<[f32]>>(points: &[V], query: usize) -> Vec<Neighbor> {
    let q = points[query].as_ref();
    let mut neighbors: Vec<Neighbor> = points
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != query)
        .map(|(i, p)| Neighbor {
            index: i,
            distance: crate::distance::l2_distance(q, p.as_ref()),
        })
        .collect();
    // Stable sort: equal distances keep index order.
    neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    neighbors
}

/// The `k` nearest other points of `points[query]` (fewer if the set is small).
pub fn k_nearest<V: AsRef<[f32]>>(points: &[V], query: usize, k: usize) -> Vec<Neighbor> {
    let mut neighbors = sorted_neighbors(points, query);
    neighbors.truncate(k);
    neighbors
}

/// kNN lists for every point.
pub fn knn_table<V: AsRef<[f32]>>(points: &[V], k: usize) -> Vec<Vec<Neighbor>> {
    (0..points.len()).map(|i| k_nearest(points, i, k)).collect()
}

/// kNN index sets for every point.
pub fn knn_index_sets<V: AsRef<[f32]>>(points: &[V], k: usize) -> Vec<HashSet<usize>> {
    knn_table(points, k)
        .into_iter()
        .map(|ns| ns.into_iter().map(|n| n.index).collect())
        .collect()
}

/// Mean distance to the listed neighbors (`0.0` when there are none).
pub fn mean_distance(neighbors: &[Neighbor]) -> f64 {
    if neighbors.is_empty() {
        return 0.0;
    }
    neighbors.iter().map(|n| n.distance as f64).sum::<f64>() / neighbors.len() as f64
}

/// Jaccard similarity `|A ∩ B| / |A ∪ B|`; two empty sets are identical (`1.0`).
pub fn jaccard(a: &HashSet<usize>, b: &HashSet<usize>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> Vec<Vec<f32>> {
        (0..5).map(|i| vec![i as f32]).collect()
    }

    #[test]
    fn nearest_excludes_self_and_breaks_ties_by_index() {
        let pts = line();
        let n = k_nearest(&pts, 2, 2);
        assert_eq!(n.iter().map(|n| n.index).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(n[0].distance, 1.0);
    }

    #[test]
    fn small_sets_return_fewer_neighbors() {
        let pts = vec![vec![0.0], vec![1.0]];
        assert_eq!(k_nearest(&pts, 0, 5).len(), 1);
    }

    #[test]
    fn jaccard_of_partial_overlap() {
        let a: HashSet<usize> = [1, 2, 3].into_iter().collect();
        let b: HashSet<usize> = [2, 3, 4].into_iter().collect();
        assert!((jaccard(&a, &b) - 0.5).abs() < 1e-12);
        assert_eq!(jaccard(&HashSet::new(), &HashSet::new()), 1.0);
    }

    #[test]
    fn mean_distance_of_neighbors() {
        let pts = line();
        assert!((mean_distance(&k_nearest(&pts, 0, 2)) - 1.5).abs() < 1e-12);
        assert_eq!(mean_distance(&[]), 0.0);
    }
}

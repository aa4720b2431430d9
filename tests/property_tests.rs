//! Property-based tests for tessera.
//!
//! These verify invariants that hold regardless of input:
//! - grid snapping follows its formula and is idempotent
//! - every compressor preserves the key set and maps onto its centroids
//! - LSI, neighborhood overlap and collapse ratio stay in range

use proptest::prelude::*;
use tessera::compression::{compress, CompressionOptions};
use tessera::metrics::distortion::{collapse_ratio, neighborhood_overlap};
use tessera::metrics::FidelityMetrics;
use tessera::quantization::{snap_to_grid, snap_value};
use tessera::EmbeddingCollection;

prop_compose! {
    fn arb_vector(dim: usize)(vec in prop::collection::vec(-10.0f32..10.0, dim)) -> Vec<f32> {
        vec
    }
}

prop_compose! {
    fn arb_collection(max_len: usize, dim: usize)
        (vectors in prop::collection::vec(prop::collection::vec(-5.0f32..5.0, dim), 1..max_len))
        -> EmbeddingCollection
    {
        vectors.into_iter().enumerate().map(|(i, v)| (format!("v{i}"), v)).collect()
    }
}

fn arb_options() -> impl Strategy<Value = CompressionOptions> {
    let step = 0.05f32..2.0;
    let k = 0usize..12;
    prop_oneof![
        step.clone().prop_map(|step| CompressionOptions::Grid { step }),
        k.clone().prop_map(|k| CompressionOptions::KMeans { k }),
        (step.clone(), k.clone()).prop_map(|(step, k)| CompressionOptions::KMeansGrid { step, k }),
        (step, k).prop_map(|(step, k)| CompressionOptions::BoundaryAware { step, k }),
    ]
}

mod grid_props {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn snap_follows_formula(v in arb_vector(16), step in 0.01f32..2.0) {
            let snapped = snap_to_grid(&v, step);
            for (x, s) in v.iter().zip(&snapped) {
                let expected = (x / step).round() * step;
                prop_assert_eq!(*s, expected + 0.0);
            }
        }

        #[test]
        fn snap_is_idempotent(v in arb_vector(16), step in 0.01f32..2.0) {
            let once = snap_to_grid(&v, step);
            let twice = snap_to_grid(&once, step);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn snap_error_is_at_most_half_a_step(x in -10.0f32..10.0, step in 0.01f32..2.0) {
            let err = (snap_value(x, step) - x).abs();
            prop_assert!(err <= step / 2.0 + 1e-5, "error {} for step {}", err, step);
        }
    }
}

mod compression_props {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn key_set_is_preserved(c in arb_collection(25, 4), options in arb_options()) {
            let r = compress(&c, &options).unwrap();
            prop_assert_eq!(r.compressed.keys(), c.keys());
        }

        #[test]
        fn values_are_centroids(c in arb_collection(25, 4), options in arb_options()) {
            let r = compress(&c, &options).unwrap();
            for (_, v) in r.compressed.iter() {
                prop_assert!(r.centroids.iter().any(|centroid| centroid.as_slice() == v));
            }
            prop_assert!(r.centroid_count() <= c.len());
        }

        #[test]
        fn lsi_is_bounded(c in arb_collection(25, 4), options in arb_options()) {
            let r = compress(&c, &options).unwrap();
            let m = FidelityMetrics::compute(&c, &r.compressed).unwrap();
            prop_assert!(m.lsi <= 1.0 + 1e-9, "lsi {}", m.lsi);
            prop_assert!(m.lsi >= -1.0 - 1e-9, "lsi {}", m.lsi);
            prop_assert!(m.energy >= 0.0);
        }

        #[test]
        fn kmeans_is_deterministic(c in arb_collection(25, 4), k in 1usize..8) {
            let a = compress(&c, &CompressionOptions::KMeans { k }).unwrap();
            let b = compress(&c, &CompressionOptions::KMeans { k }).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}

mod distortion_props {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn overlap_and_collapse_are_ratios(c in arb_collection(25, 3), step in 0.05f32..3.0) {
            let r = compress(&c, &CompressionOptions::Grid { step }).unwrap();
            let overlap = neighborhood_overlap(c.vectors(), r.compressed.vectors(), 3);
            let collapse = collapse_ratio(c.vectors(), r.compressed.vectors(), 0.1);
            prop_assert!((0.0..=1.0).contains(&overlap), "overlap {}", overlap);
            prop_assert!((0.0..=1.0).contains(&collapse), "collapse {}", collapse);
        }

        #[test]
        fn identity_is_perfect(c in arb_collection(25, 3)) {
            prop_assert_eq!(neighborhood_overlap(c.vectors(), c.vectors(), 3), 1.0);
            prop_assert_eq!(collapse_ratio(c.vectors(), c.vectors(), 0.1), 0.0);
        }
    }
}

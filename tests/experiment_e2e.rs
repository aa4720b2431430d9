//! End-to-end behavior on synthetic datasets: compressors, metrics and sweeps together.

use tessera::compression::{compress, CompressionOptions};
use tessera::datasets::{gaussian_clusters, perturb, ring};
use tessera::experiment::{
    delta_boundary_stability, metric_names, run_experiment, CompressionStrategy, ExperimentConfig,
    ExperimentResult, MetricKind,
};
use tessera::graph::KnnGraph;
use tessera::metrics::distortion::pairwise_distortion;
use tessera::metrics::{TopologyConfig, TopologyIndicators};
use tessera::EmbeddingCollection;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn grid_distortion_grows_with_step() {
    init_tracing();
    let c = gaussian_clusters(50, 3, 10, 0.5, 12345).unwrap();
    let distortions: Vec<f64> = [0.05f32, 0.1, 0.25, 0.5]
        .iter()
        .map(|&step| {
            let r = compress(&c, &CompressionOptions::Grid { step }).unwrap();
            pairwise_distortion(c.vectors(), r.compressed.vectors())
        })
        .collect();
    for w in distortions.windows(2) {
        assert!(w[1] >= 0.9 * w[0], "distortion fell: {distortions:?}");
    }
    assert!(distortions[3] > distortions[0]);
}

#[test]
fn kmeans_with_k_at_least_n_is_identity() {
    let c = gaussian_clusters(12, 2, 5, 0.5, 3).unwrap();
    for k in [12, 40] {
        let r = compress(&c, &CompressionOptions::KMeans { k }).unwrap();
        assert_eq!(r.compressed, c);
        assert_eq!(r.centroid_count(), 12);
    }
}

#[test]
fn boundary_aware_keeps_at_least_as_many_centroids_as_hybrid() {
    let c = gaussian_clusters(30, 3, 8, 0.5, 42).unwrap();
    let (step, k) = (0.25, 3);
    let hybrid = compress(&c, &CompressionOptions::KMeansGrid { step, k }).unwrap();
    let aware = compress(&c, &CompressionOptions::BoundaryAware { step, k }).unwrap();
    assert!(
        aware.centroid_count() >= hybrid.centroid_count(),
        "boundary-aware {} < hybrid {}",
        aware.centroid_count(),
        hybrid.centroid_count()
    );
    assert_eq!(aware.boundary.as_ref().unwrap().boundary_len(), 3);
}

#[test]
fn ring_graph_has_cycles_and_nearest_neighbor_forest_has_none() {
    let r = ring(24, 1.0, 0.0, 0).unwrap();
    assert!(KnnGraph::build(r.vectors(), 2).approximate_cycle_count() > 0);
    let t = TopologyIndicators::compute(&r, &TopologyConfig { k: 2, ..Default::default() }).unwrap();
    assert!(t.cycle_count > 0);

    let clusters = gaussian_clusters(30, 3, 4, 0.3, 7).unwrap();
    let forest = KnnGraph::build(clusters.vectors(), 1);
    assert_eq!(forest.approximate_cycle_count(), 0);
}

#[test]
fn three_orthogonal_vectors_with_oversized_k() {
    let c: EmbeddingCollection = vec![
        ("a", vec![1.0, 0.0, 0.0, 0.0]),
        ("b", vec![0.0, 1.0, 0.0, 0.0]),
        ("c", vec![0.0, 0.0, 1.0, 0.0]),
    ]
    .into_iter()
    .collect();
    let r = compress(&c, &CompressionOptions::BoundaryAware { step: 0.5, k: 5 }).unwrap();
    assert_eq!(r.compressed.len(), 3);
    assert!(r.compressed.iter().all(|(_, v)| v.iter().all(|x| x.is_finite())));
    assert_eq!(r.compressed, c);
}

fn sweep(seed: u64) -> ExperimentResult {
    let c = gaussian_clusters(40, 3, 6, 0.5, seed).unwrap();
    let config = ExperimentConfig::new(CompressionStrategy::BoundaryAware)
        .with_step_range(0.05, 0.8, 4)
        .with_k_range(2.0, 6.0, 3)
        .with_metrics([MetricKind::Distortion, MetricKind::Topology, MetricKind::Boundary])
        .with_stability_analysis(true);
    run_experiment(&c, &config).unwrap()
}

#[test]
fn full_sweep_produces_every_requested_metric() {
    init_tracing();
    let r = sweep(5);
    assert_eq!(r.points.len(), 12);
    assert_eq!(r.summary.total_points, 12);
    for p in &r.points {
        for name in [
            metric_names::LSI,
            metric_names::SEMANTIC_EFFICIENCY,
            metric_names::PAIRWISE_DISTORTION,
            metric_names::GEODESIC_DISTORTION,
            metric_names::CYCLE_COUNT,
            metric_names::COMPONENT_COUNT,
            metric_names::MSE_GLOBAL,
            metric_names::DELTA_BOUNDARY,
        ] {
            assert!(p.metric(name).is_some(), "missing {name}");
        }
        assert!(p.lsi() <= 1.0 + 1e-9);
    }
    let best = r.summary.best_point.as_ref().unwrap();
    assert!(r.points.iter().all(|p| p.lsi() <= best.lsi()));
    let boundary = r.boundary.as_ref().unwrap();
    assert_eq!(boundary.ridge_line.len(), 4);
    let zoned = boundary.zones.stable.len() + boundary.zones.degradation.len() + boundary.zones.collapse.len();
    assert_eq!(zoned, 12);
    assert!(r
        .confidences
        .as_ref()
        .unwrap()
        .iter()
        .all(|c| (0.0..=1.0 + 1e-9).contains(&c.composite)));
}

#[test]
fn result_round_trips_through_json() {
    let r = sweep(11);
    let json = serde_json::to_string(&r).unwrap();
    let back: ExperimentResult = serde_json::from_str(&json).unwrap();
    assert_eq!(serde_json::to_string(&back).unwrap(), json);
    assert_eq!(back.points.len(), r.points.len());
    assert_eq!(back.summary.stability_score, r.summary.stability_score);
}

#[test]
fn delta_boundary_stability_across_seeds() {
    let runs: Vec<ExperimentResult> = (0..3).map(sweep).collect();
    let s = delta_boundary_stability(&runs);
    assert_eq!(s.steps.len(), 4);
    assert!(s.steps.iter().all(|step| step.runs >= 3 && step.std >= 0.0));
}

#[test]
fn perturbation_volatility_grows_with_noise() {
    let base = gaussian_clusters(40, 2, 4, 0.5, 9).unwrap();
    let config = TopologyConfig::default();
    let calm = perturb(&base, 0.001, 1).unwrap();
    let noisy = perturb(&base, 1.0, 1).unwrap();
    let low = TopologyIndicators::compute_with_perturbation(&base, &calm, &config).unwrap();
    let high = TopologyIndicators::compute_with_perturbation(&base, &noisy, &config).unwrap();
    assert!(low.neighbor_volatility.unwrap() <= high.neighbor_volatility.unwrap());
    assert!(high.neighbor_volatility.unwrap() > 0.0);
}

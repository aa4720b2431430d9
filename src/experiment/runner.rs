use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info, instrument};

use super::result::metric_names as names;
use super::{ExperimentConfig, ExperimentMetadata, ExperimentPoint, ExperimentResult, ExperimentSummary, MetricKind};
use crate::collection::EmbeddingCollection;
use crate::compression::{ambiguity_scores, classify_boundary, compress_with, CompressionResult};
use crate::error::{Result, TesseraError};
use crate::metrics::{BoundaryMseMetrics, DistortionMetrics, FidelityMetrics, TopologyIndicators};
use crate::stability::{
    detect_phase_transitions, score_surface, StabilityBoundary, SurfaceMetricPoint, Zone,
};

/// Sweep the configured (step × k) grid over `collection`.
///
/// Fails before compressing anything if the collection is empty, has inconsistent
/// dimensions or non-finite values, or a swept range is invalid.
#[instrument(skip_all, fields(strategy = config.strategy.name(), n = collection.len()))]
pub fn run_experiment(collection: &EmbeddingCollection, config: &ExperimentConfig) -> Result<ExperimentResult> {
    if collection.is_empty() {
        return Err(TesseraError::EmptyCollection);
    }
    let dimension = collection.validate()?;
    config.validate()?;

    let strategy = config.strategy;
    let steps: Vec<Option<f64>> = if strategy.uses_step() {
        config.step_range.values().into_iter().map(Some).collect()
    } else {
        vec![None]
    };
    let ks: Vec<Option<usize>> = if strategy.uses_k() {
        config.k_range.k_values().into_iter().map(Some).collect()
    } else {
        vec![None]
    };
    info!(steps = steps.len(), ks = ks.len(), "starting sweep");

    let mut points = Vec::with_capacity(steps.len() * ks.len());
    let mut surface = Vec::with_capacity(steps.len() * ks.len());
    for &step in &steps {
        for &k in &ks {
            let options = strategy.options(step.unwrap_or_default(), k.unwrap_or_default());
            let compressed = compress_with(collection, &options, &config.compressor)?;
            let (point, surface_point) = measure(collection, &compressed, step, k, config)?;
            debug!(?step, ?k, lsi = surface_point.lsi, "measured");
            points.push(point);
            surface.push(surface_point);
        }
    }

    let (boundary, phase_transitions, confidences) = if config.analyze_stability {
        (
            Some(StabilityBoundary::detect(&surface, &config.zones)),
            Some(detect_phase_transitions(&surface, &config.phase)),
            Some(score_surface(&surface, &config.confidence)),
        )
    } else {
        (None, None, None)
    };

    let summary = summarize(&points, &surface, config);
    info!(
        points = summary.total_points,
        stability_score = summary.stability_score,
        "sweep finished"
    );

    Ok(ExperimentResult {
        metadata: ExperimentMetadata {
            strategy,
            sample_size: collection.len(),
            dimension,
            step_range: strategy.uses_step().then_some(config.step_range),
            k_range: strategy.uses_k().then_some(config.k_range),
            metrics: config.metrics.clone(),
        },
        points,
        boundary,
        phase_transitions,
        confidences,
        summary,
    })
}

fn measure(
    original: &EmbeddingCollection,
    result: &CompressionResult,
    step: Option<f64>,
    k: Option<usize>,
    config: &ExperimentConfig,
) -> Result<(ExperimentPoint, SurfaceMetricPoint)> {
    let compressed = &result.compressed;
    let mut metrics = BTreeMap::new();
    let mut put = |name: &str, value: f64| {
        metrics.insert(name.to_string(), value);
    };

    let fidelity = FidelityMetrics::compute(original, compressed)?;
    put(names::LSI, fidelity.lsi);
    put(names::COSINE, fidelity.mean_cosine);
    put(names::ENERGY, fidelity.energy);
    put(names::SEMANTIC_EFFICIENCY, fidelity.semantic_efficiency);
    put(names::CENTROID_COUNT, result.centroid_count() as f64);
    put(names::COMPRESSION_RATIO, result.compression_ratio());
    let mut surface_point = SurfaceMetricPoint::from_fidelity(step, k, &fidelity);

    if config.wants(MetricKind::Distortion) {
        let d = DistortionMetrics::compute(original, compressed, &config.distortion)?;
        put(names::PAIRWISE_DISTORTION, d.pairwise_distortion);
        put(names::NEIGHBORHOOD_OVERLAP, d.neighborhood_overlap);
        put(names::COLLAPSE_RATIO, d.collapse_ratio);
        put(names::CLUSTER_DRIFT, d.cluster_drift);
        put(names::DENSITY_CHANGE, d.density_change);
        put(names::GEODESIC_DISTORTION, d.geodesic_distortion);
        surface_point = surface_point.with_distortion(d);
    }

    if config.wants(MetricKind::Topology) {
        let t = TopologyIndicators::compute(compressed, &config.topology)?;
        put(names::CYCLE_COUNT, t.cycle_count as f64);
        put(names::CLUSTER_ENTROPY, t.cluster_entropy);
        put(names::BOUNDARY_SHARPNESS, t.boundary_sharpness);
        put(names::DENSITY_VARIANCE, t.density_variance);
        put(names::GEODESIC_STRETCH, t.geodesic_stretch);
        put(names::COMPONENT_COUNT, t.component_count as f64);
    }

    if config.wants(MetricKind::Boundary) {
        let b = boundary_metrics(original, result, config)?;
        put(names::MSE_GLOBAL, b.mse_global);
        put(names::MSE_BOUNDARY, b.mse_boundary);
        put(names::MSE_BULK, b.mse_bulk);
        put(names::DELTA_BOUNDARY, b.delta_boundary);
        put(names::BOUNDARY_COUNT, b.boundary_count as f64);
    }

    Ok((ExperimentPoint { step, k, metrics }, surface_point))
}

/// Boundary/bulk split: the compressor's own partition if it made one, otherwise the
/// lowest-ambiguity fraction against the result's centroids.
fn boundary_metrics(
    original: &EmbeddingCollection,
    result: &CompressionResult,
    config: &ExperimentConfig,
) -> Result<BoundaryMseMetrics> {
    if let Some(partition) = &result.boundary {
        return BoundaryMseMetrics::compute(original, &result.compressed, &partition.key_set());
    }
    let scores = ambiguity_scores(original.vectors(), &result.centroids);
    let flags = classify_boundary(&scores, config.compressor.boundary.boundary_fraction);
    let keys: HashSet<&str> = original
        .keys()
        .iter()
        .zip(&flags)
        .filter(|(_, b)| **b)
        .map(|(k, _)| k.as_str())
        .collect();
    BoundaryMseMetrics::compute(original, &result.compressed, &keys)
}

fn summarize(points: &[ExperimentPoint], surface: &[SurfaceMetricPoint], config: &ExperimentConfig) -> ExperimentSummary {
    let best_point = points
        .iter()
        .fold(None, |best: Option<&ExperimentPoint>, p| match best {
            Some(b) if b.lsi() >= p.lsi() => Some(b),
            _ => Some(p),
        })
        .cloned();

    let stable: Vec<f64> = surface
        .iter()
        .filter(|p| config.zones.classify(p.lsi) == Zone::Stable)
        .map(|p| p.lsi)
        .collect();
    let stability_score = if stable.is_empty() {
        0.0
    } else {
        stable.iter().sum::<f64>() / stable.len() as f64
    };

    ExperimentSummary {
        total_points: points.len(),
        best_point,
        stability_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::CompressionStrategy;

    fn small() -> EmbeddingCollection {
        vec![
            ("a", vec![0.05, 0.0]),
            ("b", vec![0.1, 0.2]),
            ("c", vec![1.0, 1.1]),
            ("d", vec![0.9, 1.0]),
            ("e", vec![2.0, 0.1]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn grid_sweep_records_no_k() {
        let config = ExperimentConfig::new(CompressionStrategy::Grid).with_step_range(0.1, 0.5, 3);
        let r = run_experiment(&small(), &config).unwrap();
        assert_eq!(r.points.len(), 3);
        assert!(r.points.iter().all(|p| p.k.is_none() && p.step.is_some()));
        assert!(r.metadata.k_range.is_none());
        assert_eq!(r.summary.total_points, 3);
        assert!(r.boundary.is_none());
    }

    #[test]
    fn kmeans_sweep_records_no_step() {
        let config = ExperimentConfig::new(CompressionStrategy::KMeans).with_k_range(1.0, 5.0, 3);
        let r = run_experiment(&small(), &config).unwrap();
        assert_eq!(r.points.iter().map(|p| p.k).collect::<Vec<_>>(), vec![Some(1), Some(3), Some(5)]);
        assert!(r.points.iter().all(|p| p.step.is_none()));
        // k = n is lossless
        assert!((r.points[2].lsi() - 1.0).abs() < 1e-9);
        assert_eq!(r.summary.best_point.as_ref().unwrap().k, Some(5));
    }

    #[test]
    fn only_requested_suites_are_computed() {
        let config = ExperimentConfig::new(CompressionStrategy::KMeansGrid)
            .with_step_range(0.2, 0.2, 1)
            .with_k_range(2.0, 2.0, 1)
            .with_metrics([MetricKind::Boundary]);
        let r = run_experiment(&small(), &config).unwrap();
        let p = &r.points[0];
        assert!(p.metric(names::MSE_GLOBAL).is_some());
        assert!(p.metric(names::PAIRWISE_DISTORTION).is_none());
        assert!(p.metric(names::CYCLE_COUNT).is_none());
        assert_eq!(p.metric(names::BOUNDARY_COUNT), Some(1.0));
    }

    #[test]
    fn analysis_is_attached_on_request() {
        let config = ExperimentConfig::new(CompressionStrategy::BoundaryAware)
            .with_step_range(0.1, 0.5, 3)
            .with_k_range(2.0, 3.0, 2)
            .with_metrics([MetricKind::Distortion])
            .with_stability_analysis(true);
        let r = run_experiment(&small(), &config).unwrap();
        assert_eq!(r.points.len(), 6);
        assert_eq!(r.confidences.as_ref().unwrap().len(), 6);
        assert!(r.phase_transitions.is_some());
        let boundary = r.boundary.as_ref().unwrap();
        assert_eq!(boundary.ridge_line.len(), 3);
    }

    fn surface(lsis: &[f64]) -> (Vec<ExperimentPoint>, Vec<SurfaceMetricPoint>) {
        lsis.iter()
            .enumerate()
            .map(|(i, &lsi)| {
                let step = 0.1 * (i + 1) as f64;
                let mut metrics = BTreeMap::new();
                metrics.insert(names::LSI.to_string(), lsi);
                let point = ExperimentPoint {
                    step: Some(step),
                    k: Some(2),
                    metrics,
                };
                (point, crate::stability::point(step, 2, lsi))
            })
            .unzip()
    }

    #[test]
    fn stability_score_averages_stable_points() {
        let config = ExperimentConfig::default();
        let (points, surface) = surface(&[0.9, 0.7, 0.5, 0.3, 0.1]);
        let summary = summarize(&points, &surface, &config);
        assert_eq!(summary.total_points, 5);
        // 0.9, 0.7 and 0.5 are stable
        assert!((summary.stability_score - 0.7).abs() < 1e-12);
        assert_eq!(summary.best_point.unwrap().lsi(), 0.9);
    }

    #[test]
    fn stability_score_is_zero_without_stable_points() {
        let config = ExperimentConfig::default();
        let (points, surface) = surface(&[0.45, 0.3, 0.1]);
        let summary = summarize(&points, &surface, &config);
        assert_eq!(summary.stability_score, 0.0);
        assert_eq!(summary.best_point.unwrap().lsi(), 0.45);
    }

    #[test]
    fn fails_fast_on_invalid_input() {
        let config = ExperimentConfig::default();
        assert_eq!(
            run_experiment(&EmbeddingCollection::new(), &config).err(),
            Some(TesseraError::EmptyCollection)
        );
        let mut ragged = small();
        ragged.insert("f", vec![1.0]);
        assert!(matches!(
            run_experiment(&ragged, &config),
            Err(TesseraError::DimensionMismatch { .. })
        ));
        let zero_steps = config.with_step_range(0.1, 0.2, 0);
        assert!(matches!(
            run_experiment(&small(), &zero_steps),
            Err(TesseraError::InvalidParameter(_))
        ));
    }
}

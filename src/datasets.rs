//! Deterministic synthetic collections for tests, benches and quick experiments.
//!
//! All generators are seeded (`StdRng::seed_from_u64`), so the same arguments always
//! give the same collection. Gaussian noise uses the Box-Muller transform.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::collection::EmbeddingCollection;
use crate::error::{Result, TesseraError};

/// One standard normal sample.
fn gaussian(rng: &mut StdRng) -> f64 {
    // 1 − u keeps the log argument in (0, 1].
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

fn check_spread(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(TesseraError::InvalidParameter(format!(
            "{name} must be finite and non-negative, got {value}"
        )));
    }
    Ok(())
}

/// `n` points around `clusters` centers drawn uniformly from `[-2, 2]^dim`.
///
/// Each cluster gets `n / clusters` points; the first `n % clusters` clusters get one
/// extra. Keys are `c{cluster}_{i}`, emitted cluster by cluster.
pub fn gaussian_clusters(n: usize, clusters: usize, dim: usize, spread: f32, seed: u64) -> Result<EmbeddingCollection> {
    if clusters == 0 || dim == 0 {
        return Err(TesseraError::InvalidParameter(
            "clusters and dimension must be greater than 0".to_string(),
        ));
    }
    check_spread("spread", spread)?;
    let mut rng = StdRng::seed_from_u64(seed);

    let centers: Vec<Vec<f64>> = (0..clusters)
        .map(|_| (0..dim).map(|_| rng.random_range(-2.0..=2.0)).collect())
        .collect();

    let base = n / clusters;
    let extra = n % clusters;
    let mut collection = EmbeddingCollection::with_capacity(n);
    for (c, center) in centers.iter().enumerate() {
        let size = base + usize::from(c < extra);
        for i in 0..size {
            let v = center
                .iter()
                .map(|&x| (x + gaussian(&mut rng) * spread as f64) as f32)
                .collect();
            collection.insert(format!("c{c}_{i}"), v);
        }
    }
    Ok(collection)
}

/// `n` points evenly spaced on a circle of `radius` in the plane, with Gaussian noise.
pub fn ring(n: usize, radius: f32, noise: f32, seed: u64) -> Result<EmbeddingCollection> {
    check_spread("noise", noise)?;
    let mut rng = StdRng::seed_from_u64(seed);
    Ok((0..n)
        .map(|i| {
            let t = i as f64 / n as f64 * std::f64::consts::TAU;
            let x = radius as f64 * t.cos() + gaussian(&mut rng) * noise as f64;
            let y = radius as f64 * t.sin() + gaussian(&mut rng) * noise as f64;
            (format!("r{i}"), vec![x as f32, y as f32])
        })
        .collect())
}

/// The classic 3-D swiss roll: `t ∈ [1.5π, 4.5π]`, `(t cos t, h, t sin t)`, `h ∈ [0, 21]`.
pub fn swiss_roll(n: usize, noise: f32, seed: u64) -> Result<EmbeddingCollection> {
    check_spread("noise", noise)?;
    let mut rng = StdRng::seed_from_u64(seed);
    Ok((0..n)
        .map(|i| {
            let t = 1.5 * std::f64::consts::PI * (1.0 + 2.0 * rng.random::<f64>());
            let h = 21.0 * rng.random::<f64>();
            let v = [t * t.cos(), h, t * t.sin()]
                .iter()
                .map(|&x| (x + gaussian(&mut rng) * noise as f64) as f32)
                .collect();
            (format!("s{i}"), v)
        })
        .collect())
}

/// Copy of `collection` with independent Gaussian noise (std `sigma`) on every component.
pub fn perturb(collection: &EmbeddingCollection, sigma: f32, seed: u64) -> Result<EmbeddingCollection> {
    check_spread("sigma", sigma)?;
    let mut rng = StdRng::seed_from_u64(seed);
    Ok(collection.map_vectors(|_, v| {
        v.iter()
            .map(|&x| (x as f64 + gaussian(&mut rng) * sigma as f64) as f32)
            .collect()
    }))
}

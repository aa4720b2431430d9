//! Uniform grid quantizer.

use crate::error::{Result, TesseraError};

/// Snap a single value onto the grid.
///
/// Rounds half away from zero. The `+ 0.0` folds `-0.0` into `0.0` so snapped vectors
/// compare and serialize uniformly.
#[inline]
#[must_use]
pub fn snap_value(value: f32, step: f32) -> f32 {
    (value / step).round() * step + 0.0
}

/// Snap every component of `v` onto the grid of spacing `step`.
#[inline]
#[must_use]
pub fn snap_to_grid(v: &[f32], step: f32) -> Vec<f32> {
    v.iter().map(|&x| snap_value(x, step)).collect()
}

/// A grid step must be finite and strictly positive.
pub fn validate_step(step: f32) -> Result<()> {
    if !step.is_finite() || step <= 0.0 {
        return Err(TesseraError::InvalidParameter(format!(
            "grid step must be finite and > 0, got {step}"
        )));
    }
    Ok(())
}

/// Grid quantizer with a validated step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridQuantizer {
    step: f32,
}

impl GridQuantizer {
    pub fn new(step: f32) -> Result<Self> {
        validate_step(step)?;
        Ok(Self { step })
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    /// Quantizer on a grid `ratio` times as fine (or coarse).
    pub fn scaled(&self, ratio: f32) -> Result<Self> {
        Self::new(self.step * ratio)
    }

    #[must_use]
    pub fn quantize(&self, v: &[f32]) -> Vec<f32> {
        snap_to_grid(v, self.step)
    }
}

//! Discrete value sets and their base probability vectors.
//!
//! Ordinal and categorical draws, unbiased or group-tilted, all go through
//! `draw`, so a probability vector is validated in exactly one place.

use crate::{
    error::{SimError, SimResult},
    rng::SimRng,
};
use rand::distributions::WeightedIndex;

/// Ordinal scale values.
pub const ORDINAL_LEVELS: [i64; 5] = [1, 2, 3, 4, 5];
pub const ORDINAL_WEIGHTS: [f64; 5] = [0.1, 0.2, 0.4, 0.2, 0.1];

/// Categorical levels, in probability-vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Low, Level::Medium, Level::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

pub const CATEGORICAL_WEIGHTS: [f64; 3] = [0.3, 0.4, 0.3];

/// Multiplicative tilt of `base` by `factor`, renormalized to sum to 1.
/// `None` when the tilted vector has no positive, finite mass or a negative
/// entry.
pub fn tilt(base: &[f64], factor: f64) -> Option<Vec<f64>> {
    let tilted: Vec<f64> = base.iter().map(|p| p * factor).collect();
    let total: f64 = tilted.iter().sum();
    if !total.is_finite() || total <= 0.0 || tilted.iter().any(|p| *p < 0.0) {
        return None;
    }
    Some(tilted.into_iter().map(|p| p / total).collect())
}

/// Draw `n` values from `levels` with probabilities `weights`.
pub fn draw<T: Clone>(
    rng: &mut SimRng,
    levels: &[T],
    weights: &[f64],
    n: usize,
    stage: &'static str,
    key: &str,
) -> SimResult<Vec<T>> {
    let dist = WeightedIndex::new(weights)
        .map_err(|e| SimError::config(stage, key, format!("invalid probability vector: {e}")))?;
    let picks: Vec<usize> = rng.sample_n(&dist, n);
    Ok(picks.into_iter().map(|i| levels[i].clone()).collect())
}

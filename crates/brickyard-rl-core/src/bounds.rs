//! Per-dimension closed intervals shared by action and observation spaces

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{RLError, Result};

/// Axis-aligned box `[low[i], high[i]]` over flat `f64` vectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Inclusive lower edge per dimension
    pub low: Vec<f64>,
    /// Inclusive upper edge per dimension
    pub high: Vec<f64>,
}

impl Bounds {
    /// Checked constructor; both edges must have the same length and
    /// `low <= high` everywhere
    pub fn new(low: Vec<f64>, high: Vec<f64>) -> Result<Self> {
        if low.len() != high.len() {
            return Err(RLError::DimensionMismatch {
                expected: low.len(),
                actual: high.len(),
            });
        }
        if let Some(i) = low.iter().zip(&high).position(|(l, h)| l > h) {
            return Err(RLError::Environment(format!(
                "bounds inverted at dimension {i}: {} > {}",
                low[i], high[i]
            )));
        }
        Ok(Self { low, high })
    }

    /// Every dimension in `[low, high]`
    #[must_use]
    pub fn uniform(dim: usize, low: f64, high: f64) -> Self {
        Self {
            low: vec![low; dim],
            high: vec![high; dim],
        }
    }

    /// Number of dimensions
    #[must_use]
    pub fn dim(&self) -> usize {
        self.low.len()
    }

    /// Append one dimension
    pub fn push(&mut self, low: f64, high: f64) {
        self.low.push(low);
        self.high.push(high);
    }

    /// Append every dimension of `other`
    pub fn extend(&mut self, other: &Self) {
        self.low.extend_from_slice(&other.low);
        self.high.extend_from_slice(&other.high);
    }

    /// Draw a point uniformly; degenerate dimensions return `low`
    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        self.low
            .iter()
            .zip(&self.high)
            .map(|(&l, &h)| if h > l { rng.gen_range(l..h) } else { l })
            .collect()
    }

    /// Whether `point` has the right length and lies inside the box
    #[must_use]
    pub fn contains(&self, point: &[f64]) -> bool {
        point.len() == self.dim()
            && point
                .iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(x, (l, h))| (l..=h).contains(&x))
    }
}

//! Scalar rewards

use std::iter::Sum;
use std::ops::Add;

use serde::{Deserialize, Serialize};

/// Reward for one step
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reward(pub f64);

impl Reward {
    /// Success-only reward: `1.0` on the step that reaches the goal, else `0.0`
    #[must_use]
    pub fn sparse(success: bool) -> Self {
        Self(f64::from(u8::from(success)))
    }

    /// Raw value
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for Reward {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl Add for Reward {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Reward {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse() {
        assert_eq!(Reward::sparse(true), Reward(1.0));
        assert_eq!(Reward::sparse(false).value(), 0.0);
    }

    #[test]
    fn test_episode_return_sums_steps() {
        let total: Reward = [false, false, true].into_iter().map(Reward::sparse).sum();
        assert_eq!(total, Reward(1.0));
        assert_eq!(total + Reward(0.5), Reward::from(1.5));
    }
}

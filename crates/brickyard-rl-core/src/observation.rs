//! Observations and observation spaces

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::Bounds;

/// What the agent sees after a reset or a step
pub trait Observation: Clone + Debug + Send + Sync {
    /// Flat feature vector fed to a policy
    fn features(&self) -> &[f64];

    /// Tensor shape of [`Observation::features`]
    fn shape(&self) -> Vec<usize> {
        vec![self.features().len()]
    }
}

/// Set of observations an environment can emit
pub trait ObservationSpace: Send + Sync {
    /// Observation type in this space
    type Observation: Observation;

    /// Random observation inside the space
    fn sample(&self) -> Self::Observation;

    /// Whether `obs` fits the space
    fn contains(&self, obs: &Self::Observation) -> bool;

    /// Tensor shape of every observation
    fn shape(&self) -> Vec<usize>;
}

/// Flat vector of features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorObservation {
    /// Feature values
    pub data: Vec<f64>,
}

impl Observation for VectorObservation {
    fn features(&self) -> &[f64] {
        &self.data
    }
}

/// Bounded box of vector observations with an optional multi-dim shape
#[derive(Debug, Clone)]
pub struct BoxObservationSpace {
    bounds: Bounds,
    shape: Vec<usize>,
}

impl BoxObservationSpace {
    /// Shape the flat `bounds` into `shape`; the element counts must agree
    pub fn new(bounds: Bounds, shape: Vec<usize>) -> crate::Result<Self> {
        let elements: usize = shape.iter().product();
        if elements != bounds.dim() {
            return Err(crate::RLError::DimensionMismatch {
                expected: elements,
                actual: bounds.dim(),
            });
        }
        Ok(Self { bounds, shape })
    }

    /// One-dimensional space over `bounds`
    #[must_use]
    pub fn flat(bounds: Bounds) -> Self {
        let shape = vec![bounds.dim()];
        Self { bounds, shape }
    }

    /// Per-feature limits
    #[must_use]
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }
}

impl ObservationSpace for BoxObservationSpace {
    type Observation = VectorObservation;

    fn sample(&self) -> Self::Observation {
        VectorObservation {
            data: self.bounds.sample_with(&mut rand::thread_rng()),
        }
    }

    fn contains(&self, obs: &Self::Observation) -> bool {
        self.bounds.contains(&obs.data)
    }

    fn shape(&self) -> Vec<usize> {
        self.shape.clone()
    }
}

//! Actions and the spaces they are drawn from

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

/// Something an agent can send to an environment
pub trait Action: Clone + Debug + Send + Sync {
    /// Flat numeric encoding, the layout a policy network emits
    fn encode(&self) -> Vec<f64>;
}

/// Set of legal actions for one environment
pub trait ActionSpace: Send + Sync {
    /// Action type this space produces
    type Action: Action;

    /// Uniform random action, used by random-agent rollouts
    fn sample(&self) -> Self::Action;

    /// Whether `action` is legal here
    fn contains(&self, action: &Self::Action) -> bool;

    /// Length of [`Action::encode`], when fixed
    fn dim(&self) -> Option<usize>;
}

/// Raw policy output before it is decoded into a typed action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuousAction(pub Vec<f64>);

impl Action for ContinuousAction {
    fn encode(&self) -> Vec<f64> {
        self.0.clone()
    }
}

impl From<Vec<f64>> for ContinuousAction {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

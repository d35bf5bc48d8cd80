//! Privileged simulator state attached to steps

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

/// Full simulator state, which may carry more than the agent observes
pub trait State: Clone + Debug + Send + Sync {
    /// Flat feature vector
    fn features(&self) -> &[f64];

    /// Whether the episode has ended in this state
    fn is_terminal(&self) -> bool {
        false
    }
}

/// How an episode stands after a step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    /// Still running
    #[default]
    No,
    /// Goal reached
    Yes,
    /// Cut short by the step limit or a broken simulation
    Truncated,
}

impl Terminal {
    /// Classify a step outcome; reaching the goal wins over truncation
    #[must_use]
    pub fn from_flags(done: bool, truncated: bool) -> Self {
        if done {
            Self::Yes
        } else if truncated {
            Self::Truncated
        } else {
            Self::No
        }
    }

    /// `Yes` or `Truncated`
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self != Self::No
    }
}

/// State as a flat vector plus its terminal flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorState {
    /// Feature values
    pub data: Vec<f64>,
    /// Episode status in this state
    pub terminal: Terminal,
}

impl State for VectorState {
    fn features(&self) -> &[f64] {
        &self.data
    }

    fn is_terminal(&self) -> bool {
        self.terminal.is_terminal()
    }
}

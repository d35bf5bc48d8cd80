//! Core reinforcement learning traits and types for Brickyard
//!
//! This crate provides the environment-facing abstractions shared by the
//! block manipulation tasks: the async [`Environment`] trait, step and
//! episode bookkeeping, bounded action and observation spaces, sparse
//! rewards, and the error type every layer reports through.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod bounds;
pub mod environment;
pub mod error;
pub mod observation;
pub mod reward;
pub mod state;

// Re-export core traits and types
pub use action::{Action, ActionSpace, ContinuousAction};
pub use bounds::Bounds;
pub use environment::{Environment, EnvironmentConfig, Episode, Step, StepInfo};
pub use error::{RLError, Result};
pub use observation::{BoxObservationSpace, Observation, ObservationSpace, VectorObservation};
pub use reward::Reward;
pub use state::{State, Terminal, VectorState};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Action, ActionSpace, Bounds, Environment, EnvironmentConfig, Observation, ObservationSpace, Result, Reward,
        State, Step, StepInfo,
    };
}

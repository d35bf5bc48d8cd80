//! Block manipulation environments for Brickyard
//!
//! This crate provides:
//! - A [`Scene`] contract for the physics side of an environment
//! - Goal strings (`"2b1l2r"`) parsed into stacks of levels and built
//!   procedurally with rejection sampling
//! - Geometric predicates that verify a goal against live object poses
//! - Task environments (block stacking, adjacency, houses, goal structures)
//! - [`KinematicScene`], an in-memory scene for tests and demos

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod footprint;
pub mod goal;
pub mod predicates;
pub mod registry;
pub mod scene;
pub mod sim;
pub mod tasks;

// Re-export the domain types
pub use footprint::Footprint;
pub use goal::{
    build_structure, parse_and_build, parse_goal, CategoryCounts, GeneratedStructure, GeneratorConfig, GoalToken,
    ParsedGoal, Stack,
};
pub use predicates::{check_stack, house_building_4, stack_adjacency, verify_structure, Tolerances};
pub use registry::{list_envs, make_env, register_env, DynBlockEnv, EnvRegistry};
pub use scene::{ObjectId, ObjectKind, ObjectState, Pose, PrimitiveAction, Scene, Workspace};
pub use sim::KinematicScene;
pub use tasks::blocks::{BlockAdjacentEnv, BlockStackingEnv};
pub use tasks::goal_structure::GoalStructureEnv;
pub use tasks::house::HouseBuilding4Env;
pub use tasks::{BlockEnv, BlockEnvConfig, GoalMode, Task};

// Re-export core types
pub use brickyard_rl_core::{
    Action, ActionSpace, Bounds, Environment, EnvironmentConfig, Episode, Observation, ObservationSpace, RLError,
    Reward, State, Step,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        make_env, parse_and_build, BlockEnvConfig, GoalMode, GoalStructureEnv, KinematicScene, PrimitiveAction, Scene,
    };
    pub use brickyard_rl_core::prelude::*;
}

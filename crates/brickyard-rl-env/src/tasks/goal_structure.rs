//! Tasks described by a goal string

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use brickyard_rl_core::{RLError, Result};

use super::{BlockEnv, BlockEnvConfig, Task};
use crate::goal::{build_structure, parse_goal, CategoryCounts, GeneratedStructure, ParsedGoal, PADDING_ORDER};
use crate::predicates::{on_ground, verify_structure, Tolerances};
use crate::scene::{ObjectState, Scene};

/// Direction of a goal structure task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalMode {
    /// Parts start scattered; assemble the structure
    #[default]
    Construct,
    /// The structure starts built; put every object on the table
    Deconstruct,
}

/// Build or tear down the structure named by a goal string such as `"2b1l2r"`
#[derive(Debug, Clone)]
pub struct GoalStructureTask {
    goal: ParsedGoal,
    mode: GoalMode,
    last_build: Option<GeneratedStructure>,
}

impl GoalStructureTask {
    /// Parse the goal up front so a bad string fails before any episode
    pub fn new(goal: &str, mode: GoalMode) -> Result<Self> {
        Ok(Self {
            goal: parse_goal(goal)?,
            mode,
            last_build: None,
        })
    }

    /// The parsed goal
    #[must_use]
    pub fn goal(&self) -> &ParsedGoal {
        &self.goal
    }

    /// Construct or deconstruct
    #[must_use]
    pub fn mode(&self) -> GoalMode {
        self.mode
    }

    /// Structure built by the latest deconstruct reset
    #[must_use]
    pub fn last_build(&self) -> Option<&GeneratedStructure> {
        self.last_build.as_ref()
    }

    /// Parts to scatter for a construct episode
    fn parts(&self, with_padding: bool) -> CategoryCounts {
        let mut parts = self.goal.counts;
        if with_padding {
            let extra = CategoryCounts::CANONICAL.saturating_sub(&parts);
            for kind in PADDING_ORDER {
                parts.add(kind, extra.get(kind));
            }
        }
        parts
    }
}

impl Task for GoalStructureTask {
    const NAME: &'static str = "goal_structure";

    fn from_config(config: &BlockEnvConfig) -> Result<Self> {
        let goal = config
            .goal
            .as_deref()
            .ok_or_else(|| RLError::Environment("goal_structure needs a goal string".to_string()))?;
        Self::new(goal, config.goal_mode)
    }

    fn populate(&mut self, scene: &mut dyn Scene, rng: &mut StdRng, config: &BlockEnvConfig) -> Result<()> {
        match self.mode {
            GoalMode::Construct => {
                let parts = self.parts(config.with_padding);
                for kind in PADDING_ORDER {
                    let count = parts.get(kind);
                    if count > 0 {
                        scene.generate_shapes(kind, count, config.random_orientation)?;
                    }
                }
                debug!(goal = %self.goal.goal, objects = parts.total(), "parts scattered");
            }
            GoalMode::Deconstruct => {
                self.last_build = None;
                let built = build_structure(&self.goal.goal, scene, rng, &config.generator())?;
                self.last_build = Some(built);
            }
        }
        Ok(())
    }

    fn check(&self, objects: &[ObjectState], tol: &Tolerances) -> bool {
        match self.mode {
            GoalMode::Construct => verify_structure(&self.goal.stack, objects, tol),
            GoalMode::Deconstruct => !objects.is_empty() && objects.iter().all(|o| on_ground(o, tol)),
        }
    }

    fn object_count(&self, config: &BlockEnvConfig) -> Option<usize> {
        Some(self.parts(config.with_padding).total())
    }
}

/// Goal structure environment
pub type GoalStructureEnv<S> = BlockEnv<S, GoalStructureTask>;

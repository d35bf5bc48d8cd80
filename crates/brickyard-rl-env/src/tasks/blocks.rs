//! Single-kind block tasks: stacking and side-by-side rows

use rand::rngs::StdRng;

use brickyard_rl_core::{RLError, Result};

use super::{BlockEnv, BlockEnvConfig, Task};
use crate::predicates::{check_stack, stack_adjacency, Tolerances};
use crate::scene::{ObjectKind, ObjectState, Scene};

/// Stack every object into a single tower
#[derive(Debug, Clone)]
pub struct BlockStackingTask {
    kind: ObjectKind,
    count: usize,
    random_orientation: bool,
}

impl BlockStackingTask {
    /// Kind of the objects to stack
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }
}

impl Task for BlockStackingTask {
    const NAME: &'static str = "block_stacking";

    fn from_config(config: &BlockEnvConfig) -> Result<Self> {
        match config.object_type {
            ObjectKind::Cube | ObjectKind::Cylinder => Ok(Self {
                kind: config.object_type,
                count: config.num_objects,
                random_orientation: config.random_orientation,
            }),
            other => Err(RLError::Environment(format!(
                "block stacking supports cube or cylinder objects, not {other}"
            ))),
        }
    }

    fn populate(&mut self, scene: &mut dyn Scene, _rng: &mut StdRng, _config: &BlockEnvConfig) -> Result<()> {
        scene.generate_shapes(self.kind, self.count, self.random_orientation)?;
        Ok(())
    }

    fn check(&self, objects: &[ObjectState], tol: &Tolerances) -> bool {
        check_stack(objects, tol)
    }
}

/// Line every cube up in one row on the table
#[derive(Debug, Clone)]
pub struct BlockAdjacentTask {
    count: usize,
    random_orientation: bool,
}

impl Task for BlockAdjacentTask {
    const NAME: &'static str = "block_adjacent";

    fn from_config(config: &BlockEnvConfig) -> Result<Self> {
        Ok(Self {
            count: config.num_objects,
            random_orientation: config.random_orientation,
        })
    }

    fn populate(&mut self, scene: &mut dyn Scene, _rng: &mut StdRng, _config: &BlockEnvConfig) -> Result<()> {
        scene.generate_shapes(ObjectKind::Cube, self.count, self.random_orientation)?;
        Ok(())
    }

    fn check(&self, objects: &[ObjectState], tol: &Tolerances) -> bool {
        stack_adjacency(objects, tol)
    }
}

/// Block stacking environment
pub type BlockStackingEnv<S> = BlockEnv<S, BlockStackingTask>;

/// Block adjacency environment
pub type BlockAdjacentEnv<S> = BlockEnv<S, BlockAdjacentTask>;

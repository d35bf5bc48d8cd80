//! Environment registry for creating block tasks by name

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use brickyard_rl_core::{Environment, EnvironmentConfig, RLError, Result, VectorObservation, VectorState};

use crate::scene::{PrimitiveAction, Scene};
use crate::tasks::{BlockAdjacentTask, BlockEnv, BlockStackingTask, GoalStructureTask, HouseBuilding4Task, Task};

/// Any block environment behind a trait object
pub type DynBlockEnv =
    Box<dyn Environment<Observation = VectorObservation, Action = PrimitiveAction, State = VectorState>>;

type EnvConstructor = Box<dyn Fn(EnvironmentConfig, Box<dyn Scene>) -> Result<DynBlockEnv> + Send + Sync>;

lazy_static::lazy_static! {
    static ref REGISTRY: Mutex<EnvRegistry> = Mutex::new(EnvRegistry::with_builtin());
}

/// Named environment constructors
#[derive(Default)]
pub struct EnvRegistry {
    envs: HashMap<String, EnvConstructor>,
}

impl EnvRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every task shipped with this crate
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register_task::<BlockStackingTask>();
        registry.register_task::<BlockAdjacentTask>();
        registry.register_task::<HouseBuilding4Task>();
        registry.register_task::<GoalStructureTask>();
        registry
    }

    /// Register an environment, replacing any previous one with that name
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(EnvironmentConfig, Box<dyn Scene>) -> Result<DynBlockEnv> + Send + Sync + 'static,
    {
        self.envs.insert(name.into(), Box::new(constructor));
    }

    /// Register a task under its own name
    pub fn register_task<T: Task + 'static>(&mut self) {
        self.register(T::NAME, |config, scene| {
            let env = BlockEnv::<Box<dyn Scene>, T>::new(scene, &config)?;
            Ok(Box::new(env) as DynBlockEnv)
        });
    }

    /// Create an environment by name on top of `scene`
    pub fn make(&self, name: &str, config: EnvironmentConfig, scene: Box<dyn Scene>) -> Result<DynBlockEnv> {
        self.envs
            .get(name)
            .ok_or_else(|| RLError::Environment(format!("Unknown environment: {name}")))
            .and_then(|constructor| constructor(config, scene))
    }

    /// Registered names, sorted
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.envs.keys().cloned().collect();
        names.sort();
        names
    }
}

fn registry() -> MutexGuard<'static, EnvRegistry> {
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Register an environment globally
pub fn register_env<F>(name: impl Into<String>, constructor: F)
where
    F: Fn(EnvironmentConfig, Box<dyn Scene>) -> Result<DynBlockEnv> + Send + Sync + 'static,
{
    registry().register(name, constructor);
}

/// Create an environment by name
pub fn make_env(name: &str, config: EnvironmentConfig, scene: Box<dyn Scene>) -> Result<DynBlockEnv> {
    registry().make(name, config, scene)
}

/// List all registered environments
pub fn list_envs() -> Vec<String> {
    registry().list()
}

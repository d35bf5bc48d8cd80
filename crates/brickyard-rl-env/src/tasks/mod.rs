//! Block manipulation task environments
//!
//! Every task shares one episode lifecycle, implemented by [`BlockEnv`]:
//! the task only decides what to put on the table and when the goal is
//! reached.

pub mod blocks;
pub mod goal_structure;
pub mod house;

use std::f64::consts::PI;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use brickyard_rl_core::{
    ActionSpace, Bounds, BoxObservationSpace, Environment, EnvironmentConfig, Episode, ObservationSpace, RLError, Result,
    Reward, Step, StepInfo, Terminal, VectorObservation, VectorState,
};

use crate::goal::GeneratorConfig;
use crate::predicates::Tolerances;
use crate::scene::{ObjectKind, ObjectState, PrimitiveAction, PrimitiveActionSpace, Scene, Workspace};

pub use blocks::{BlockAdjacentTask, BlockStackingTask};
pub use goal_structure::{GoalMode, GoalStructureTask};
pub use house::HouseBuilding4Task;

/// Steps per episode when the environment config does not say
pub const DEFAULT_MAX_STEPS: usize = 10;

/// Values per object slot in the observation: x, y, z, yaw
const SLOT_WIDTH: usize = 4;

/// Task parameters, read from [`EnvironmentConfig::params`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockEnvConfig {
    /// Table bounds
    pub workspace: Workspace,
    /// Edge of a unit block
    pub block_size: f64,
    /// Scatter objects with a random yaw
    pub random_orientation: bool,
    /// Objects spawned by the stacking and adjacency tasks
    pub num_objects: usize,
    /// Object kind for the stacking task, cube or cylinder
    pub object_type: ObjectKind,
    /// Goal string for the goal structure task
    pub goal: Option<String>,
    /// Top the scene up with distractors
    pub with_padding: bool,
    /// Scene setups tried before a reset gives up
    pub max_reset_attempts: usize,
    /// Simulation steps after every action
    pub settle_steps: usize,
    /// Object slots in the observation
    pub max_objects: usize,
    /// Predicate thresholds; `block_size` here is overridden by the field above
    pub tolerances: Tolerances,
    /// Keep bottom pairs whose spacing missed the window
    pub accept_fallback_pairs: bool,
    /// Build or tear down the goal structure
    pub goal_mode: GoalMode,
}

impl Default for BlockEnvConfig {
    fn default() -> Self {
        Self {
            workspace: Workspace::default(),
            block_size: 0.03,
            random_orientation: false,
            num_objects: 1,
            object_type: ObjectKind::Cube,
            goal: None,
            with_padding: true,
            max_reset_attempts: 100,
            settle_steps: 100,
            max_objects: 8,
            tolerances: Tolerances::default(),
            accept_fallback_pairs: false,
            goal_mode: GoalMode::Construct,
        }
    }
}

impl BlockEnvConfig {
    /// Predicate thresholds at this config's unit size
    #[must_use]
    pub fn tolerances(&self) -> Tolerances {
        Tolerances {
            block_size: self.block_size,
            ..self.tolerances
        }
    }

    /// Generator settings derived from this config
    #[must_use]
    pub fn generator(&self) -> GeneratorConfig {
        GeneratorConfig {
            block_size: self.block_size,
            with_padding: self.with_padding,
            random_orientation: self.random_orientation,
            accept_fallback_pairs: self.accept_fallback_pairs,
            ..GeneratorConfig::default()
        }
    }
}

/// What distinguishes one block task from another
pub trait Task: Send + Sync {
    /// Registry name
    const NAME: &'static str;

    /// Build the task from its parameters, rejecting invalid ones up front
    fn from_config(config: &BlockEnvConfig) -> Result<Self>
    where
        Self: Sized;

    /// Put the episode's objects into a freshly reset scene.
    ///
    /// Recoverable errors make the environment reset the scene and call
    /// this again.
    fn populate(&mut self, scene: &mut dyn Scene, rng: &mut StdRng, config: &BlockEnvConfig) -> Result<()>;

    /// Whether the objects satisfy the goal
    fn check(&self, objects: &[ObjectState], tol: &Tolerances) -> bool;

    /// Most objects one episode can put on the table, when known up front
    fn object_count(&self, _config: &BlockEnvConfig) -> Option<usize> {
        None
    }
}

/// Episode lifecycle shared by all block tasks
pub struct BlockEnv<S, T> {
    scene: S,
    task: T,
    config: BlockEnvConfig,
    max_steps: usize,
    rng: StdRng,
    steps: usize,
    episode: Option<Episode>,
}

impl<S: Scene, T: Task> BlockEnv<S, T> {
    /// Create the environment from a generic config
    pub fn new(scene: S, env_config: &EnvironmentConfig) -> Result<Self> {
        let config: BlockEnvConfig = env_config.params_as()?;
        let task = T::from_config(&config)?;
        Ok(Self::with_task(scene, task, config, env_config.seed, env_config.max_steps))
    }

    /// Create the environment from an already built task
    pub fn with_task(
        scene: S,
        task: T,
        mut config: BlockEnvConfig,
        seed: Option<u64>,
        max_steps: Option<usize>,
    ) -> Self {
        if let Some(needed) = task.object_count(&config) {
            config.max_objects = config.max_objects.max(needed);
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            scene,
            task,
            config,
            max_steps: max_steps.unwrap_or(DEFAULT_MAX_STEPS),
            rng,
            steps: 0,
            episode: None,
        }
    }

    /// The scene
    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// The scene, mutably
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    /// The task
    pub fn task(&self) -> &T {
        &self.task
    }

    /// Task parameters
    pub fn config(&self) -> &BlockEnvConfig {
        &self.config
    }

    /// Steps taken in the current episode
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Whether the goal currently holds
    pub fn is_goal_reached(&self) -> bool {
        !self.scene.is_holding() && self.task.check(&self.scene.objects(), &self.config.tolerances())
    }

    fn observation_len(&self) -> usize {
        1 + SLOT_WIDTH * self.config.max_objects
    }

    fn observe(&self) -> VectorObservation {
        let mut data = vec![0.0; self.observation_len()];
        data[0] = if self.scene.is_holding() { 1.0 } else { 0.0 };

        let objects = self.scene.objects();
        if objects.len() > self.config.max_objects {
            warn!(
                objects = objects.len(),
                slots = self.config.max_objects,
                "observation truncated"
            );
        }
        for (slot, object) in data[1..].chunks_mut(SLOT_WIDTH).zip(&objects) {
            let p = object.position();
            slot.copy_from_slice(&[p.x, p.y, p.z, object.yaw()]);
        }
        VectorObservation { data }
    }
}

#[async_trait]
impl<S: Scene, T: Task> Environment for BlockEnv<S, T> {
    type Observation = VectorObservation;
    type Action = PrimitiveAction;
    type State = VectorState;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        let ws = &self.config.workspace;
        // Empty slots are zero, so every bound includes zero
        let slot_low = [ws.x[0].min(0.0), ws.y[0].min(0.0), 0.0, -PI];
        let slot_high = [ws.x[1].max(0.0), ws.y[1].max(0.0), ws.z[1], PI];

        let slot = Bounds {
            low: slot_low.to_vec(),
            high: slot_high.to_vec(),
        };

        let mut bounds = Bounds::uniform(1, 0.0, 1.0);
        for _ in 0..self.config.max_objects {
            bounds.extend(&slot);
        }
        Box::new(BoxObservationSpace::flat(bounds))
    }

    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
        Box::new(PrimitiveActionSpace::new(&self.config.workspace))
    }

    async fn reset(&mut self) -> Result<(Self::Observation, StepInfo)> {
        let mut last_error = None;

        for attempt in 1..=self.config.max_reset_attempts {
            self.scene.reset()?;
            match self.task.populate(&mut self.scene, &mut self.rng, &self.config) {
                Ok(()) => {
                    if attempt > 1 {
                        info!(task = T::NAME, attempt, "scene generated after retries");
                    }
                    self.steps = 0;
                    self.episode = Some(Episode::begin(attempt));
                    let info = StepInfo::default()
                        .with("task", T::NAME)
                        .with("reset_attempts", attempt)
                        .with("objects", self.scene.objects().len());
                    return Ok((self.observe(), info));
                }
                Err(e) if e.is_recoverable() => {
                    debug!(task = T::NAME, attempt, error = %e, "scene generation failed");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        let attempts = self.config.max_reset_attempts;
        warn!(task = T::NAME, attempts, "giving up on reset");
        Err(RLError::ResetExhausted {
            attempts,
            last_error: last_error.map_or_else(|| "no attempts allowed".to_string(), |e| e.to_string()),
        })
    }

    async fn step(&mut self, action: Self::Action) -> Result<Step<Self::Observation, Self::State>> {
        if self.episode.is_none() {
            return Err(RLError::Environment("step called before reset".to_string()));
        }

        self.scene.take_action(&action)?;
        self.scene.wait(self.config.settle_steps);
        let observation = self.observe();

        let done = self.is_goal_reached();
        let sim_valid = self.scene.is_sim_valid();
        let truncated = !done && (self.steps >= self.max_steps || !sim_valid);
        self.steps += 1;

        let step = Step {
            state: Some(VectorState {
                data: observation.data.clone(),
                terminal: Terminal::from_flags(done, truncated),
            }),
            observation,
            reward: Reward::sparse(done),
            done,
            truncated,
            info: StepInfo::default()
                .with("step", self.steps)
                .with("holding", self.scene.is_holding())
                .with("sim_valid", sim_valid),
        };
        if let Some(episode) = self.episode.as_mut() {
            episode.record(&step);
        }
        Ok(step)
    }

    fn episode_info(&self) -> Option<Episode> {
        self.episode.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::KinematicScene;

    fn stacking(seed: u64, max_steps: usize) -> BlockEnv<KinematicScene, BlockStackingTask> {
        let config = EnvironmentConfig {
            seed: Some(seed),
            max_steps: Some(max_steps),
            ..EnvironmentConfig::default()
        }
        .with_param("num_objects", 2);
        BlockEnv::new(KinematicScene::seeded(seed), &config).unwrap()
    }

    #[test]
    fn test_config_defaults_from_empty_params() {
        let config: BlockEnvConfig = EnvironmentConfig::default().params_as().unwrap();
        assert_eq!(config.num_objects, 1);
        assert_eq!(config.object_type, ObjectKind::Cube);
        assert_eq!(config.max_reset_attempts, 100);
        assert_eq!(config.goal_mode, GoalMode::Construct);
        assert!(config.with_padding);
    }

    #[test]
    fn test_tolerances_follow_block_size() {
        let config: BlockEnvConfig = EnvironmentConfig::default()
            .with_param("block_size", 0.05)
            .params_as()
            .unwrap();
        assert!((config.tolerances().block_size - 0.05).abs() < f64::EPSILON);
        assert!((config.generator().block_size - 0.05).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_step_before_reset_fails() {
        let mut env = stacking(1, 5);
        let result = env.step(PrimitiveAction::pick(0.5, 0.0, 0.0, 0.0)).await;
        assert!(matches!(result, Err(RLError::Environment(_))));
    }

    #[tokio::test]
    async fn test_observation_layout() {
        let mut env = stacking(3, 5);
        let (obs, info) = env.reset().await.unwrap();

        assert_eq!(obs.data.len(), 1 + 4 * 8);
        assert_eq!(obs.data[0], 0.0);
        assert_eq!(info.get("objects"), Some(&serde_json::json!(2)));
        // Two occupied slots, the rest zero
        assert!(obs.data[1..9].iter().any(|v| *v != 0.0));
        assert!(obs.data[9..].iter().all(|v| *v == 0.0));
        assert!(env.observation_space().contains(&obs));
    }

    #[tokio::test]
    async fn test_truncates_after_max_steps() {
        let mut env = stacking(4, 2);
        env.reset().await.unwrap();

        // Placing with an empty gripper does nothing
        let idle = PrimitiveAction::place(0.5, 0.0, 0.0, 0.0);
        let first = env.step(idle).await.unwrap();
        let second = env.step(idle).await.unwrap();
        let third = env.step(idle).await.unwrap();

        assert!(!first.truncated && !second.truncated);
        assert!(third.truncated);
        assert!(!third.done);
        assert_eq!(third.reward, Reward(0.0));

        let episode = env.episode_info().unwrap();
        assert!(episode.truncated);
        assert_eq!(episode.steps, 3);
    }

    #[tokio::test]
    async fn test_reset_gives_up_on_crowded_table() {
        let tiny = Workspace {
            x: [0.0, 0.02],
            y: [0.0, 0.02],
            z: [0.0, 0.2],
        };
        let config = BlockEnvConfig {
            workspace: tiny,
            max_reset_attempts: 3,
            ..BlockEnvConfig::default()
        };
        let task = BlockStackingTask::from_config(&config).unwrap();
        let mut env = BlockEnv::with_task(KinematicScene::new(tiny, 0.03, 0), task, config, Some(0), None);

        match env.reset().await {
            Err(RLError::ResetExhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected reset to give up, got {other:?}"),
        }
    }

    /// Spawns one cube per attempt and fails the first `failures` attempts
    struct FlakyLayout {
        failures: usize,
        objects_before: Vec<usize>,
    }

    impl Task for FlakyLayout {
        const NAME: &'static str = "flaky_layout";

        fn from_config(_config: &BlockEnvConfig) -> Result<Self> {
            Ok(Self {
                failures: 1,
                objects_before: Vec::new(),
            })
        }

        fn populate(&mut self, scene: &mut dyn Scene, _rng: &mut StdRng, _config: &BlockEnvConfig) -> Result<()> {
            self.objects_before.push(scene.objects().len());
            scene.generate_shapes(ObjectKind::Cube, 1, false)?;
            if self.failures > 0 {
                self.failures -= 1;
                return Err(RLError::sampling_exhausted("flaky layout", 1));
            }
            Ok(())
        }

        fn check(&self, _objects: &[ObjectState], _tol: &Tolerances) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_reset_discards_failed_attempt_and_retries() {
        let config = BlockEnvConfig::default();
        let task = FlakyLayout::from_config(&config).unwrap();
        let mut env = BlockEnv::with_task(KinematicScene::seeded(5), task, config, Some(5), None);

        let (obs, info) = env.reset().await.unwrap();

        assert_eq!(env.task().objects_before, vec![0, 0]);
        assert_eq!(env.scene().objects().len(), 1);
        assert_eq!(info.get("reset_attempts"), Some(&serde_json::json!(2)));
        assert_eq!(info.get("objects"), Some(&serde_json::json!(1)));
        assert_eq!(env.episode_info().unwrap().reset_attempts, 2);
        assert!(obs.data[5..].iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn test_fatal_populate_error_is_not_retried() {
        let config = BlockEnvConfig {
            goal: Some("1b2r".to_string()),
            goal_mode: GoalMode::Deconstruct,
            ..BlockEnvConfig::default()
        };
        let task = GoalStructureTask::from_config(&config).unwrap();
        let mut env = BlockEnv::with_task(KinematicScene::seeded(2), task, config, Some(2), None);

        assert!(matches!(env.reset().await, Err(RLError::UnknownStructure { .. })));
        assert!(env.episode_info().is_none());
    }
}

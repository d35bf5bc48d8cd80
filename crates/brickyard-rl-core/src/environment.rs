//! The async environment contract and per-step and per-episode records

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Action, ActionSpace, Observation, ObservationSpace, Reward, State};

/// Outcome of one action
#[derive(Debug, Clone)]
pub struct Step<O, S> {
    /// What the agent sees after the action settled
    pub observation: O,
    /// Reward earned by this action
    pub reward: Reward,
    /// Whether the goal was reached
    pub done: bool,
    /// Whether the episode was cut short (step limit or broken simulation)
    pub truncated: bool,
    /// Diagnostics such as the step index or whether the gripper holds an object
    pub info: StepInfo,
    /// Privileged simulator state, when the environment exposes one
    pub state: Option<S>,
}

impl<O, S> Step<O, S> {
    /// Whether the episode is over for either reason
    pub fn is_last(&self) -> bool {
        self.done || self.truncated
    }
}

/// Free-form JSON diagnostics returned with resets and steps
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepInfo {
    /// Keyed values, flattened when serialized
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl StepInfo {
    /// Add a field, replacing any previous value under the same key
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Look up a field
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }
}

/// Running record of one episode, from reset to its last step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    /// Random v4 UUID
    pub id: String,
    /// Sum of step rewards so far
    pub total_reward: f64,
    /// Steps recorded so far
    pub steps: usize,
    /// Whether the goal was reached
    pub success: bool,
    /// Whether the last step was a truncation
    pub truncated: bool,
    /// How many scene setups it took to start this episode
    pub reset_attempts: usize,
    /// When the reset finished
    pub start_time: chrono::DateTime<chrono::Utc>,
    /// When the last step was recorded
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
}

impl Episode {
    /// Start a fresh episode
    #[must_use]
    pub fn begin(reset_attempts: usize) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            total_reward: 0.0,
            steps: 0,
            success: false,
            truncated: false,
            reset_attempts,
            start_time: chrono::Utc::now(),
            end_time: None,
        }
    }

    /// Fold a step into the running totals
    pub fn record<O, S>(&mut self, step: &Step<O, S>) {
        self.total_reward += step.reward.0;
        self.steps += 1;

        if step.is_last() && self.end_time.is_none() {
            self.success = step.done;
            self.truncated = step.truncated;
            self.end_time = Some(chrono::Utc::now());
        }
    }

    /// Whether the episode has ended
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }
}

/// Settings shared by every environment plus task-specific `params`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Seed for scene generation; `None` draws one from entropy
    pub seed: Option<u64>,
    /// Step limit before truncation
    pub max_steps: Option<usize>,
    /// Task parameters, such as `goal` for goal structures
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl EnvironmentConfig {
    /// Config with a fixed seed
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Set an environment specific parameter
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Decode the free-form parameters into a typed config.
    ///
    /// Missing keys fall back to the target's serde defaults.
    pub fn params_as<T: DeserializeOwned>(&self) -> crate::Result<T> {
        let value = serde_json::Value::Object(self.params.clone());
        Ok(serde_json::from_value(value)?)
    }
}

/// Episodic environment driven one action at a time
#[async_trait]
pub trait Environment: Send + Sync {
    /// What `reset` and `step` return to the agent
    type Observation: Observation;
    /// What the agent sends
    type Action: Action;
    /// Privileged state attached to steps
    type State: State;

    /// Limits of every observation
    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>>;

    /// Legal actions
    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>>;

    /// Start a new episode and return its first observation
    async fn reset(&mut self) -> crate::Result<(Self::Observation, StepInfo)>;

    /// Apply one action and report the outcome
    async fn step(&mut self, action: Self::Action) -> crate::Result<Step<Self::Observation, Self::State>>;

    /// Release the simulator
    async fn close(&mut self) -> crate::Result<()> {
        Ok(())
    }

    /// Record of the episode in progress, if any
    fn episode_info(&self) -> Option<Episode> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Terminal, VectorObservation, VectorState};

    fn step(reward: f64, done: bool, truncated: bool) -> Step<VectorObservation, VectorState> {
        Step {
            observation: VectorObservation { data: vec![0.0] },
            reward: Reward(reward),
            done,
            truncated,
            info: StepInfo::default(),
            state: Some(VectorState {
                data: vec![0.0],
                terminal: Terminal::No,
            }),
        }
    }

    #[test]
    fn test_episode_records_success() {
        let mut episode = Episode::begin(2);
        episode.record(&step(0.0, false, false));
        assert!(!episode.is_finished());

        episode.record(&step(1.0, true, false));
        assert!(episode.is_finished());
        assert!(episode.success);
        assert_eq!(episode.steps, 2);
        assert_eq!(episode.reset_attempts, 2);
        assert!((episode.total_reward - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_params_as_uses_defaults() {
        #[derive(Deserialize)]
        struct Params {
            #[serde(default)]
            num_objects: usize,
            goal: String,
        }

        let config = EnvironmentConfig::seeded(7).with_param("goal", "1b1b");
        let params: Params = config.params_as().unwrap();
        assert_eq!(params.goal, "1b1b");
        assert_eq!(params.num_objects, 0);

        let missing: crate::Result<Params> = EnvironmentConfig::default().params_as();
        assert!(missing.is_err());
    }

    #[test]
    fn test_config_flattens_params() {
        let json = r#"{"seed": 3, "max_steps": 10, "goal": "2b1l2r"}"#;
        let config: EnvironmentConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.max_steps, Some(10));
        assert_eq!(config.params["goal"], "2b1l2r");
    }
}

//! Demo: random pick/place agent on a goal structure task
//!
//! Run with `RUST_LOG=brickyard_rl_env=debug` to watch generation.

use brickyard_rl_core::{ActionSpace, Environment, EnvironmentConfig};
use brickyard_rl_env::{GoalStructureEnv, KinematicScene};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let goal = std::env::args().nth(1).unwrap_or_else(|| "2b1l2r".to_string());
    let config = EnvironmentConfig {
        seed: Some(0),
        max_steps: Some(50),
        ..EnvironmentConfig::default()
    }
    .with_param("goal", goal.as_str())
    .with_param("goal_mode", "deconstruct");

    let mut env = GoalStructureEnv::new(KinematicScene::seeded(0), &config)?;
    let action_space = env.action_space();

    let num_episodes = 5;
    let mut successes = 0;

    for episode in 0..num_episodes {
        let (_observation, info) = env.reset().await?;
        println!("Episode {}: {} objects on the table", episode + 1, info.get("objects").cloned().unwrap_or_default());

        loop {
            let step = env.step(action_space.sample()).await?;
            if step.is_last() {
                break;
            }
        }

        if let Some(summary) = env.episode_info() {
            if summary.success {
                successes += 1;
            }
            println!(
                "  steps = {}, reward = {:.1}, success = {}, reset attempts = {}",
                summary.steps, summary.total_reward, summary.success, summary.reset_attempts
            );
        }
    }

    println!("\nTore down '{goal}' in {successes}/{num_episodes} episodes");
    env.close().await?;

    Ok(())
}

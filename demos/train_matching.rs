//! Train seats on the matching game
//!
//! Runs the training driver end to end against the toy matching game, which
//! stands in for the real game backend. Pass a JSON training config to
//! override any default; without one a small two-seat PPO run is used.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example train_matching --release
//! cargo run --example train_matching --release -- train.json
//! RUST_LOG=debug cargo run --example train_matching
//! ```

use anyhow::Result;
use catan_rl::{
    checkpoint::DirectoryStore,
    env::{matching::MatchingGame, ActionSpace},
    policy::NetworkConfig,
    train::{PPOConfig, TrainingConfig, TrainingDriver},
};
use tracing_subscriber::EnvFilter;

fn default_config() -> Result<TrainingConfig> {
    Ok(TrainingConfig {
        agent_count: 2,
        n_games: 20,
        max_steps_per_game: 400,
        learn_every: 55,
        score_window: 10,
        action_space: ActionSpace::new(vec![6, 4, 4])?,
        seed: Some(0),
        ppo: PPOConfig::new().n_epochs(5).batch_size(11),
        ppo_network: NetworkConfig::actor_critic().hidden_dims(vec![64, 64]),
        ..TrainingConfig::default()
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => TrainingConfig::from_json_file(path)?,
        None => default_config()?,
    };

    tracing::info!("Matching game training");
    tracing::info!("  Algorithm: {:?}", config.algorithm);
    tracing::info!("  Seats: {}", config.agent_count);
    tracing::info!("  Action heads: {:?}", config.action_space.cardinalities());
    tracing::info!("  Games: {}", config.n_games);
    tracing::info!("  Checkpoints: {}", config.checkpoint_dir.display());

    let env = MatchingGame::new(config.action_space.clone(), config.agent_count, 1)
        .with_max_steps(config.max_steps_per_game);
    let store = DirectoryStore::new(config.checkpoint_dir.clone());
    let mut driver = TrainingDriver::new(config, env, store)?;

    let summaries = driver.run()?;
    for seat in 0..driver.seat_count() {
        tracing::info!(
            seat,
            average = driver.average_score(seat).unwrap_or_default(),
            best = driver.best_score(seat).unwrap_or_default(),
            "Final score"
        );
    }
    let total_steps: usize = summaries.iter().map(|s| s.steps).sum();
    tracing::info!(games = summaries.len(), total_steps, "Training complete");

    Ok(())
}

//! Training driver
//!
//! One [`TrainingDriver`] owns the environment, a checkpoint store, and one
//! learner per seat. It plays games to completion, scores every step with
//! the configured reward function, feeds experience to the acting seat's
//! learner, and checkpoints a seat whenever its moving-average score
//! improves.

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use super::{Agent, DqnAgent, DqnConfig, Experience, PPOConfig, PpoAgent};
use crate::{
    checkpoint::{CheckpointStore, LoadOutcome},
    env::{
        reward::{RewardContext, RewardFunction, ShapedReward, SuccessReward},
        ActionSpace, Environment, PlayerStats,
    },
    error::CoreError,
    policy::NetworkConfig,
};

/// Which learner every seat runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Clipped-surrogate policy optimization with GAE
    #[default]
    Ppo,
    /// Deep Q-learning with a replay buffer and target network
    Dqn,
}

/// Reward function selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RewardKind {
    /// 1.0 per accepted move
    #[default]
    Success,
    /// Dense building and victory-point shaping
    Shaped(ShapedReward),
}

impl RewardKind {
    /// Instantiate the reward function
    pub fn build(&self) -> Box<dyn RewardFunction> {
        match self {
            RewardKind::Success => Box::new(SuccessReward),
            RewardKind::Shaped(shaped) => Box::new(shaped.clone()),
        }
    }
}

/// Everything needed to run a training session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Learner used by every seat
    pub algorithm: Algorithm,

    /// Number of seats, one learner each
    pub agent_count: usize,

    /// How steps are scored
    pub reward: RewardKind,

    /// Games to play
    pub n_games: usize,

    /// Hard cap on actions per game
    pub max_steps_per_game: usize,

    /// Hard cap on seat changes per game
    pub max_turns: usize,

    /// A seat learns after every `learn_every` of its own steps
    pub learn_every: usize,

    /// Games in the moving-average score
    pub score_window: usize,

    /// Head layout the learners are built for
    pub action_space: ActionSpace,

    /// Directory for checkpoint files
    pub checkpoint_dir: PathBuf,

    /// Seed for network initialization and sampling
    pub seed: Option<u64>,

    /// PPO hyperparameters
    pub ppo: PPOConfig,

    /// DQN hyperparameters
    pub dqn: DqnConfig,

    /// Trunk for the PPO policy and value networks
    pub ppo_network: NetworkConfig,

    /// Trunk for the DQN Q networks
    pub dqn_network: NetworkConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Ppo,
            agent_count: 4,
            reward: RewardKind::Success,
            n_games: 1,
            max_steps_per_game: 20_000,
            max_turns: 5000,
            learn_every: 55,
            score_window: 100,
            action_space: ActionSpace::catan(),
            checkpoint_dir: PathBuf::from("models"),
            seed: None,
            ppo: PPOConfig::catan(),
            dqn: DqnConfig::default(),
            ppo_network: NetworkConfig::actor_critic(),
            dqn_network: NetworkConfig::q_network(),
        }
    }
}

impl TrainingConfig {
    /// Read a JSON config; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read training config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse training config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the driver settings and the selected learner's settings
    pub fn validate(&self) -> crate::error::Result<()> {
        let invalid = |msg: &str| Err(CoreError::InvalidConfig(msg.to_string()));

        if self.agent_count == 0 {
            return invalid("agent_count must be positive");
        }
        if self.max_steps_per_game == 0 {
            return invalid("max_steps_per_game must be positive");
        }
        if self.max_turns == 0 {
            return invalid("max_turns must be positive");
        }
        if self.learn_every == 0 {
            return invalid("learn_every must be positive");
        }
        if self.score_window == 0 {
            return invalid("score_window must be positive");
        }
        match self.algorithm {
            Algorithm::Ppo => {
                self.ppo.validate()?;
                self.ppo_network.validate()
            }
            Algorithm::Dqn => {
                self.dqn.validate()?;
                self.dqn_network.validate()
            }
        }
    }
}

/// Outcome of one game
#[derive(Debug, Clone, PartialEq)]
pub struct GameSummary {
    /// Zero-based game index
    pub game: usize,

    /// Actions taken
    pub steps: usize,

    /// Seat changes
    pub turns: usize,

    /// Summed reward per seat
    pub scores: Vec<f32>,

    /// Seats whose checkpoints were written after this game
    pub saved: Vec<usize>,
}

/// Per-seat learner plus its running score bookkeeping
struct Seat {
    agent: Box<dyn Agent>,
    id: String,
    steps: usize,
    history: Vec<f32>,
    best_average: Option<f32>,
}

/// Plays games and trains one learner per seat
pub struct TrainingDriver<E, S> {
    config: TrainingConfig,
    env: E,
    store: S,
    reward: Box<dyn RewardFunction>,
    seats: Vec<Seat>,
    games_played: usize,
}

impl<E: Environment, S: CheckpointStore> TrainingDriver<E, S> {
    /// Build the learners and restore any saved checkpoints
    ///
    /// Fails if the config is invalid or the environment's action heads
    /// differ from `config.action_space`.
    pub fn new(config: TrainingConfig, env: E, store: S) -> Result<Self> {
        config.validate()?;
        config.action_space.ensure_matches(&env.action_space())?;

        let obs_dim = env.observation_dim();
        let mut seats = Vec::with_capacity(config.agent_count);
        for index in 0..config.agent_count {
            let mut agent = build_agent(&config, obs_dim, index)
                .with_context(|| format!("Failed to build agent for seat {index}"))?;
            let id = index.to_string();
            match agent.load_models(&store, &id)? {
                LoadOutcome::Loaded => tracing::info!(seat = index, "Restored saved models"),
                LoadOutcome::NotFound => {
                    tracing::info!(seat = index, "No saved models, starting from scratch")
                }
            }
            seats.push(Seat { agent, id, steps: 0, history: Vec::new(), best_average: None });
        }

        tracing::info!(
            algorithm = ?config.algorithm,
            agents = config.agent_count,
            obs_dim,
            heads = config.action_space.num_heads(),
            "Training driver ready"
        );

        let reward = config.reward.build();
        Ok(Self { config, env, store, reward, seats, games_played: 0 })
    }

    /// Play `n_games` games
    pub fn run(&mut self) -> Result<Vec<GameSummary>> {
        (0..self.config.n_games).map(|_| self.play_game()).collect()
    }

    /// Play a single game to completion or until a step/turn cap is hit
    pub fn play_game(&mut self) -> Result<GameSummary> {
        let game = self.games_played;
        let seat_count = self.seats.len();
        let mut observation = self.env.reset().context("Failed to start a new game")?;
        let mut current = self.env.first_agent();

        let mut scores = vec![0.0_f32; seat_count];
        let mut previous: Vec<Option<PlayerStats>> = vec![None; seat_count];
        let mut failed_actions = vec![0_u32; seat_count];
        let mut steps = 0;
        let mut turns = 0;

        while steps < self.config.max_steps_per_game && turns < self.config.max_turns {
            ensure!(
                current < seat_count,
                "environment handed the move to seat {current}, but only {seat_count} seats exist"
            );
            let seat = &mut self.seats[current];

            let decision = seat.agent.act(&observation)?;
            let outcome = self
                .env
                .step(current, &decision.action)
                .with_context(|| format!("Step {steps} of game {game} failed"))?;

            let reward = self.reward.reward(&RewardContext {
                action: &decision.action,
                outcome: &outcome,
                previous: previous[current].as_ref(),
                failed_actions: failed_actions[current],
            });
            if outcome.successful {
                failed_actions[current] = 0;
            } else {
                failed_actions[current] += 1;
            }
            if let Some(stats) = outcome.stats {
                previous[current] = Some(stats);
            }
            scores[current] += reward;

            let next_observation = outcome.observation.clone();
            seat.agent.record(Experience {
                observation,
                decision,
                reward,
                next_observation: next_observation.clone(),
                done: outcome.done,
            })?;
            observation = next_observation;

            seat.steps += 1;
            if seat.steps % self.config.learn_every == 0 {
                seat.agent.learn().with_context(|| format!("Seat {current} failed to learn"))?;
            }

            steps += 1;
            if outcome.done {
                break;
            }
            if outcome.next_agent != current {
                turns += 1;
            }
            current = outcome.next_agent;
        }

        let saved = self.record_scores(&scores)?;
        self.games_played += 1;

        tracing::info!(game, steps, turns, ?scores, "Game finished");
        Ok(GameSummary { game, steps, turns, scores, saved })
    }

    fn record_scores(&mut self, scores: &[f32]) -> Result<Vec<usize>> {
        let window = self.config.score_window;
        let mut saved = Vec::new();

        for (index, (seat, &score)) in self.seats.iter_mut().zip(scores).enumerate() {
            seat.history.push(score);
            let average = moving_average(&seat.history, window);
            tracing::debug!(seat = index, score, average, "Score recorded");

            if seat.best_average.map_or(true, |best| average > best) {
                seat.best_average = Some(average);
                seat.agent.save_models(&mut self.store, &seat.id)?;
                tracing::info!(seat = index, average, "New best average score, models saved");
                saved.push(index);
            }
        }
        Ok(saved)
    }

    /// Game scores recorded for `seat`, oldest first
    pub fn score_history(&self, seat: usize) -> &[f32] {
        self.seats.get(seat).map(|s| s.history.as_slice()).unwrap_or_default()
    }

    /// Moving average over the last `score_window` games for `seat`
    pub fn average_score(&self, seat: usize) -> Option<f32> {
        let history = self.score_history(seat);
        (!history.is_empty()).then(|| moving_average(history, self.config.score_window))
    }

    /// Best moving average seen so far for `seat`
    pub fn best_score(&self, seat: usize) -> Option<f32> {
        self.seats.get(seat).and_then(|s| s.best_average)
    }

    /// Games completed
    pub fn games_played(&self) -> usize {
        self.games_played
    }

    /// Number of seats
    pub fn seat_count(&self) -> usize {
        self.seats.len()
    }

    /// Driver configuration
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// The environment
    pub fn env(&self) -> &E {
        &self.env
    }

    /// The checkpoint store
    pub fn store(&self) -> &S {
        &self.store
    }
}

fn build_agent(config: &TrainingConfig, obs_dim: usize, seat: usize) -> Result<Box<dyn Agent>> {
    let space = config.action_space.clone();
    let seed = config.seed.map(|seed| seed.wrapping_add(seat as u64));

    let agent: Box<dyn Agent> = match (config.algorithm, seed) {
        (Algorithm::Ppo, Some(seed)) => Box::new(PpoAgent::with_seed(
            obs_dim,
            space,
            config.ppo.clone(),
            &config.ppo_network,
            seed,
        )?),
        (Algorithm::Ppo, None) => {
            Box::new(PpoAgent::new(obs_dim, space, config.ppo.clone(), &config.ppo_network)?)
        }
        (Algorithm::Dqn, Some(seed)) => Box::new(DqnAgent::with_seed(
            obs_dim,
            space,
            config.dqn.clone(),
            &config.dqn_network,
            seed,
        )?),
        (Algorithm::Dqn, None) => {
            Box::new(DqnAgent::new(obs_dim, space, config.dqn.clone(), &config.dqn_network)?)
        }
    };
    Ok(agent)
}

fn moving_average(history: &[f32], window: usize) -> f32 {
    let start = history.len().saturating_sub(window);
    let recent = &history[start..];
    if recent.is_empty() {
        return 0.0;
    }
    recent.iter().sum::<f32>() / recent.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{checkpoint::MemoryStore, env::matching::MatchingGame};

    fn small_config(algorithm: Algorithm) -> TrainingConfig {
        TrainingConfig {
            algorithm,
            agent_count: 2,
            n_games: 2,
            max_steps_per_game: 12,
            learn_every: 4,
            score_window: 3,
            action_space: ActionSpace::new(vec![3, 2]).unwrap(),
            seed: Some(11),
            ppo: PPOConfig::new().n_epochs(2).batch_size(2),
            dqn: DqnConfig::default().batch_size(2).memory_size(64),
            ppo_network: NetworkConfig::actor_critic().hidden_dims(vec![8]),
            dqn_network: NetworkConfig::q_network().hidden_dims(vec![8]),
            ..TrainingConfig::default()
        }
    }

    fn game(config: &TrainingConfig) -> MatchingGame {
        MatchingGame::new(config.action_space.clone(), config.agent_count, 5).with_max_steps(12)
    }

    #[test]
    fn test_moving_average_window() {
        assert_eq!(moving_average(&[], 3), 0.0);
        assert_eq!(moving_average(&[1.0, 2.0], 3), 1.5);
        assert_eq!(moving_average(&[10.0, 1.0, 2.0, 3.0], 3), 2.0);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = TrainingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_turns, 5000);
        assert_eq!(config.learn_every, 55);
        assert_eq!(config.score_window, 100);
        assert_eq!(config.action_space, ActionSpace::catan());
    }

    #[test]
    fn test_config_validation() {
        let config = TrainingConfig { agent_count: 0, ..TrainingConfig::default() };
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));

        let config = TrainingConfig { learn_every: 0, ..TrainingConfig::default() };
        assert!(config.validate().is_err());

        let config = TrainingConfig {
            algorithm: Algorithm::Dqn,
            dqn: DqnConfig::default().batch_size(0),
            ..TrainingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.json");
        std::fs::write(
            &path,
            r#"{
                "algorithm": "dqn",
                "agent_count": 3,
                "reward": {"kind": "shaped", "accepted": 5.0},
                "action_space": [4, 4]
            }"#,
        )
        .unwrap();

        let config = TrainingConfig::from_json_file(&path).unwrap();
        assert_eq!(config.algorithm, Algorithm::Dqn);
        assert_eq!(config.agent_count, 3);
        assert_eq!(config.action_space.cardinalities(), &[4, 4]);
        match config.reward {
            RewardKind::Shaped(shaped) => {
                assert_eq!(shaped.accepted, 5.0);
                assert_eq!(shaped.rejected, ShapedReward::default().rejected);
            }
            RewardKind::Success => panic!("expected shaped reward"),
        }
    }

    #[test]
    fn test_missing_config_file() {
        assert!(TrainingConfig::from_json_file("/nonexistent/train.json").is_err());
    }

    #[test]
    fn test_action_space_mismatch_fails_fast() {
        let config = small_config(Algorithm::Ppo);
        let env = MatchingGame::new(ActionSpace::new(vec![3, 3]).unwrap(), 2, 0);

        let err = TrainingDriver::new(config, env, MemoryStore::new()).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::ActionSpaceMismatch { .. })
        ));
    }

    #[test]
    fn test_ppo_games_save_first_scores() {
        let config = small_config(Algorithm::Ppo);
        let env = game(&config);
        let mut driver = TrainingDriver::new(config, env, MemoryStore::new()).unwrap();

        let summaries = driver.run().unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(driver.games_played(), 2);
        assert!(summaries.iter().all(|s| s.steps <= 12));

        // The first game always establishes a best score
        assert_eq!(summaries[0].saved, vec![0, 1]);
        for seat in 0..2 {
            assert_eq!(driver.score_history(seat).len(), 2);
            assert!(driver.best_score(seat).is_some());
        }
        // Actor and critic for both seats
        assert_eq!(driver.store().len(), 4);
    }

    #[test]
    fn test_dqn_games_run() {
        let config = small_config(Algorithm::Dqn);
        let env = game(&config);
        let mut driver = TrainingDriver::new(config, env, MemoryStore::new()).unwrap();

        let summary = driver.play_game().unwrap();
        assert_eq!(summary.game, 0);
        assert_eq!(summary.scores.len(), 2);
        // Policy and target network for both seats
        assert_eq!(driver.store().len(), 4);
    }

    #[test]
    fn test_success_reward_scores_accepted_moves() {
        let config = small_config(Algorithm::Ppo);
        let env = game(&config);
        let mut driver = TrainingDriver::new(config, env, MemoryStore::new()).unwrap();

        let summary = driver.play_game().unwrap();
        let total: f32 = summary.scores.iter().sum();
        assert!(total >= 0.0);
        assert!(total <= summary.steps as f32);
        assert_eq!(driver.average_score(0), Some(summary.scores[0]));
    }
}

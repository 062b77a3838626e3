//! Training algorithms
//!
//! This module implements the learners (PPO and DQN), the common
//! [`Agent`] interface the training driver talks to, and the driver itself.

use crate::{
    buffer::{ReplayTransition, Transition},
    checkpoint::{CheckpointStore, LoadOutcome},
    error::Result,
};

pub mod driver;
pub mod dqn;
pub mod optim;
pub mod ppo;

pub use dqn::{DqnAgent, DqnConfig, DqnStats, TargetUpdate};
pub use driver::{Algorithm, GameSummary, RewardKind, TrainingConfig, TrainingDriver};
pub use optim::{LrSchedule, OptimizerKind, ScheduledOptimizer};
pub use ppo::{PPOConfig, PpoAgent, TrainingStats};

/// What an agent chose for one observation
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Action tuple, one value per head
    pub action: Vec<i64>,

    /// Log-probability of each head's choice (empty for value-based agents)
    pub log_probs: Vec<f32>,

    /// Value estimate of the observation (0.0 for value-based agents)
    pub value: f32,
}

/// One step of experience as seen by the driver
#[derive(Debug, Clone)]
pub struct Experience {
    /// Observation the decision was made from
    pub observation: Vec<f32>,

    /// The decision that was executed
    pub decision: Decision,

    /// Scalar reward for the step
    pub reward: f32,

    /// Observation returned by the environment
    pub next_observation: Vec<f32>,

    /// Whether the game ended
    pub done: bool,
}

/// Learner interface used by the training driver
pub trait Agent {
    /// Decide on an action for `observation`
    fn act(&mut self, observation: &[f32]) -> Result<Decision>;

    /// Record the outcome of the last decision
    fn record(&mut self, experience: Experience) -> Result<()>;

    /// Update parameters from recorded experience, if there is enough of it
    fn learn(&mut self) -> Result<()>;

    /// Persist every network under `agent_id`
    fn save_models(&self, store: &mut dyn CheckpointStore, agent_id: &str) -> Result<()>;

    /// Restore every network for `agent_id`
    fn load_models(&mut self, store: &dyn CheckpointStore, agent_id: &str) -> Result<LoadOutcome>;
}

impl Agent for PpoAgent {
    fn act(&mut self, observation: &[f32]) -> Result<Decision> {
        self.choose_action(observation)
    }

    fn record(&mut self, experience: Experience) -> Result<()> {
        self.remember(Transition {
            observation: experience.observation,
            action: experience.decision.action,
            log_probs: experience.decision.log_probs,
            value: experience.decision.value,
            reward: experience.reward,
            done: experience.done,
        })
    }

    fn learn(&mut self) -> Result<()> {
        if self.buffer().is_empty() {
            return Ok(());
        }
        PpoAgent::learn(self).map(|_| ())
    }

    fn save_models(&self, store: &mut dyn CheckpointStore, agent_id: &str) -> Result<()> {
        PpoAgent::save_models(self, store, agent_id)
    }

    fn load_models(&mut self, store: &dyn CheckpointStore, agent_id: &str) -> Result<LoadOutcome> {
        PpoAgent::load_models(self, store, agent_id)
    }
}

impl Agent for DqnAgent {
    fn act(&mut self, observation: &[f32]) -> Result<Decision> {
        let action = self.choose_action(observation)?;
        Ok(Decision { action, log_probs: Vec::new(), value: 0.0 })
    }

    fn record(&mut self, experience: Experience) -> Result<()> {
        self.remember(ReplayTransition {
            observation: experience.observation,
            action: experience.decision.action,
            reward: experience.reward,
            next_observation: experience.next_observation,
            done: experience.done,
        })
    }

    fn learn(&mut self) -> Result<()> {
        DqnAgent::learn(self).map(|_| ())
    }

    fn save_models(&self, store: &mut dyn CheckpointStore, agent_id: &str) -> Result<()> {
        DqnAgent::save_models(self, store, agent_id)
    }

    fn load_models(&mut self, store: &dyn CheckpointStore, agent_id: &str) -> Result<LoadOutcome> {
        DqnAgent::load_models(self, store, agent_id)
    }
}

//! DQN configuration and hyperparameters

use serde::{Deserialize, Serialize};

use crate::{
    error::{CoreError, Result},
    train::optim::OptimizerKind,
};

/// How the target network follows the online network
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetUpdate {
    /// Polyak averaging after every learn step
    Soft {
        /// Blend factor in (0, 1]
        tau: f64,
    },
    /// Full copy every `every` learn steps
    Hard {
        /// Learn steps between copies
        every: usize,
    },
}

/// DQN configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DqnConfig {
    /// Learning rate
    pub learning_rate: f64,

    /// Discount factor (gamma)
    pub gamma: f64,

    /// Replay batch size; learning waits until this many transitions exist
    pub batch_size: usize,

    /// Replay buffer capacity
    pub memory_size: usize,

    /// Exploration rate at step 0
    pub eps_start: f64,

    /// Exploration floor
    pub eps_min: f64,

    /// Exponential decay rate of ε per action taken
    pub eps_decay: f64,

    /// Target network update rule
    pub target_update: TargetUpdate,

    /// Every gradient component is clamped to `[-max_grad_value, max_grad_value]`
    pub max_grad_value: f64,

    /// Optimizer for the online network
    pub optimizer: OptimizerKind,
}

impl Default for DqnConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-4,
            gamma: 0.99,
            batch_size: 64,
            memory_size: 1_000_000,
            eps_start: 0.95,
            eps_min: 0.005,
            eps_decay: 1e-6,
            target_update: TargetUpdate::Soft { tau: 0.005 },
            max_grad_value: 1.0,
            optimizer: OptimizerKind::Adam,
        }
    }
}

impl DqnConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(CoreError::InvalidConfig(msg.to_string()));

        if self.learning_rate <= 0.0 {
            return invalid("learning_rate must be positive");
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return invalid("gamma must be in [0, 1]");
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be positive");
        }
        if self.memory_size < self.batch_size {
            return invalid("memory_size must hold at least one batch");
        }
        if !(0.0..=1.0).contains(&self.eps_start) || !(0.0..=1.0).contains(&self.eps_min) {
            return invalid("epsilon bounds must be in [0, 1]");
        }
        if self.eps_min > self.eps_start {
            return invalid("eps_min must not exceed eps_start");
        }
        if self.eps_decay < 0.0 {
            return invalid("eps_decay must be non-negative");
        }
        match self.target_update {
            TargetUpdate::Soft { tau } if tau <= 0.0 || tau > 1.0 => {
                return invalid("tau must be in (0, 1]");
            }
            TargetUpdate::Hard { every: 0 } => return invalid("hard update interval must be positive"),
            _ => {}
        }
        if self.max_grad_value <= 0.0 {
            return invalid("max_grad_value must be positive");
        }
        self.optimizer.validate()
    }

    /// Exploration rate after `steps` actions
    pub fn epsilon(&self, steps: u64) -> f64 {
        self.eps_min + (self.eps_start - self.eps_min) * (-(steps as f64) * self.eps_decay).exp()
    }

    /// Set learning rate
    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Set discount factor
    pub fn gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set replay batch size
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set replay capacity
    pub fn memory_size(mut self, size: usize) -> Self {
        self.memory_size = size;
        self
    }

    /// Set the exploration schedule
    pub fn epsilon_schedule(mut self, start: f64, min: f64, decay: f64) -> Self {
        self.eps_start = start;
        self.eps_min = min;
        self.eps_decay = decay;
        self
    }

    /// Set the target update rule
    pub fn target_update(mut self, update: TargetUpdate) -> Self {
        self.target_update = update;
        self
    }
}

//! PPO configuration and hyperparameters
//!
//! This module defines the configuration parameters for PPO training
//! and provides validation and builder pattern methods.

use serde::{Deserialize, Serialize};

use crate::{
    error::{CoreError, Result},
    train::optim::{LrSchedule, OptimizerKind},
};

/// PPO configuration parameters
///
/// These hyperparameters control the PPO training process. The defaults
/// give a total loss of `policy_loss + 0.5 * value_loss` with no entropy
/// bonus, and clip every gradient component to `[-1, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PPOConfig {
    /// Learning rate for policy and value function
    pub learning_rate: f64,

    /// Number of training epochs per learn call
    pub n_epochs: usize,

    /// Minibatch size for training
    pub batch_size: usize,

    /// Discount factor (gamma)
    pub gamma: f64,

    /// GAE lambda parameter
    pub gae_lambda: f64,

    /// PPO clipping parameter (epsilon)
    pub clip_range: f64,

    /// Value function loss coefficient
    pub vf_coef: f64,

    /// Entropy bonus coefficient
    pub ent_coef: f64,

    /// Every gradient component is clamped to `[-max_grad_value, max_grad_value]`
    pub max_grad_value: f64,

    /// Normalize advantages per minibatch before the policy loss
    pub normalize_advantages: bool,

    /// Optimizer used for both networks
    pub optimizer: OptimizerKind,

    /// Learning-rate schedule stepped after every minibatch
    pub lr_schedule: LrSchedule,
}

impl Default for PPOConfig {
    fn default() -> Self {
        Self {
            learning_rate: 3e-4,
            n_epochs: 10,
            batch_size: 64,
            gamma: 0.99,
            gae_lambda: 0.95,
            clip_range: 0.2,
            vf_coef: 0.5,
            ent_coef: 0.0,
            max_grad_value: 1.0,
            normalize_advantages: false,
            optimizer: OptimizerKind::Adam,
            lr_schedule: LrSchedule::Constant,
        }
    }
}

impl PPOConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings used for the game agents: SGD with momentum 0.9 on a
    /// triangular cyclic learning rate
    pub fn catan() -> Self {
        Self {
            optimizer: OptimizerKind::Sgd { momentum: 0.9 },
            lr_schedule: LrSchedule::catan_cyclic(),
            ..Self::default()
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(CoreError::InvalidConfig(msg.to_string()));

        if self.learning_rate <= 0.0 {
            return invalid("learning_rate must be positive");
        }
        if self.n_epochs == 0 {
            return invalid("n_epochs must be positive");
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be positive");
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return invalid("gamma must be in [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.gae_lambda) {
            return invalid("gae_lambda must be in [0, 1]");
        }
        if self.clip_range <= 0.0 {
            return invalid("clip_range must be positive");
        }
        if self.vf_coef < 0.0 {
            return invalid("vf_coef must be non-negative");
        }
        if self.ent_coef < 0.0 {
            return invalid("ent_coef must be non-negative");
        }
        if self.max_grad_value <= 0.0 {
            return invalid("max_grad_value must be positive");
        }
        self.optimizer.validate()?;
        self.lr_schedule.validate()
    }

    /// Set learning rate
    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Set number of training epochs
    pub fn n_epochs(mut self, epochs: usize) -> Self {
        self.n_epochs = epochs;
        self
    }

    /// Set minibatch size
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set discount factor
    pub fn gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set GAE lambda
    pub fn gae_lambda(mut self, lambda: f64) -> Self {
        self.gae_lambda = lambda;
        self
    }

    /// Set PPO clipping parameter
    pub fn clip_range(mut self, clip: f64) -> Self {
        self.clip_range = clip;
        self
    }

    /// Set value function loss coefficient
    pub fn vf_coef(mut self, coef: f64) -> Self {
        self.vf_coef = coef;
        self
    }

    /// Set entropy bonus coefficient
    pub fn ent_coef(mut self, coef: f64) -> Self {
        self.ent_coef = coef;
        self
    }

    /// Set gradient value clip
    pub fn max_grad_value(mut self, value: f64) -> Self {
        self.max_grad_value = value;
        self
    }

    /// Enable or disable per-minibatch advantage normalization
    pub fn normalize_advantages(mut self, enabled: bool) -> Self {
        self.normalize_advantages = enabled;
        self
    }

    /// Set the optimizer
    pub fn optimizer(mut self, optimizer: OptimizerKind) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Set the learning-rate schedule
    pub fn lr_schedule(mut self, schedule: LrSchedule) -> Self {
        self.lr_schedule = schedule;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PPOConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.learning_rate, 3e-4);
        assert_eq!(config.n_epochs, 10);
        assert_eq!(config.batch_size, 64);
        assert_eq!(config.clip_range, 0.2);
        assert_eq!(config.vf_coef, 0.5);
        assert_eq!(config.ent_coef, 0.0);
        assert_eq!(config.max_grad_value, 1.0);
    }

    #[test]
    fn test_config_validation() {
        // Valid config should pass
        let config = PPOConfig::new();
        assert!(config.validate().is_ok());

        // Invalid learning rate
        let config = PPOConfig::new().learning_rate(-1.0);
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));

        // Invalid gamma
        let config = PPOConfig::new().gamma(1.5);
        assert!(config.validate().is_err());

        // Invalid n_epochs
        let config = PPOConfig::new().n_epochs(0);
        assert!(config.validate().is_err());

        // Invalid batch_size
        let config = PPOConfig::new().batch_size(0);
        assert!(config.validate().is_err());

        // Invalid clip_range
        let config = PPOConfig::new().clip_range(-0.1);
        assert!(config.validate().is_err());

        // Invalid vf_coef (should allow 0.0)
        let config = PPOConfig::new().vf_coef(-0.1);
        assert!(config.validate().is_err());

        // Valid vf_coef = 0.0
        let config = PPOConfig::new().vf_coef(0.0);
        assert!(config.validate().is_ok());

        // Invalid schedule is caught too
        let config = PPOConfig::new().lr_schedule(LrSchedule::Cyclic {
            base_lr: 0.01,
            max_lr: 0.1,
            step_size_up: 0,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = PPOConfig::new()
            .learning_rate(1e-3)
            .n_epochs(5)
            .batch_size(128)
            .gamma(0.95)
            .clip_range(0.1);

        assert_eq!(config.learning_rate, 1e-3);
        assert_eq!(config.n_epochs, 5);
        assert_eq!(config.batch_size, 128);
        assert_eq!(config.gamma, 0.95);
        assert_eq!(config.clip_range, 0.1);

        // Other values should remain default
        assert_eq!(config.gae_lambda, 0.95);
        assert_eq!(config.vf_coef, 0.5);
    }

    #[test]
    fn test_catan_preset() {
        let config = PPOConfig::catan();
        assert!(config.validate().is_ok());
        assert_eq!(config.optimizer, OptimizerKind::Sgd { momentum: 0.9 });
        assert_eq!(config.lr_schedule, LrSchedule::catan_cyclic());
    }

    #[test]
    fn test_partial_json() {
        let config: PPOConfig = serde_json::from_str(r#"{"n_epochs": 3, "batch_size": 5}"#).unwrap();
        assert_eq!(config.n_epochs, 3);
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.gamma, 0.99);
    }
}

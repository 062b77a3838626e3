//! Optimizer and learning-rate schedule selection
//!
//! Both are plain serde enums so they can live in the training config file.

use serde::{Deserialize, Serialize};
use tch::nn::{self, OptimizerConfig};

use crate::error::{CoreError, Result};

/// Which optimizer updates a network
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizerKind {
    /// Adam with default betas
    #[default]
    Adam,
    /// Stochastic gradient descent with momentum
    Sgd {
        /// Momentum factor
        momentum: f64,
    },
}

impl OptimizerKind {
    /// Build an optimizer over every trainable variable of `vs`
    pub fn build(&self, vs: &nn::VarStore, learning_rate: f64) -> Result<nn::Optimizer> {
        let optimizer = match *self {
            OptimizerKind::Adam => nn::Adam::default().build(vs, learning_rate)?,
            OptimizerKind::Sgd { momentum } => {
                nn::Sgd { momentum, ..Default::default() }.build(vs, learning_rate)?
            }
        };
        Ok(optimizer)
    }

    /// Validate optimizer parameters
    pub fn validate(&self) -> Result<()> {
        if let OptimizerKind::Sgd { momentum } = *self {
            if !(0.0..1.0).contains(&momentum) {
                return Err(CoreError::InvalidConfig("SGD momentum must be in [0, 1)".into()));
            }
        }
        Ok(())
    }
}

/// How the learning rate evolves over optimizer steps
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LrSchedule {
    /// Keep the configured learning rate
    #[default]
    Constant,
    /// Triangular cyclic schedule between `base_lr` and `max_lr`
    Cyclic {
        /// Lower bound, used at step 0
        base_lr: f64,
        /// Upper bound, reached after `step_size_up` steps
        max_lr: f64,
        /// Steps in the increasing half of a cycle
        step_size_up: usize,
    },
}

impl LrSchedule {
    /// Schedule used for the game agents: 0.01 → 0.1 over 2000 steps
    pub fn catan_cyclic() -> Self {
        LrSchedule::Cyclic { base_lr: 0.01, max_lr: 0.1, step_size_up: 2000 }
    }

    /// Validate schedule parameters
    pub fn validate(&self) -> Result<()> {
        if let LrSchedule::Cyclic { base_lr, max_lr, step_size_up } = *self {
            if base_lr <= 0.0 || max_lr < base_lr {
                return Err(CoreError::InvalidConfig(
                    "cyclic schedule needs 0 < base_lr <= max_lr".into(),
                ));
            }
            if step_size_up == 0 {
                return Err(CoreError::InvalidConfig("step_size_up must be positive".into()));
            }
        }
        Ok(())
    }

    /// Learning rate after `step` optimizer steps
    pub fn learning_rate(&self, initial_lr: f64, step: usize) -> f64 {
        match *self {
            LrSchedule::Constant => initial_lr,
            LrSchedule::Cyclic { base_lr, max_lr, step_size_up } => {
                let half = step_size_up as f64;
                let cycle = (1.0 + step as f64 / (2.0 * half)).floor();
                let x = (step as f64 / half - 2.0 * cycle + 1.0).abs();
                base_lr + (max_lr - base_lr) * (1.0 - x).max(0.0)
            }
        }
    }
}

/// Optimizer paired with its schedule state
pub struct ScheduledOptimizer {
    optimizer: nn::Optimizer,
    schedule: LrSchedule,
    initial_lr: f64,
    steps: usize,
}

impl std::fmt::Debug for ScheduledOptimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledOptimizer")
            .field("schedule", &self.schedule)
            .field("learning_rate", &self.learning_rate())
            .field("steps", &self.steps)
            .finish()
    }
}

impl ScheduledOptimizer {
    /// Build `kind` over `vs`, starting at the schedule's step-0 rate
    pub fn new(
        kind: OptimizerKind,
        schedule: LrSchedule,
        vs: &nn::VarStore,
        learning_rate: f64,
    ) -> Result<Self> {
        kind.validate()?;
        schedule.validate()?;
        let start = schedule.learning_rate(learning_rate, 0);
        let optimizer = kind.build(vs, start)?;
        Ok(Self { optimizer, schedule, initial_lr: learning_rate, steps: 0 })
    }

    /// Clear accumulated gradients
    pub fn zero_grad(&mut self) {
        self.optimizer.zero_grad();
    }

    /// Clamp every gradient to `[-max, max]`
    pub fn clip_grad_value(&mut self, max: f64) {
        self.optimizer.clip_grad_value(max);
    }

    /// Apply one parameter update
    pub fn step(&mut self) {
        self.optimizer.step();
    }

    /// Advance the learning-rate schedule by one step
    pub fn step_schedule(&mut self) {
        self.steps += 1;
        let lr = self.learning_rate();
        self.optimizer.set_lr(lr);
    }

    /// Current learning rate
    pub fn learning_rate(&self) -> f64 {
        self.schedule.learning_rate(self.initial_lr, self.steps)
    }

    /// Schedule steps taken so far
    pub fn schedule_steps(&self) -> usize {
        self.steps
    }
}

//! # Catan RL
//!
//! PPO and DQN agents for a Catan-like board game, built on tch-rs.
//!
//! The crate is the learning core: a rollout buffer with GAE, a multi-head
//! categorical policy on a shared MLP trunk, a value network, the clipped
//! PPO update loop, a DQN learner, checkpointing, and a training driver that
//! plays games against any [`env::Environment`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use catan_rl::prelude::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let space = ActionSpace::new(vec![4, 3])?;
//! let config = TrainingConfig {
//!     agent_count: 2,
//!     action_space: space.clone(),
//!     ..TrainingConfig::default()
//! };
//! let env = MatchingGame::new(space, 2, 0);
//! let mut driver = TrainingDriver::new(config, env, MemoryStore::new())?;
//! driver.run()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Rollout and replay buffers
pub mod buffer;

/// Checkpoint storage for network parameters
pub mod checkpoint;

/// Compute placement
pub mod device;

/// Environment traits, reward functions, and the toy matching game
pub mod env;

/// Error types for the learning core
pub mod error;

/// Policy, value, and Q networks
pub mod policy;

/// Training algorithms (PPO, DQN) and the training driver
pub mod train;

pub use error::{CoreError, Result};

/// Prelude module for convenient imports
///
/// This module re-exports commonly used types and traits for convenience.
pub mod prelude {
    pub use crate::{
        buffer::{ReplayBuffer, RolloutBuffer, Transition},
        checkpoint::{CheckpointStore, DirectoryStore, LoadOutcome, MemoryStore},
        device::ComputeTarget,
        env::{
            matching::MatchingGame,
            reward::{RewardFunction, ShapedReward, SuccessReward},
            ActionSpace, Environment, StepResult,
        },
        error::CoreError,
        policy::{NetworkConfig, PolicyNetwork, ValueNetwork},
        train::{
            Agent, Algorithm, DqnAgent, DqnConfig, PPOConfig, PpoAgent, RewardKind,
            TrainingConfig, TrainingDriver,
        },
    };
}

/// Current version of catan-rl
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

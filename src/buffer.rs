//! Experience buffers
//!
//! - [`rollout`]: on-policy trajectory storage for PPO, cleared after every update
//! - [`replay`]: fixed-capacity experience replay for DQN

pub mod replay;
pub mod rollout;

pub use replay::{ReplayBuffer, ReplayTransition};
pub use rollout::{Minibatch, RolloutArrays, RolloutBuffer, Transition};

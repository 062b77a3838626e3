//! Deep Q-Network (DQN) agent for multi-discrete actions
//!
//! ```text
//! choose_action:  ε-greedy; greedy = argmax inside each head's Q segment
//! learn:          sample a replay batch
//!                 y = r + γ · max_a' Q_target(s')[head] · (1 - done)
//!                 Smooth-L1(Q(s)[head, a_head], y), one optimizer step
//!                 soft (τ) or periodic hard target update
//! ```
//!
//! # References
//!
//! - [Human-level control through deep reinforcement learning](https://www.nature.com/articles/nature14236)

pub mod agent;
pub mod config;

pub use agent::{DqnAgent, DqnStats, DQN_TARGET_CHECKPOINT};
pub use config::{DqnConfig, TargetUpdate};

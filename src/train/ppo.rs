//! Proximal Policy Optimization (PPO) algorithm
//!
//! PPO is a policy gradient method that uses a clipped surrogate objective
//! to keep each update close to the policy that collected the data.
//!
//! # Algorithm Overview
//!
//! ```text
//! Collect transitions with the current policy (PpoAgent::remember)
//! learn():
//!   1. Compute advantages over the whole rollout using GAE
//!   2. For n_epochs:
//!      a. Shuffle the rollout into minibatches
//!      b. Per minibatch: clipped multi-head policy loss + value loss
//!      c. One optimizer step on both networks
//!   3. Clear the rollout
//! ```
//!
//! # References
//!
//! - [Proximal Policy Optimization Algorithms](https://arxiv.org/abs/1707.06347)
//! - [High-Dimensional Continuous Control Using Generalized Advantage Estimation](https://arxiv.org/abs/1506.02438)

pub mod agent;
pub mod config;
pub mod loss;
pub mod stats;

pub use agent::PpoAgent;
pub use config::PPOConfig;
pub use loss::{compute_entropy_loss, compute_policy_loss, compute_value_loss};
pub use stats::TrainingStats;

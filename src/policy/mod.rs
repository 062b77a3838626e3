//! Policy and neural network wrappers
//!
//! This module provides the networks used by the agents, all built on
//! tch-rs:
//! - [`PolicyNetwork`]: shared trunk with one categorical head per action sub-dimension
//! - [`ValueNetwork`]: scalar state-value estimate
//! - [`QNetwork`]: concatenated per-head action values for DQN

use tch::{Device, Tensor};

use crate::error::{CoreError, Result};

pub mod actor;
pub mod critic;
pub mod q_network;
pub mod trunk;

pub use actor::{PolicyNetwork, ACTOR_CHECKPOINT};
pub use critic::{ValueNetwork, CRITIC_CHECKPOINT};
pub use q_network::{QNetwork, DQN_CHECKPOINT};
pub use trunk::{Activation, NetworkConfig};

/// Single observation as a `[1, obs_dim]` tensor on `device`
pub(crate) fn observation_tensor(observation: &[f32], obs_dim: usize, device: Device) -> Result<Tensor> {
    if observation.len() != obs_dim {
        return Err(CoreError::ShapeMismatch {
            what: "observation",
            expected: obs_dim,
            actual: observation.len(),
        });
    }
    Ok(Tensor::from_slice(observation).view([1, obs_dim as i64]).to_device(device))
}

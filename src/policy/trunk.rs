//! Shared fully-connected trunk
//!
//! Every network in the crate is a stack of dense layers with a nonlinearity
//! after each one, followed by a role-specific output projection.
//!
//! # Architecture
//!
//! ```text
//! Input (observations)
//!         |
//!   [Dense(h_0)] -> act
//!         |
//!        ...
//!         |
//!   [Dense(h_k)] -> act
//!         |
//!      features
//! ```

use serde::{Deserialize, Serialize};
use tch::nn::{self, Init};

use crate::{
    device::ComputeTarget,
    error::{CoreError, Result},
};

/// Nonlinearity applied after every hidden layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// Rectified linear unit
    ReLU,
    /// Hyperbolic tangent
    Tanh,
}

/// Configuration for network architecture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Width of each hidden layer, input side first
    pub hidden_dims: Vec<i64>,

    /// Hidden-layer nonlinearity
    pub activation: Activation,

    /// Orthogonal weight initialization instead of small Gaussian
    pub use_orthogonal_init: bool,

    /// Device the parameters are placed on
    pub compute_target: ComputeTarget,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::actor_critic()
    }
}

impl NetworkConfig {
    /// 600-600-300-256 ReLU trunk used by the policy and value networks
    pub fn actor_critic() -> Self {
        Self {
            hidden_dims: vec![600, 600, 300, 256],
            activation: Activation::ReLU,
            use_orthogonal_init: true,
            compute_target: ComputeTarget::Cpu,
        }
    }

    /// 1024-512-512 ReLU trunk used by the Q network
    pub fn q_network() -> Self {
        Self { hidden_dims: vec![1024, 512, 512], ..Self::actor_critic() }
    }

    /// Replace the hidden layer widths
    pub fn hidden_dims(mut self, dims: Vec<i64>) -> Self {
        self.hidden_dims = dims;
        self
    }

    /// Set the activation
    pub fn activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Set the compute target
    pub fn compute_target(mut self, target: ComputeTarget) -> Self {
        self.compute_target = target;
        self
    }

    /// Validate the layer layout
    pub fn validate(&self) -> Result<()> {
        if self.hidden_dims.is_empty() {
            return Err(CoreError::InvalidConfig("network needs at least one hidden layer".into()));
        }
        if let Some(layer) = self.hidden_dims.iter().position(|&d| d < 1) {
            return Err(CoreError::InvalidConfig(format!(
                "hidden layer {layer} has width {}",
                self.hidden_dims[layer]
            )));
        }
        Ok(())
    }

    /// Width of the trunk's output features
    pub fn feature_dim(&self) -> i64 {
        self.hidden_dims.last().copied().unwrap_or(0)
    }
}

/// Build the hidden stack under `path`
///
/// Layers are named `fc1`, `fc2`, ... so checkpoints stay readable.
pub(crate) fn build_trunk(path: &nn::Path, input_dim: i64, config: &NetworkConfig) -> nn::Sequential {
    let hidden_init = if config.use_orthogonal_init {
        Init::Orthogonal { gain: 2.0_f64.sqrt() }
    } else {
        Init::Randn { mean: 0.0, stdev: 0.01 }
    };
    let linear_config = nn::LinearConfig { ws_init: hidden_init, ..Default::default() };

    let activation = config.activation;
    let mut trunk = nn::seq();
    let mut in_dim = input_dim;
    for (i, &out_dim) in config.hidden_dims.iter().enumerate() {
        trunk = trunk
            .add(nn::linear(path / format!("fc{}", i + 1), in_dim, out_dim, linear_config))
            .add_fn(move |x| match activation {
                Activation::ReLU => x.relu(),
                Activation::Tanh => x.tanh(),
            });
        in_dim = out_dim;
    }
    trunk
}

/// Linear config for output projections (small gain keeps early outputs near zero)
pub(crate) fn output_linear_config(config: &NetworkConfig, gain: f64) -> nn::LinearConfig {
    let ws_init = if config.use_orthogonal_init {
        Init::Orthogonal { gain }
    } else {
        Init::Randn { mean: 0.0, stdev: 0.01 }
    };
    nn::LinearConfig { ws_init, ..Default::default() }
}

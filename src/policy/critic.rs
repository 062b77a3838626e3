//! State-value network

use tch::{
    nn::{self, Module},
    Device, Tensor,
};

use super::{
    observation_tensor,
    trunk::{build_trunk, output_linear_config, NetworkConfig},
};
use crate::{
    checkpoint::{load_var_store, save_var_store, CheckpointKey, CheckpointStore, LoadOutcome},
    error::{CoreError, Result},
};

/// Checkpoint name for value-network parameters
pub const CRITIC_CHECKPOINT: &str = "critic_torch_ppo";

/// Observation to scalar value estimate
pub struct ValueNetwork {
    vs: nn::VarStore,
    trunk: nn::Sequential,
    value_head: nn::Linear,
    obs_dim: usize,
    device: Device,
}

impl std::fmt::Debug for ValueNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueNetwork")
            .field("obs_dim", &self.obs_dim)
            .field("device", &self.device)
            .finish()
    }
}

impl ValueNetwork {
    /// Build a value network for `obs_dim`-wide observations
    pub fn new(obs_dim: usize, config: &NetworkConfig) -> Result<Self> {
        config.validate()?;
        if obs_dim == 0 {
            return Err(CoreError::InvalidConfig("observation dimension must be positive".into()));
        }

        let device = config.compute_target.resolve()?;
        tracing::info!(?device, "ValueNetwork using device");

        let vs = nn::VarStore::new(device);
        let root = vs.root();
        let trunk = build_trunk(&(&root / "trunk"), obs_dim as i64, config);
        let value_head =
            nn::linear(&root / "value", config.feature_dim(), 1, output_linear_config(config, 1.0));

        Ok(Self { vs, trunk, value_head, obs_dim, device })
    }

    /// Values `[B]` for observations `[B, obs_dim]`
    pub fn forward(&self, obs: &Tensor) -> Tensor {
        self.value_head.forward(&self.trunk.forward(obs)).squeeze_dim(-1)
    }

    /// Value of one observation, no gradients
    pub fn value(&self, observation: &[f32]) -> Result<f32> {
        let obs = observation_tensor(observation, self.obs_dim, self.device)?;
        let value = tch::no_grad(|| self.forward(&obs));
        Ok(value.double_value(&[0]) as f32)
    }

    /// Get the device this network is on
    pub fn device(&self) -> Device {
        self.device
    }

    /// Get reference to variable store (for optimizer creation)
    pub fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }

    /// Save parameters under `(critic_torch_ppo, agent_id)`
    pub fn save(&self, store: &mut dyn CheckpointStore, agent_id: &str) -> Result<()> {
        save_var_store(store, &CheckpointKey::new(CRITIC_CHECKPOINT, agent_id), &self.vs)
    }

    /// Restore parameters saved by [`ValueNetwork::save`]
    pub fn load(&mut self, store: &dyn CheckpointStore, agent_id: &str) -> Result<LoadOutcome> {
        load_var_store(store, &CheckpointKey::new(CRITIC_CHECKPOINT, agent_id), &mut self.vs)
    }
}

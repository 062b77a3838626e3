//! Multi-category Q network
//!
//! A single linear output covers every head: its columns are the heads'
//! action values concatenated in head order. Greedy selection takes the
//! argmax inside each head's segment.

use tch::{
    nn::{self, Module},
    Device, Kind, Tensor,
};

use super::{
    observation_tensor,
    trunk::{build_trunk, output_linear_config, NetworkConfig},
};
use crate::{
    checkpoint::{load_var_store, save_var_store, CheckpointKey, CheckpointStore, LoadOutcome},
    env::ActionSpace,
    error::{CoreError, Result},
};

/// Checkpoint name for Q-network parameters
pub const DQN_CHECKPOINT: &str = "dqn";

/// Q network over a multi-discrete action space
pub struct QNetwork {
    vs: nn::VarStore,
    trunk: nn::Sequential,
    q_head: nn::Linear,
    space: ActionSpace,
    offsets: Vec<i64>,
    obs_dim: usize,
    device: Device,
}

impl std::fmt::Debug for QNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QNetwork")
            .field("obs_dim", &self.obs_dim)
            .field("heads", &self.space.cardinalities())
            .field("device", &self.device)
            .finish()
    }
}

impl QNetwork {
    /// Build a Q network for `obs_dim`-wide observations over `space`
    pub fn new(obs_dim: usize, space: ActionSpace, config: &NetworkConfig) -> Result<Self> {
        config.validate()?;
        if obs_dim == 0 {
            return Err(CoreError::InvalidConfig("observation dimension must be positive".into()));
        }

        let device = config.compute_target.resolve()?;
        tracing::info!(?device, outputs = space.total_choices(), "QNetwork using device");

        let vs = nn::VarStore::new(device);
        let root = vs.root();
        let trunk = build_trunk(&(&root / "trunk"), obs_dim as i64, config);
        let q_head = nn::linear(
            &root / "q",
            config.feature_dim(),
            space.total_choices(),
            output_linear_config(config, 1.0),
        );
        let offsets = space.offsets();

        Ok(Self { vs, trunk, q_head, space, offsets, obs_dim, device })
    }

    /// Concatenated action values `[B, total_choices]`
    pub fn forward(&self, obs: &Tensor) -> Tensor {
        self.q_head.forward(&self.trunk.forward(obs))
    }

    /// Head `h`'s segment of `q` (`[B, n_h]`)
    pub fn head_values(&self, q: &Tensor, h: usize) -> Tensor {
        q.narrow(1, self.offsets[h], self.space.cardinalities()[h])
    }

    /// Per-head argmax action for one observation
    pub fn greedy_action(&self, observation: &[f32]) -> Result<Vec<i64>> {
        let obs = observation_tensor(observation, self.obs_dim, self.device)?;
        let q = tch::no_grad(|| self.forward(&obs));
        Ok((0..self.space.num_heads())
            .map(|h| self.head_values(&q, h).argmax(-1, false).int64_value(&[0]))
            .collect())
    }

    /// Q values of the taken actions, one column per head (`[B, H]`)
    pub fn action_values(&self, q: &Tensor, actions: &Tensor) -> Tensor {
        let columns: Vec<Tensor> = (0..self.space.num_heads())
            .map(|h| {
                let taken = actions.select(1, h as i64).unsqueeze(-1);
                self.head_values(q, h).gather(1, &taken, false).squeeze_dim(-1)
            })
            .collect();
        Tensor::stack(&columns, 1)
    }

    /// Best value within each head's segment (`[B, H]`)
    pub fn max_head_values(&self, q: &Tensor) -> Tensor {
        let columns: Vec<Tensor> = (0..self.space.num_heads())
            .map(|h| self.head_values(q, h).max_dim(-1, false).0)
            .collect();
        Tensor::stack(&columns, 1).to_kind(Kind::Float)
    }

    /// Overwrite every parameter with `source`'s
    pub fn copy_from(&mut self, source: &QNetwork) -> Result<()> {
        self.vs.copy(&source.vs)?;
        Ok(())
    }

    /// Polyak update: `θ ← τ·θ_source + (1 − τ)·θ`
    pub fn soft_update_from(&mut self, source: &QNetwork, tau: f64) {
        let source_vars = source.vs.variables();
        tch::no_grad(|| {
            for (name, mut target) in self.vs.variables() {
                if let Some(src) = source_vars.get(&name) {
                    let blended = src * tau + &target * (1.0 - tau);
                    target.copy_(&blended);
                }
            }
        });
    }

    /// Head layout
    pub fn action_space(&self) -> &ActionSpace {
        &self.space
    }

    /// Get the device this network is on
    pub fn device(&self) -> Device {
        self.device
    }

    /// Get reference to variable store (for optimizer creation)
    pub fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }

    /// Save parameters under `(name, agent_id)`
    pub fn save(&self, store: &mut dyn CheckpointStore, name: &str, agent_id: &str) -> Result<()> {
        save_var_store(store, &CheckpointKey::new(name, agent_id), &self.vs)
    }

    /// Restore parameters saved by [`QNetwork::save`]
    pub fn load(&mut self, store: &dyn CheckpointStore, name: &str, agent_id: &str) -> Result<LoadOutcome> {
        load_var_store(store, &CheckpointKey::new(name, agent_id), &mut self.vs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_q(seed: i64) -> QNetwork {
        tch::manual_seed(seed);
        let space = ActionSpace::new(vec![3, 2]).unwrap();
        QNetwork::new(4, space, &NetworkConfig::q_network().hidden_dims(vec![8])).unwrap()
    }

    #[test]
    fn test_output_layout() {
        let q_net = small_q(0);
        let q = q_net.forward(&Tensor::randn([2, 4], (Kind::Float, Device::Cpu)));
        assert_eq!(q.size(), vec![2, 5]);
        assert_eq!(q_net.head_values(&q, 0).size(), vec![2, 3]);
        assert_eq!(q_net.head_values(&q, 1).size(), vec![2, 2]);
        assert_eq!(q_net.max_head_values(&q).size(), vec![2, 2]);
    }

    #[test]
    fn test_greedy_action_is_segment_argmax() {
        let q_net = small_q(1);
        let obs = [0.2_f32, 0.4, -0.3, 1.0];
        let action = q_net.greedy_action(&obs).unwrap();
        q_net.action_space().validate_action(&action).unwrap();

        let q = q_net.forward(&Tensor::from_slice(&obs).view([1, 4]));
        let taken = q_net.action_values(&q, &Tensor::from_slice(&action).view([1, 2]));
        let best = q_net.max_head_values(&q);
        assert!(taken.allclose(&best, 1e-6, 1e-6, false));
    }

    #[test]
    fn test_hard_and_soft_updates() {
        let source = small_q(2);
        let mut target = small_q(3);
        let obs = Tensor::randn([1, 4], (Kind::Float, Device::Cpu));

        // τ = 0 leaves the target unchanged
        let before = target.forward(&obs);
        target.soft_update_from(&source, 0.0);
        assert!(target.forward(&obs).allclose(&before, 1e-6, 1e-6, false));

        // τ = 1 is a full copy
        target.soft_update_from(&source, 1.0);
        assert!(target.forward(&obs).allclose(&source.forward(&obs), 1e-6, 1e-6, false));

        let mut other = small_q(4);
        other.copy_from(&source).unwrap();
        assert!(other.forward(&obs).allclose(&source.forward(&obs), 1e-6, 1e-6, false));
    }
}

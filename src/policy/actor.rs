//! Multi-head categorical policy
//!
//! One shared trunk feeds an independent linear head per action
//! sub-dimension. Each head parameterizes its own categorical
//! distribution; the sub-actions are sampled independently given the
//! trunk features.
//!
//! ```text
//!            observation
//!                 |
//!              [trunk]
//!        /     |      ...     \
//!   [Dense(n_0)] [Dense(n_1)] ... [Dense(n_H)]
//!        |         |                |
//!    Cat(n_0)   Cat(n_1)   ...   Cat(n_H)
//! ```

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

/// Checkpoint name for policy parameters
pub const ACTOR_CHECKPOINT: &str = "actor_torch_ppo";

/// Policy network with one categorical head per action sub-dimension
pub struct PolicyNetwork {
    vs: nn::VarStore,
    trunk: nn::Sequential,
    heads: Vec<nn::Linear>,
    space: ActionSpace,
    obs_dim: usize,
    device: Device,
}

impl std::fmt::Debug for PolicyNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyNetwork")
            .field("obs_dim", &self.obs_dim)
            .field("heads", &self.space.cardinalities())
            .field("device", &self.device)
            .finish()
    }
}

impl PolicyNetwork {
    /// Build a policy for `obs_dim`-wide observations over `space`
    ///
    /// # Arguments
    ///
    /// * `obs_dim` - Observation width
    /// * `space` - Head layout; fixed for the lifetime of the network
    /// * `config` - Trunk architecture and compute target
    pub fn new(obs_dim: usize, space: ActionSpace, config: &NetworkConfig) -> Result<Self> {
        config.validate()?;
        if obs_dim == 0 {
            return Err(CoreError::InvalidConfig("observation dimension must be positive".into()));
        }

        let device = config.compute_target.resolve()?;
        tracing::info!(?device, heads = ?space.cardinalities(), "PolicyNetwork using device");

        let vs = nn::VarStore::new(device);
        let root = vs.root();
        let trunk = build_trunk(&(&root / "trunk"), obs_dim as i64, config);

        let head_config = output_linear_config(config, 0.01);
        let heads = space
            .cardinalities()
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                nn::linear(&root / "heads" / format!("h{i}"), config.feature_dim(), n, head_config)
            })
            .collect();

        Ok(Self { vs, trunk, heads, space, obs_dim, device })
    }

    /// Per-head logits for a batch of observations `[B, obs_dim]`
    pub fn forward(&self, obs: &Tensor) -> Vec<Tensor> {
        let features = self.trunk.forward(obs);
        self.heads.iter().map(|head| head.forward(&features)).collect()
    }

    /// Sample an action for one observation
    ///
    /// Returns the action tuple and the log-probability of each head's
    /// sampled value. No gradients are recorded.
    pub fn choose_action(&self, observation: &[f32]) -> Result<(Vec<i64>, Vec<f32>)> {
        let obs = observation_tensor(observation, self.obs_dim, self.device)?;

        let (action, log_probs) = tch::no_grad(|| {
            let mut action = Vec::with_capacity(self.heads.len());
            let mut log_probs = Vec::with_capacity(self.heads.len());
            for logits in self.forward(&obs) {
                let log_p = logits.log_softmax(-1, Kind::Float);
                let sample = log_p.exp().multinomial(1, true);
                let chosen = log_p.gather(-1, &sample, false);
                action.push(sample.int64_value(&[0, 0]));
                log_probs.push(chosen.double_value(&[0, 0]) as f32);
            }
            (action, log_probs)
        });

        Ok((action, log_probs))
    }

    /// Log-probabilities and entropy of stored actions, with gradients
    ///
    /// # Arguments
    ///
    /// * `obs` - Observations `[B, obs_dim]`
    /// * `actions` - Actions `[B, num_heads]` (int64)
    ///
    /// # Returns
    ///
    /// `(log_probs [B, num_heads], entropy)` where `entropy` is a scalar: the
    /// per-sample sum of head entropies, averaged over the batch.
    pub fn evaluate_actions(&self, obs: &Tensor, actions: &Tensor) -> (Tensor, Tensor) {
        let mut log_probs = Vec::with_capacity(self.heads.len());
        let mut entropies = Vec::with_capacity(self.heads.len());

        for (h, logits) in self.forward(obs).into_iter().enumerate() {
            let log_p = logits.log_softmax(-1, Kind::Float);
            let head_actions = actions.select(1, h as i64).unsqueeze(-1);
            log_probs.push(log_p.gather(-1, &head_actions, false).squeeze_dim(-1));
            entropies.push(-(log_p.exp() * &log_p).sum_dim_intlist(-1, false, Kind::Float));
        }

        let log_probs = Tensor::stack(&log_probs, 1);
        let entropy = Tensor::stack(&entropies, 1).sum_dim_intlist(1, false, Kind::Float).mean(Kind::Float);
        (log_probs, entropy)
    }

    /// Per-head log-probabilities of `action` at `observation`, no gradients
    pub fn log_probs(&self, observation: &[f32], action: &[i64]) -> Result<Vec<f32>> {
        self.space.validate_action(action)?;
        let obs = observation_tensor(observation, self.obs_dim, self.device)?;
        let actions = Tensor::from_slice(action).view([1, -1]).to_device(self.device);

        let log_probs = tch::no_grad(|| self.evaluate_actions(&obs, &actions).0);
        Ok((0..self.heads.len() as i64).map(|h| log_probs.double_value(&[0, h]) as f32).collect())
    }

    /// Head layout
    pub fn action_space(&self) -> &ActionSpace {
        &self.space
    }

    /// Observation width
    pub fn obs_dim(&self) -> usize {
        self.obs_dim
    }

    /// Get the device this policy is on (CPU or CUDA)
    pub fn device(&self) -> Device {
        self.device
    }

    /// Get reference to variable store (for optimizer creation)
    pub fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }

    /// Save parameters under `(actor_torch_ppo, agent_id)`
    pub fn save(&self, store: &mut dyn CheckpointStore, agent_id: &str) -> Result<()> {
        save_var_store(store, &CheckpointKey::new(ACTOR_CHECKPOINT, agent_id), &self.vs)
    }

    /// Restore parameters saved by [`PolicyNetwork::save`]
    pub fn load(&mut self, store: &dyn CheckpointStore, agent_id: &str) -> Result<LoadOutcome> {
        load_var_store(store, &CheckpointKey::new(ACTOR_CHECKPOINT, agent_id), &mut self.vs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::MemoryStore;

    fn small_policy() -> PolicyNetwork {
        let space = ActionSpace::new(vec![4, 3, 2]).unwrap();
        PolicyNetwork::new(5, space, &NetworkConfig::default().hidden_dims(vec![16, 16])).unwrap()
    }

    #[test]
    fn test_forward_shapes() {
        let policy = small_policy();
        let obs = Tensor::randn([8, 5], (Kind::Float, policy.device()));

        let logits = policy.forward(&obs);
        assert_eq!(logits.len(), 3);
        assert_eq!(logits[0].size(), vec![8, 4]);
        assert_eq!(logits[1].size(), vec![8, 3]);
        assert_eq!(logits[2].size(), vec![8, 2]);
    }

    #[test]
    fn test_choose_action_respects_space() {
        let policy = small_policy();
        for _ in 0..20 {
            let (action, log_probs) = policy.choose_action(&[0.1, -0.2, 0.3, 0.0, 1.0]).unwrap();
            policy.action_space().validate_action(&action).unwrap();
            assert_eq!(log_probs.len(), 3);
            assert!(log_probs.iter().all(|&lp| lp <= 0.0 && lp.is_finite()));
        }
    }

    #[test]
    fn test_choose_action_rejects_wrong_width() {
        let policy = small_policy();
        assert!(matches!(
            policy.choose_action(&[0.0; 4]),
            Err(CoreError::ShapeMismatch { expected: 5, actual: 4, .. })
        ));
    }

    #[test]
    fn test_sampled_log_probs_match_evaluation() {
        let policy = small_policy();
        let obs = [0.5, 0.5, -1.0, 0.0, 0.25];
        let (action, sampled) = policy.choose_action(&obs).unwrap();
        let evaluated = policy.log_probs(&obs, &action).unwrap();
        for (a, b) in sampled.iter().zip(&evaluated) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let policy = small_policy();
        let obs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let first = policy.log_probs(&obs, &[3, 0, 1]).unwrap();
        let second = policy.log_probs(&obs, &[3, 0, 1]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_evaluate_actions_shapes() {
        let policy = small_policy();
        let obs = Tensor::randn([6, 5], (Kind::Float, policy.device()));
        let actions = Tensor::from_slice(&[0_i64, 0, 0, 3, 2, 1, 1, 1, 0, 2, 2, 1, 0, 1, 0, 3, 0, 1])
            .view([6, 3]);

        let (log_probs, entropy) = policy.evaluate_actions(&obs, &actions);
        assert_eq!(log_probs.size(), vec![6, 3]);
        assert_eq!(entropy.size(), Vec::<i64>::new());

        // Joint entropy is bounded by the sum of uniform-head entropies
        let bound = (4.0_f64).ln() + (3.0_f64).ln() + (2.0_f64).ln();
        let entropy = f64::try_from(entropy).unwrap();
        assert!(entropy > 0.0 && entropy <= bound + 1e-6);
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let policy = small_policy();
        let mut restored = small_policy();
        let mut store = MemoryStore::new();

        policy.save(&mut store, "0").unwrap();
        assert_eq!(restored.load(&store, "0").unwrap(), LoadOutcome::Loaded);
        assert_eq!(restored.load(&store, "1").unwrap(), LoadOutcome::NotFound);

        let originals = policy.var_store().variables();
        for (name, tensor) in restored.var_store().variables() {
            assert!(tensor.equal(&originals[&name]), "{name} differs after reload");
        }
    }
}

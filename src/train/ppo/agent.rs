//! PPO agent: policy and value networks, their optimizers, and a rollout buffer
//!
//! The agent owns everything it learns from. Experience is appended with
//! [`PpoAgent::remember`]; [`PpoAgent::learn`] consumes the whole buffer and
//! clears it.

use tch::{Device, Tensor};

use super::{
    config::PPOConfig,
    loss::{compute_entropy_loss, compute_policy_loss, compute_value_loss},
    stats::TrainingStats,
};
use crate::{
    buffer::rollout::{normalize_advantages, Minibatch, RolloutBuffer, Transition},
    checkpoint::{CheckpointStore, LoadOutcome},
    env::ActionSpace,
    error::{CoreError, Result},
    policy::{NetworkConfig, PolicyNetwork, ValueNetwork},
    train::{optim::ScheduledOptimizer, Decision},
};

/// Proximal Policy Optimization agent over a multi-discrete action space
#[derive(Debug)]
pub struct PpoAgent {
    config: PPOConfig,
    actor: PolicyNetwork,
    critic: ValueNetwork,
    actor_optimizer: ScheduledOptimizer,
    critic_optimizer: ScheduledOptimizer,
    buffer: RolloutBuffer,
    learn_calls: usize,
}

impl PpoAgent {
    /// Create an agent with freshly initialized networks
    ///
    /// # Arguments
    ///
    /// * `obs_dim` - Observation width
    /// * `space` - Action head layout
    /// * `config` - PPO hyperparameters (validated here)
    /// * `network` - Trunk architecture shared by policy and value networks
    pub fn new(
        obs_dim: usize,
        space: ActionSpace,
        config: PPOConfig,
        network: &NetworkConfig,
    ) -> Result<Self> {
        let buffer = RolloutBuffer::new(obs_dim, space.num_heads());
        Self::build(obs_dim, space, config, network, buffer)
    }

    /// Like [`PpoAgent::new`], with seeded initialization and shuffles
    pub fn with_seed(
        obs_dim: usize,
        space: ActionSpace,
        config: PPOConfig,
        network: &NetworkConfig,
        seed: u64,
    ) -> Result<Self> {
        tch::manual_seed(seed as i64);
        let buffer = RolloutBuffer::with_seed(obs_dim, space.num_heads(), seed);
        Self::build(obs_dim, space, config, network, buffer)
    }

    fn build(
        obs_dim: usize,
        space: ActionSpace,
        config: PPOConfig,
        network: &NetworkConfig,
        buffer: RolloutBuffer,
    ) -> Result<Self> {
        config.validate()?;

        let actor = PolicyNetwork::new(obs_dim, space, network)?;
        let critic = ValueNetwork::new(obs_dim, network)?;
        let actor_optimizer = ScheduledOptimizer::new(
            config.optimizer,
            config.lr_schedule,
            actor.var_store(),
            config.learning_rate,
        )?;
        let critic_optimizer = ScheduledOptimizer::new(
            config.optimizer,
            config.lr_schedule,
            critic.var_store(),
            config.learning_rate,
        )?;

        Ok(Self { config, actor, critic, actor_optimizer, critic_optimizer, buffer, learn_calls: 0 })
    }

    /// Sample an action and evaluate the observation
    pub fn choose_action(&self, observation: &[f32]) -> Result<Decision> {
        let (action, log_probs) = self.actor.choose_action(observation)?;
        let value = self.critic.value(observation)?;
        Ok(Decision { action, log_probs, value })
    }

    /// Append one transition to the rollout buffer
    ///
    /// Rejects actions outside the head layout before they reach a learn call.
    pub fn remember(&mut self, transition: Transition) -> Result<()> {
        self.actor.action_space().validate_action(&transition.action)?;
        self.buffer.store(transition)
    }

    /// Run `n_epochs` of minibatch updates over the stored rollout
    ///
    /// Advantages are computed once and reused by every epoch; each epoch
    /// draws a fresh shuffle. The buffer is cleared afterwards.
    ///
    /// # Errors
    ///
    /// [`CoreError::EmptyBuffer`] if nothing was stored, and
    /// [`CoreError::NumericalDivergence`] if a loss becomes non-finite. The
    /// buffer is left untouched in both cases.
    pub fn learn(&mut self) -> Result<TrainingStats> {
        let advantages =
            self.buffer.advantages(self.config.gamma as f32, self.config.gae_lambda as f32)?;
        let device = self.actor.device();
        let mut stats_sum = TrainingStats::zeros();

        for epoch in 0..self.config.n_epochs {
            let (arrays, groups) = self.buffer.generate_batches(self.config.batch_size)?;

            for (batch_idx, indices) in groups.iter().enumerate() {
                let batch = arrays.gather(indices, &advantages);
                let step_stats = update_minibatch(
                    &self.config,
                    &self.actor,
                    &self.critic,
                    &mut self.actor_optimizer,
                    &mut self.critic_optimizer,
                    &batch,
                    device,
                )
                .map_err(|loss| CoreError::NumericalDivergence { epoch, batch: batch_idx, loss })?;
                stats_sum += &step_stats;
            }
        }

        let transitions = self.buffer.len();
        self.buffer.clear();
        self.learn_calls += 1;

        let stats = stats_sum.average();
        tracing::info!(
            learn_call = self.learn_calls,
            transitions,
            updates = stats.num_updates,
            policy_loss = stats.policy_loss,
            value_loss = stats.value_loss,
            entropy = stats.entropy,
            approx_kl = stats.approx_kl,
            "PPO update"
        );
        Ok(stats)
    }

    /// Save both networks under `agent_id`
    pub fn save_models(&self, store: &mut dyn CheckpointStore, agent_id: &str) -> Result<()> {
        self.actor.save(store, agent_id)?;
        self.critic.save(store, agent_id)
    }

    /// Restore both networks for `agent_id`
    ///
    /// Reports [`LoadOutcome::Loaded`] only if both checkpoints were found.
    pub fn load_models(&mut self, store: &dyn CheckpointStore, agent_id: &str) -> Result<LoadOutcome> {
        let actor = self.actor.load(store, agent_id)?;
        let critic = self.critic.load(store, agent_id)?;
        if actor == LoadOutcome::Loaded && critic == LoadOutcome::Loaded {
            Ok(LoadOutcome::Loaded)
        } else {
            Ok(LoadOutcome::NotFound)
        }
    }

    /// Stored transitions awaiting the next learn call
    pub fn buffer(&self) -> &RolloutBuffer {
        &self.buffer
    }

    /// Policy network
    pub fn actor(&self) -> &PolicyNetwork {
        &self.actor
    }

    /// Value network
    pub fn critic(&self) -> &ValueNetwork {
        &self.critic
    }

    /// Hyperparameters
    pub fn config(&self) -> &PPOConfig {
        &self.config
    }

    /// Completed learn calls
    pub fn learn_calls(&self) -> usize {
        self.learn_calls
    }
}

/// One gradient step on both networks
///
/// Returns the non-finite loss value as the error so the caller can attach
/// its epoch and minibatch position.
fn update_minibatch(
    config: &PPOConfig,
    actor: &PolicyNetwork,
    critic: &ValueNetwork,
    actor_optimizer: &mut ScheduledOptimizer,
    critic_optimizer: &mut ScheduledOptimizer,
    batch: &Minibatch,
    device: Device,
) -> std::result::Result<TrainingStats, f64> {
    let (size, obs_dim) = batch.obs_shape();
    let (_, num_heads) = batch.head_shape();
    let (size, obs_dim, num_heads) = (size as i64, obs_dim as i64, num_heads as i64);

    let obs = Tensor::from_slice(&batch.observations).view([size, obs_dim]).to_device(device);
    let actions = Tensor::from_slice(&batch.actions).view([size, num_heads]).to_device(device);
    let old_log_probs =
        Tensor::from_slice(&batch.old_log_probs).view([size, num_heads]).to_device(device);
    let old_values = Tensor::from_slice(&batch.old_values).to_device(device);
    let advantages = Tensor::from_slice(&batch.advantages).to_device(device);

    let policy_advantages = if config.normalize_advantages && size > 1 {
        let mut normalized = batch.advantages.clone();
        normalize_advantages(&mut normalized);
        Tensor::from_slice(&normalized).to_device(device)
    } else {
        advantages.shallow_clone()
    };

    let (log_probs, entropy) = actor.evaluate_actions(&obs, &actions);
    let values = critic.forward(&obs);

    let (policy_loss, clip_fraction, approx_kl) =
        compute_policy_loss(&log_probs, &old_log_probs, &policy_advantages, config.clip_range);
    let (value_loss, explained_var) = compute_value_loss(&values, &old_values, &advantages);
    let entropy_loss = compute_entropy_loss(&entropy);

    let loss = &policy_loss + config.vf_coef * &value_loss + config.ent_coef * &entropy_loss;
    let total_loss = loss.double_value(&[]);
    if !total_loss.is_finite() {
        return Err(total_loss);
    }

    actor_optimizer.zero_grad();
    critic_optimizer.zero_grad();
    loss.backward();
    actor_optimizer.clip_grad_value(config.max_grad_value);
    critic_optimizer.clip_grad_value(config.max_grad_value);
    actor_optimizer.step();
    critic_optimizer.step();

    let learning_rate = actor_optimizer.learning_rate();
    actor_optimizer.step_schedule();
    critic_optimizer.step_schedule();

    Ok(TrainingStats {
        policy_loss: policy_loss.double_value(&[]),
        value_loss: value_loss.double_value(&[]),
        entropy: entropy.double_value(&[]),
        total_loss,
        clip_fraction,
        approx_kl,
        explained_var,
        learning_rate,
        num_updates: 1,
    })
}

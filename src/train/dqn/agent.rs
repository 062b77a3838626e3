//! DQN agent: online and target Q networks plus a replay buffer

use rand::{rngs::StdRng, Rng, SeedableRng};
use tch::{Device, Kind, Reduction, Tensor};

use super::config::{DqnConfig, TargetUpdate};
use crate::{
    buffer::replay::{ReplayBuffer, ReplayTransition},
    checkpoint::{CheckpointStore, LoadOutcome},
    env::ActionSpace,
    error::{CoreError, Result},
    policy::{NetworkConfig, QNetwork, DQN_CHECKPOINT},
    train::optim::{LrSchedule, ScheduledOptimizer},
};

/// Checkpoint name for the target network
pub const DQN_TARGET_CHECKPOINT: &str = "dqn_target";

/// Result of one DQN learn step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DqnStats {
    /// Smooth-L1 TD loss
    pub loss: f64,

    /// Exploration rate at the time of the update
    pub epsilon: f64,
}

/// ε-greedy DQN agent over a multi-discrete action space
#[derive(Debug)]
pub struct DqnAgent {
    config: DqnConfig,
    policy_net: QNetwork,
    target_net: QNetwork,
    optimizer: ScheduledOptimizer,
    memory: ReplayBuffer,
    rng: StdRng,
    obs_dim: usize,
    steps_done: u64,
    learn_steps: usize,
}

impl DqnAgent {
    /// Create an agent with freshly initialized networks
    pub fn new(
        obs_dim: usize,
        space: ActionSpace,
        config: DqnConfig,
        network: &NetworkConfig,
    ) -> Result<Self> {
        Self::build(obs_dim, space, config, network, StdRng::from_entropy())
    }

    /// Like [`DqnAgent::new`], with seeded initialization, exploration, and sampling
    pub fn with_seed(
        obs_dim: usize,
        space: ActionSpace,
        config: DqnConfig,
        network: &NetworkConfig,
        seed: u64,
    ) -> Result<Self> {
        tch::manual_seed(seed as i64);
        Self::build(obs_dim, space, config, network, StdRng::seed_from_u64(seed))
    }

    fn build(
        obs_dim: usize,
        space: ActionSpace,
        config: DqnConfig,
        network: &NetworkConfig,
        rng: StdRng,
    ) -> Result<Self> {
        config.validate()?;

        let policy_net = QNetwork::new(obs_dim, space.clone(), network)?;
        let mut target_net = QNetwork::new(obs_dim, space, network)?;
        target_net.copy_from(&policy_net)?;

        let optimizer = ScheduledOptimizer::new(
            config.optimizer,
            LrSchedule::Constant,
            policy_net.var_store(),
            config.learning_rate,
        )?;
        let memory = ReplayBuffer::new(config.memory_size)?;

        Ok(Self {
            config,
            policy_net,
            target_net,
            optimizer,
            memory,
            rng,
            obs_dim,
            steps_done: 0,
            learn_steps: 0,
        })
    }

    /// Current exploration rate
    pub fn epsilon(&self) -> f64 {
        self.config.epsilon(self.steps_done)
    }

    /// Pick an action: uniform random per head with probability ε, greedy otherwise
    ///
    /// A malformed observation is rejected before ε advances.
    pub fn choose_action(&mut self, observation: &[f32]) -> Result<Vec<i64>> {
        if observation.len() != self.obs_dim {
            return Err(CoreError::ShapeMismatch {
                what: "observation",
                expected: self.obs_dim,
                actual: observation.len(),
            });
        }
        let epsilon = self.epsilon();
        self.steps_done += 1;

        if self.rng.gen::<f64>() > epsilon {
            self.policy_net.greedy_action(observation)
        } else {
            let cardinalities = self.policy_net.action_space().cardinalities().to_vec();
            Ok(cardinalities.into_iter().map(|n| self.rng.gen_range(0..n)).collect())
        }
    }

    /// Store one transition in replay memory
    pub fn remember(&mut self, transition: ReplayTransition) -> Result<()> {
        let heads = self.policy_net.action_space().num_heads();
        for (what, expected, actual) in [
            ("observation", self.obs_dim, transition.observation.len()),
            ("next observation", self.obs_dim, transition.next_observation.len()),
            ("action heads", heads, transition.action.len()),
        ] {
            if expected != actual {
                return Err(CoreError::ShapeMismatch { what, expected, actual });
            }
        }
        self.policy_net.action_space().validate_action(&transition.action)?;
        self.memory.push(transition);
        Ok(())
    }

    /// One TD update from a replay batch
    ///
    /// Returns `Ok(None)` without touching the networks while the replay
    /// buffer holds fewer than `batch_size` transitions.
    pub fn learn(&mut self) -> Result<Option<DqnStats>> {
        let batch_size = self.config.batch_size;
        let Some(batch) = self.memory.sample(batch_size, &mut self.rng) else {
            return Ok(None);
        };

        let device = self.policy_net.device();
        let heads = self.policy_net.action_space().num_heads() as i64;
        let (b, d) = (batch_size as i64, self.obs_dim as i64);

        let observations: Vec<f32> = batch.iter().flat_map(|t| t.observation.iter().copied()).collect();
        let next_observations: Vec<f32> =
            batch.iter().flat_map(|t| t.next_observation.iter().copied()).collect();
        let actions: Vec<i64> = batch.iter().flat_map(|t| t.action.iter().copied()).collect();
        let rewards: Vec<f32> = batch.iter().map(|t| t.reward).collect();
        let not_done: Vec<f32> = batch.iter().map(|t| if t.done { 0.0 } else { 1.0 }).collect();

        let obs = to_tensor(&observations, &[b, d], device);
        let next_obs = to_tensor(&next_observations, &[b, d], device);
        let actions = Tensor::from_slice(&actions).view([b, heads]).to_device(device);
        let rewards = to_tensor(&rewards, &[b, 1], device);
        let not_done = to_tensor(&not_done, &[b, 1], device);

        let q = self.policy_net.forward(&obs);
        let q_taken = self.policy_net.action_values(&q, &actions);

        let targets = tch::no_grad(|| {
            let next_q = self.target_net.forward(&next_obs);
            let best_next = self.target_net.max_head_values(&next_q);
            &rewards + self.config.gamma * best_next * &not_done
        });

        let loss = q_taken.smooth_l1_loss(&targets, Reduction::Mean, 1.0);
        let loss_value = loss.double_value(&[]);
        if !loss_value.is_finite() {
            return Err(CoreError::NumericalDivergence {
                epoch: 0,
                batch: self.learn_steps,
                loss: loss_value,
            });
        }

        self.optimizer.zero_grad();
        loss.backward();
        self.optimizer.clip_grad_value(self.config.max_grad_value);
        self.optimizer.step();
        self.learn_steps += 1;

        match self.config.target_update {
            TargetUpdate::Soft { tau } => self.target_net.soft_update_from(&self.policy_net, tau),
            TargetUpdate::Hard { every } => {
                if self.learn_steps % every == 0 {
                    self.target_net.copy_from(&self.policy_net)?;
                    tracing::debug!(learn_steps = self.learn_steps, "Replaced target network");
                }
            }
        }

        Ok(Some(DqnStats { loss: loss_value, epsilon: self.epsilon() }))
    }

    /// Save online and target networks under `agent_id`
    pub fn save_models(&self, store: &mut dyn CheckpointStore, agent_id: &str) -> Result<()> {
        self.policy_net.save(store, DQN_CHECKPOINT, agent_id)?;
        self.target_net.save(store, DQN_TARGET_CHECKPOINT, agent_id)
    }

    /// Restore both networks for `agent_id`
    ///
    /// A missing target checkpoint falls back to a copy of the online network.
    pub fn load_models(&mut self, store: &dyn CheckpointStore, agent_id: &str) -> Result<LoadOutcome> {
        let outcome = self.policy_net.load(store, DQN_CHECKPOINT, agent_id)?;
        if outcome == LoadOutcome::Loaded
            && self.target_net.load(store, DQN_TARGET_CHECKPOINT, agent_id)? == LoadOutcome::NotFound
        {
            self.target_net.copy_from(&self.policy_net)?;
        }
        Ok(outcome)
    }

    /// Replay memory
    pub fn memory(&self) -> &ReplayBuffer {
        &self.memory
    }

    /// Online Q network
    pub fn policy_net(&self) -> &QNetwork {
        &self.policy_net
    }

    /// Actions chosen so far
    pub fn steps_done(&self) -> u64 {
        self.steps_done
    }

    /// Gradient updates performed so far
    pub fn learn_steps(&self) -> usize {
        self.learn_steps
    }
}

fn to_tensor(data: &[f32], shape: &[i64], device: Device) -> Tensor {
    Tensor::from_slice(data).view(shape).to_kind(Kind::Float).to_device(device)
}

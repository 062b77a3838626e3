//! Rollout buffer for storing and processing trajectories
//!
//! This module implements on-policy experience storage for PPO training:
//! - Append-only transition storage (observations, actions, log-probs, ...)
//! - GAE (Generalized Advantage Estimation) over the stored rollout
//! - Shuffled minibatch index groups for the update loop
//!
//! # Buffer Layout
//!
//! Transitions are kept in parallel flat arrays in insertion (time) order.
//! Observations are `[n, obs_dim]` row-major; actions and log-probs are
//! `[n, num_heads]` row-major. The buffer holds exactly one policy version's
//! data: call [`RolloutBuffer::clear`] after every learning pass.

use rand::{rngs::StdRng, SeedableRng};

use crate::error::{CoreError, Result};

pub mod gae;
pub mod sampling;

#[cfg(test)]
mod tests;

pub use gae::{compute_gae, normalize_advantages, rollout_advantages};
pub use sampling::generate_minibatch_indices;

/// One step of experience
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Observation the action was chosen from
    pub observation: Vec<f32>,

    /// Sampled action, one value per head
    pub action: Vec<i64>,

    /// Log-probability of each head's sampled value
    pub log_probs: Vec<f32>,

    /// Value estimate for `observation`
    pub value: f32,

    /// Reward received for the action
    pub reward: f32,

    /// Whether the game ended after this step
    pub done: bool,
}

/// Rollout buffer for PPO training
///
/// # Example
///
/// ```rust
/// use catan_rl::buffer::rollout::{RolloutBuffer, Transition};
///
/// // 3-dimensional observations, two action heads
/// let mut buffer = RolloutBuffer::new(3, 2);
///
/// buffer.store(Transition {
///     observation: vec![0.1, 0.2, 0.3],
///     action: vec![1, 4],
///     log_probs: vec![-0.7, -1.9],
///     value: 0.5,
///     reward: 1.0,
///     done: false,
/// })?;
///
/// let (arrays, groups) = buffer.generate_batches(1)?;
/// assert_eq!(arrays.len(), 1);
/// assert_eq!(groups, vec![vec![0]]);
/// # Ok::<(), catan_rl::CoreError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RolloutBuffer {
    /// Observation dimensionality
    obs_dim: usize,

    /// Number of action heads
    num_heads: usize,

    /// Observations: [n, obs_dim]
    observations: Vec<f32>,

    /// Actions: [n, num_heads]
    actions: Vec<i64>,

    /// Log probabilities: [n, num_heads]
    log_probs: Vec<f32>,

    /// Value estimates: [n]
    values: Vec<f32>,

    /// Rewards: [n]
    rewards: Vec<f32>,

    /// Episode termination flags: [n]
    dones: Vec<bool>,

    /// Source of minibatch shuffles
    rng: StdRng,
}

impl RolloutBuffer {
    /// Create an empty buffer with an entropy-seeded shuffle
    ///
    /// # Arguments
    ///
    /// * `obs_dim` - Dimensionality of observations
    /// * `num_heads` - Number of action sub-dimensions
    pub fn new(obs_dim: usize, num_heads: usize) -> Self {
        Self::with_rng(obs_dim, num_heads, StdRng::from_entropy())
    }

    /// Create an empty buffer whose shuffles are reproducible
    pub fn with_seed(obs_dim: usize, num_heads: usize, seed: u64) -> Self {
        Self::with_rng(obs_dim, num_heads, StdRng::seed_from_u64(seed))
    }

    fn with_rng(obs_dim: usize, num_heads: usize, rng: StdRng) -> Self {
        Self {
            obs_dim,
            num_heads,
            observations: Vec::new(),
            actions: Vec::new(),
            log_probs: Vec::new(),
            values: Vec::new(),
            rewards: Vec::new(),
            dones: Vec::new(),
            rng,
        }
    }

    /// Append a transition
    ///
    /// Rejects observations, actions, or log-prob vectors whose length does
    /// not match the buffer's layout; nothing is stored in that case.
    pub fn store(&mut self, transition: Transition) -> Result<()> {
        check_len("observation", self.obs_dim, transition.observation.len())?;
        check_len("action heads", self.num_heads, transition.action.len())?;
        check_len("log-prob heads", self.num_heads, transition.log_probs.len())?;

        self.observations.extend_from_slice(&transition.observation);
        self.actions.extend_from_slice(&transition.action);
        self.log_probs.extend_from_slice(&transition.log_probs);
        self.values.push(transition.value);
        self.rewards.push(transition.reward);
        self.dones.push(transition.done);
        Ok(())
    }

    /// Shuffle `[0, n)` and cut it into runs of `batch_size`
    ///
    /// Returns the stored arrays unmodified together with the index groups.
    /// There are `ceil(n / batch_size)` groups; the last may be shorter.
    ///
    /// # Errors
    ///
    /// [`CoreError::EmptyBuffer`] if nothing has been stored, and
    /// [`CoreError::InvalidConfig`] for a zero `batch_size`.
    pub fn generate_batches(
        &mut self,
        batch_size: usize,
    ) -> Result<(RolloutArrays<'_>, Vec<Vec<usize>>)> {
        if self.is_empty() {
            return Err(CoreError::EmptyBuffer);
        }
        if batch_size == 0 {
            return Err(CoreError::InvalidConfig("batch_size must be positive".to_string()));
        }

        let groups = generate_minibatch_indices(self.len(), batch_size, &mut self.rng);
        Ok((self.arrays(), groups))
    }

    /// Borrow the stored arrays
    pub fn arrays(&self) -> RolloutArrays<'_> {
        RolloutArrays {
            obs_dim: self.obs_dim,
            num_heads: self.num_heads,
            observations: &self.observations,
            actions: &self.actions,
            log_probs: &self.log_probs,
            values: &self.values,
            rewards: &self.rewards,
            dones: &self.dones,
        }
    }

    /// GAE for every stored transition (the last one is always 0.0)
    pub fn advantages(&self, gamma: f32, gae_lambda: f32) -> Result<Vec<f32>> {
        rollout_advantages(&self.rewards, &self.values, &self.dones, gamma, gae_lambda)
    }

    /// Discard all stored transitions
    pub fn clear(&mut self) {
        self.observations.clear();
        self.actions.clear();
        self.log_probs.clear();
        self.values.clear();
        self.rewards.clear();
        self.dones.clear();
    }

    /// Get number of stored transitions
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Get buffer layout (obs_dim, num_heads)
    pub fn shape(&self) -> (usize, usize) {
        (self.obs_dim, self.num_heads)
    }
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(CoreError::ShapeMismatch { what, expected, actual });
    }
    Ok(())
}

/// Borrowed view of a rollout's parallel arrays
#[derive(Debug, Clone, Copy)]
pub struct RolloutArrays<'a> {
    /// Observation width
    pub obs_dim: usize,

    /// Number of action heads
    pub num_heads: usize,

    /// Flattened observations [n * obs_dim]
    pub observations: &'a [f32],

    /// Flattened actions [n * num_heads]
    pub actions: &'a [i64],

    /// Flattened log probabilities [n * num_heads]
    pub log_probs: &'a [f32],

    /// Value estimates [n]
    pub values: &'a [f32],

    /// Rewards [n]
    pub rewards: &'a [f32],

    /// Done flags [n]
    pub dones: &'a [bool],
}

impl<'a> RolloutArrays<'a> {
    /// Number of transitions
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    /// Check if there are no transitions
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Observation row `i`
    pub fn observation(&self, i: usize) -> &'a [f32] {
        &self.observations[i * self.obs_dim..(i + 1) * self.obs_dim]
    }

    /// Action row `i`
    pub fn action(&self, i: usize) -> &'a [i64] {
        &self.actions[i * self.num_heads..(i + 1) * self.num_heads]
    }

    /// Log-prob row `i`
    pub fn log_prob(&self, i: usize) -> &'a [f32] {
        &self.log_probs[i * self.num_heads..(i + 1) * self.num_heads]
    }

    /// Gather the rows named by `indices` into a contiguous minibatch
    pub fn gather(&self, indices: &[usize], advantages: &[f32]) -> Minibatch {
        let size = indices.len();
        let mut batch = Minibatch {
            observations: Vec::with_capacity(size * self.obs_dim),
            actions: Vec::with_capacity(size * self.num_heads),
            old_log_probs: Vec::with_capacity(size * self.num_heads),
            old_values: Vec::with_capacity(size),
            advantages: Vec::with_capacity(size),
            obs_dim: self.obs_dim,
            num_heads: self.num_heads,
        };

        for &idx in indices {
            batch.observations.extend_from_slice(self.observation(idx));
            batch.actions.extend_from_slice(self.action(idx));
            batch.old_log_probs.extend_from_slice(self.log_prob(idx));
            batch.old_values.push(self.values[idx]);
            batch.advantages.push(advantages[idx]);
        }
        batch
    }
}

/// Minibatch data for one gradient step
#[derive(Debug, Clone)]
pub struct Minibatch {
    /// Observations [batch_size * obs_dim]
    pub observations: Vec<f32>,

    /// Actions [batch_size * num_heads]
    pub actions: Vec<i64>,

    /// Old log probabilities [batch_size * num_heads]
    pub old_log_probs: Vec<f32>,

    /// Old value estimates [batch_size]
    pub old_values: Vec<f32>,

    /// Advantages [batch_size]
    pub advantages: Vec<f32>,

    obs_dim: usize,
    num_heads: usize,
}

impl Minibatch {
    /// Get batch size
    pub fn size(&self) -> usize {
        self.old_values.len()
    }

    /// Observation tensor shape
    pub fn obs_shape(&self) -> (usize, usize) {
        (self.size(), self.obs_dim)
    }

    /// Action / log-prob tensor shape
    pub fn head_shape(&self) -> (usize, usize) {
        (self.size(), self.num_heads)
    }

    /// Check if batch is empty
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

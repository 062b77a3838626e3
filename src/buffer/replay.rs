//! Experience replay for off-policy learning
//!
//! A ring buffer: once `capacity` transitions are stored, each new one
//! overwrites the oldest. Sampling draws distinct slots uniformly.

use rand::{seq::index, Rng};

use crate::error::{CoreError, Result};

/// One step of off-policy experience
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayTransition {
    /// Observation the action was chosen from
    pub observation: Vec<f32>,

    /// Action taken, one value per head
    pub action: Vec<i64>,

    /// Reward received
    pub reward: f32,

    /// Observation after the action
    pub next_observation: Vec<f32>,

    /// Whether the game ended after this step
    pub done: bool,
}

/// Fixed-capacity replay memory
#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    capacity: usize,
    items: Vec<ReplayTransition>,
    next: usize,
    total_stored: usize,
}

impl ReplayBuffer {
    /// Create an empty buffer holding at most `capacity` transitions
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CoreError::InvalidConfig("replay capacity must be positive".to_string()));
        }
        Ok(Self { capacity, items: Vec::with_capacity(capacity.min(1 << 16)), next: 0, total_stored: 0 })
    }

    /// Store a transition, evicting the oldest once full
    pub fn push(&mut self, transition: ReplayTransition) {
        if self.items.len() < self.capacity {
            self.items.push(transition);
        } else {
            self.items[self.next] = transition;
        }
        self.next = (self.next + 1) % self.capacity;
        self.total_stored += 1;
    }

    /// Draw `batch_size` distinct transitions uniformly at random
    ///
    /// Returns `None` while fewer than `batch_size` transitions are stored.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        batch_size: usize,
        rng: &mut R,
    ) -> Option<Vec<&ReplayTransition>> {
        if batch_size == 0 || self.items.len() < batch_size {
            return None;
        }
        Some(index::sample(rng, self.items.len(), batch_size).into_iter().map(|i| &self.items[i]).collect())
    }

    /// Number of transitions currently held
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of transitions held
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Transitions pushed since creation, including evicted ones
    pub fn total_stored(&self) -> usize {
        self.total_stored
    }
}

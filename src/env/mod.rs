//! Environment traits and implementations
//!
//! The game backend is an external collaborator. The core only sees it
//! through [`Environment`]: an observation source on `reset`, and an action
//! sink on `step` that answers with the next observation, whether the move
//! was accepted, and whether the game is over.

use anyhow::Result;

pub mod action_space;
pub mod matching;
pub mod reward;

pub use action_space::ActionSpace;

/// Core trait for turn-based, multi-seat game environments
pub trait Environment {
    /// Start a new game and return the first observation
    fn reset(&mut self) -> Result<Vec<f32>>;

    /// Apply `action` on behalf of seat `agent`
    fn step(&mut self, agent: usize, action: &[i64]) -> Result<StepResult>;

    /// Length of every observation vector
    fn observation_dim(&self) -> usize;

    /// Action heads the backend expects
    fn action_space(&self) -> ActionSpace;

    /// Seat that moves first after `reset`
    fn first_agent(&self) -> usize {
        0
    }
}

/// Result of an environment step
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Next observation
    pub observation: Vec<f32>,

    /// Whether the backend accepted the move
    pub successful: bool,

    /// Whether the game is over
    pub done: bool,

    /// Seat to act next
    pub next_agent: usize,

    /// Counters of the seat that just acted, if the backend reports them
    pub stats: Option<PlayerStats>,
}

/// Per-seat progress counters used by reward shaping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerStats {
    /// Victory points held
    pub victory_points: u32,

    /// Roads built
    pub roads: u32,

    /// Settlements built
    pub settlements: u32,

    /// Cities built
    pub cities: u32,
}

//! Reward functions
//!
//! The backend only reports whether a move was accepted and, optionally,
//! the acting seat's counters. A [`RewardFunction`] turns that into the
//! scalar the learner optimizes.

use serde::{Deserialize, Serialize};

use super::{PlayerStats, StepResult};

/// Everything a reward function may look at for one step
#[derive(Debug, Clone, Copy)]
pub struct RewardContext<'a> {
    /// Action tuple that was sent
    pub action: &'a [i64],

    /// Backend response
    pub outcome: &'a StepResult,

    /// The same seat's counters after its previous move
    pub previous: Option<&'a PlayerStats>,

    /// Rejected moves by this seat since its last accepted one
    pub failed_actions: u32,
}

/// Maps a step to a scalar reward
pub trait RewardFunction {
    /// Score one step
    fn reward(&self, ctx: &RewardContext<'_>) -> f32;
}

/// 1.0 for an accepted move, 0.0 otherwise
#[derive(Debug, Clone, Copy, Default)]
pub struct SuccessReward;

impl RewardFunction for SuccessReward {
    fn reward(&self, ctx: &RewardContext<'_>) -> f32 {
        if ctx.outcome.successful { 1.0 } else { 0.0 }
    }
}

/// Dense reward that favors accepted moves and building progress
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapedReward {
    /// Bonus for an accepted, non-passive move
    pub accepted: f32,

    /// Returned outright for a rejected move
    pub rejected: f32,

    /// Action types (head 0) that only pass the turn or roll
    pub passive_action_types: Vec<i64>,

    /// Base reward for an accepted passive move
    pub passive: f32,

    /// Per rejected move since the last accepted one
    pub failed_action_penalty: f32,

    /// Per new road
    pub road: f32,

    /// Per new settlement
    pub settlement: f32,

    /// Per new city
    pub city: f32,

    /// Per victory point gained this move
    pub victory_point_gain: f32,

    /// Victory points needed to win
    pub winning_points: u32,

    /// Added once the seat reaches `winning_points`
    pub win: f32,

    /// Added on the final move of a game
    pub game_over: f32,
}

impl Default for ShapedReward {
    fn default() -> Self {
        Self {
            accepted: 100.0,
            rejected: -100.0,
            passive_action_types: vec![13, 14],
            passive: 0.1,
            failed_action_penalty: 0.1,
            road: 10.0,
            settlement: 100.0,
            city: 150.0,
            victory_point_gain: 1000.0,
            winning_points: 10,
            win: 100_000.0,
            game_over: 100.0,
        }
    }
}

impl RewardFunction for ShapedReward {
    fn reward(&self, ctx: &RewardContext<'_>) -> f32 {
        let failed_penalty = ctx.failed_actions as f32 * self.failed_action_penalty;

        if !ctx.outcome.successful {
            return self.rejected;
        }
        let action_type = ctx.action.first().copied().unwrap_or_default();
        if self.passive_action_types.contains(&action_type) {
            return self.passive - failed_penalty;
        }

        let mut reward = self.accepted;

        if let (Some(previous), Some(current)) = (ctx.previous, ctx.outcome.stats.as_ref()) {
            if current.victory_points >= self.winning_points {
                reward += self.win;
            }
            if current.roads > previous.roads {
                reward += self.road;
            }
            if current.settlements > previous.settlements {
                reward += self.settlement;
            }
            if current.cities > previous.cities {
                reward += self.city;
            }
            reward += current.victory_points as f32;
            let gained = current.victory_points as f32 - previous.victory_points as f32;
            reward += gained * self.victory_point_gain;
        }

        if ctx.outcome.done {
            reward += self.game_over;
        }

        reward - failed_penalty
    }
}

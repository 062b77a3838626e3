//! Matching game: a tiny multi-seat, multi-discrete environment
//!
//! Stands in for the real game backend in tests and demos:
//! - Observation: the hidden target choice of every head, scaled to [0, 1]
//! - Action: one choice per head
//! - A move is accepted when head 0 matches its target; each fully matched
//!   action is worth one victory point
//! - Accepted moves pass the turn to the next seat
//! - The game ends when a seat reaches `winning_points` or after `max_steps`

use anyhow::{ensure, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::{ActionSpace, Environment, PlayerStats, StepResult};

/// Toy environment for exercising agents and the training driver
#[derive(Debug)]
pub struct MatchingGame {
    space: ActionSpace,
    num_seats: usize,
    max_steps: usize,
    winning_points: u32,
    targets: Vec<i64>,
    stats: Vec<PlayerStats>,
    current: usize,
    steps: usize,
    rng: StdRng,
}

impl MatchingGame {
    /// Create a game over `space` for `num_seats` players
    pub fn new(space: ActionSpace, num_seats: usize, seed: u64) -> Self {
        Self {
            targets: vec![0; space.num_heads()],
            space,
            num_seats: num_seats.max(1),
            max_steps: 200,
            winning_points: 10,
            stats: vec![PlayerStats::default(); num_seats.max(1)],
            current: 0,
            steps: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Override the per-game step limit
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Override the points needed to win
    pub fn with_winning_points(mut self, points: u32) -> Self {
        self.winning_points = points;
        self
    }

    fn draw_targets(&mut self) {
        for (target, &n) in self.targets.iter_mut().zip(self.space.cardinalities()) {
            *target = self.rng.gen_range(0..n);
        }
    }

    fn observation(&self) -> Vec<f32> {
        self.targets
            .iter()
            .zip(self.space.cardinalities())
            .map(|(&t, &n)| if n > 1 { t as f32 / (n - 1) as f32 } else { 0.0 })
            .collect()
    }
}

impl Environment for MatchingGame {
    fn reset(&mut self) -> Result<Vec<f32>> {
        self.steps = 0;
        self.current = 0;
        self.stats.iter_mut().for_each(|s| *s = PlayerStats::default());
        self.draw_targets();
        Ok(self.observation())
    }

    fn step(&mut self, agent: usize, action: &[i64]) -> Result<StepResult> {
        ensure!(agent == self.current, "seat {agent} moved out of turn (expected {})", self.current);
        self.space.validate_action(action)?;

        self.steps += 1;
        let successful = action[0] == self.targets[0];
        if successful {
            let stats = &mut self.stats[agent];
            if action == self.targets.as_slice() {
                stats.victory_points += 1;
            }
            stats.roads += 1;
            self.current = (self.current + 1) % self.num_seats;
            self.draw_targets();
        }

        let stats = self.stats[agent];
        let done = stats.victory_points >= self.winning_points || self.steps >= self.max_steps;

        Ok(StepResult {
            observation: self.observation(),
            successful,
            done,
            next_agent: self.current,
            stats: Some(stats),
        })
    }

    fn observation_dim(&self) -> usize {
        self.space.num_heads()
    }

    fn action_space(&self) -> ActionSpace {
        self.space.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game() -> MatchingGame {
        MatchingGame::new(ActionSpace::new(vec![4, 3]).unwrap(), 2, 7)
    }

    #[test]
    fn test_matching_move_is_accepted_and_passes_turn() {
        let mut env = game();
        env.reset().unwrap();

        let targets = env.targets.clone();
        let result = env.step(0, &targets).unwrap();
        assert!(result.successful);
        assert_eq!(result.next_agent, 1);
        assert_eq!(result.stats.unwrap().victory_points, 1);
    }

    #[test]
    fn test_wrong_move_keeps_turn() {
        let mut env = game();
        env.reset().unwrap();

        let wrong = (env.targets[0] + 1) % 4;
        let result = env.step(0, &[wrong, 0]).unwrap();
        assert!(!result.successful);
        assert_eq!(result.next_agent, 0);
    }

    #[test]
    fn test_out_of_turn_is_an_error() {
        let mut env = game();
        env.reset().unwrap();
        assert!(env.step(1, &[0, 0]).is_err());
    }

    #[test]
    fn test_episode_length() {
        let mut env = game().with_max_steps(5);
        env.reset().unwrap();

        for i in 0..4 {
            let wrong = (env.targets[0] + 1) % 4;
            let result = env.step(0, &[wrong, 0]).unwrap();
            assert!(!result.done, "Game ended early at step {}", i);
        }
        let wrong = (env.targets[0] + 1) % 4;
        assert!(env.step(0, &[wrong, 0]).unwrap().done);
    }

    #[test]
    fn test_observation_is_scaled() {
        let mut env = game();
        let obs = env.reset().unwrap();
        assert_eq!(obs.len(), env.observation_dim());
        assert!(obs.iter().all(|&x| (0.0..=1.0).contains(&x)));
    }
}

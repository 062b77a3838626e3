//! Training statistics for PPO
//!
//! One [`TrainingStats`] per minibatch update; a learn call returns their
//! average.

use std::ops::AddAssign;

/// Statistics for one or more PPO minibatch updates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingStats {
    /// Policy loss (summed across heads)
    pub policy_loss: f64,

    /// Value function loss
    pub value_loss: f64,

    /// Joint entropy of the action heads
    pub entropy: f64,

    /// Total loss (weighted sum of policy, value, and entropy losses)
    pub total_loss: f64,

    /// Fraction of clipped per-head ratios
    pub clip_fraction: f64,

    /// Approximate KL divergence between old and new policies
    pub approx_kl: f64,

    /// Explained variance of value function predictions
    pub explained_var: f64,

    /// Learning rate in effect for the update
    pub learning_rate: f64,

    /// Number of gradient updates aggregated
    pub num_updates: usize,
}

impl TrainingStats {
    /// Create zero-initialized statistics
    pub fn zeros() -> Self {
        Self::default()
    }

    /// Compute average statistics across the aggregated updates
    pub fn average(&self) -> Self {
        if self.num_updates == 0 {
            return Self::zeros();
        }
        let scale = self.num_updates as f64;

        Self {
            policy_loss: self.policy_loss / scale,
            value_loss: self.value_loss / scale,
            entropy: self.entropy / scale,
            total_loss: self.total_loss / scale,
            clip_fraction: self.clip_fraction / scale,
            approx_kl: self.approx_kl / scale,
            explained_var: self.explained_var / scale,
            learning_rate: self.learning_rate / scale,
            num_updates: self.num_updates,
        }
    }
}

impl AddAssign<&TrainingStats> for TrainingStats {
    fn add_assign(&mut self, other: &TrainingStats) {
        self.policy_loss += other.policy_loss;
        self.value_loss += other.value_loss;
        self.entropy += other.entropy;
        self.total_loss += other.total_loss;
        self.clip_fraction += other.clip_fraction;
        self.approx_kl += other.approx_kl;
        self.explained_var += other.explained_var;
        self.learning_rate += other.learning_rate;
        self.num_updates += other.num_updates;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average() {
        let mut sum = TrainingStats::zeros();
        sum += &TrainingStats { policy_loss: 1.0, value_loss: 4.0, num_updates: 1, ..Default::default() };
        sum += &TrainingStats { policy_loss: 3.0, value_loss: 2.0, num_updates: 1, ..Default::default() };

        let avg = sum.average();
        assert_eq!(avg.policy_loss, 2.0);
        assert_eq!(avg.value_loss, 3.0);
        assert_eq!(avg.num_updates, 2);
    }

    #[test]
    fn test_average_of_nothing() {
        assert_eq!(TrainingStats::zeros().average(), TrainingStats::zeros());
    }
}

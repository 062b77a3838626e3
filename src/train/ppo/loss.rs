//! Loss computation functions for PPO
//!
//! Policy terms work on `[B, H]` tensors: one column per action head. The
//! clipped surrogate is formed per head, averaged over the batch, and the
//! head losses are summed into one scalar.

use tch::{Kind, Tensor};

/// Compute the multi-head clipped PPO policy loss
///
/// Returns (policy_loss, clip_fraction, approx_kl)
///
/// # Arguments
/// * `log_probs` - Per-head log probabilities under the current policy `[B, H]`
/// * `old_log_probs` - Per-head log probabilities recorded at sampling time `[B, H]`
/// * `advantages` - One advantage per sample `[B]`, shared by every head
/// * `clip_range` - PPO clipping parameter (epsilon)
pub fn compute_policy_loss(
    log_probs: &Tensor,
    old_log_probs: &Tensor,
    advantages: &Tensor,
    clip_range: f64,
) -> (Tensor, f64, f64) {
    let ratio = (log_probs - old_log_probs).exp();
    let advantages = advantages.unsqueeze(-1);

    let surrogate = &advantages * &ratio;
    let clipped = &advantages * ratio.clamp(1.0 - clip_range, 1.0 + clip_range);
    let per_head = -surrogate.minimum(&clipped);
    let policy_loss = per_head.sum_dim_intlist(1, false, Kind::Float).mean(Kind::Float);

    // Diagnostics only; no gradients flow through these
    let (clip_fraction, approx_kl) = tch::no_grad(|| {
        let clip_fraction =
            (&ratio - 1.0).abs().greater(clip_range).to_kind(Kind::Float).mean(Kind::Float);
        let approx_kl = (old_log_probs - log_probs).sum_dim_intlist(1, false, Kind::Float).mean(Kind::Float);
        (clip_fraction.double_value(&[]), approx_kl.double_value(&[]))
    });

    (policy_loss, clip_fraction, approx_kl)
}

/// Compute the value loss against GAE returns
///
/// The regression target is `advantage + old_value`. Returns
/// (value_loss, explained_variance).
///
/// # Arguments
/// * `values` - Current value predictions `[B]`
/// * `old_values` - Value estimates recorded at sampling time `[B]`
/// * `advantages` - Unnormalized advantages `[B]`
pub fn compute_value_loss(values: &Tensor, old_values: &Tensor, advantages: &Tensor) -> (Tensor, f64) {
    let returns = advantages + old_values;
    let value_loss = (&returns - values).square().mean(Kind::Float);

    let explained_var = tch::no_grad(|| {
        let var_returns = returns.var(false).double_value(&[]);
        if var_returns == 0.0 {
            // Perfect prediction if no variance in returns
            1.0
        } else {
            1.0 - (&returns - values).var(false).double_value(&[]) / var_returns
        }
    });

    (value_loss, explained_var)
}

/// Compute entropy loss (negative entropy for maximization)
pub fn compute_entropy_loss(entropy: &Tensor) -> Tensor {
    -entropy.mean(Kind::Float)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(t: &Tensor) -> f64 {
        t.double_value(&[])
    }

    #[test]
    fn test_unchanged_policy_loss_is_negative_mean_advantage_per_head() {
        let log_probs = Tensor::from_slice(&[-1.0_f32, -0.5, -2.0, -0.1]).view([2, 2]);
        let advantages = Tensor::from_slice(&[1.0_f32, 3.0]);

        let (loss, clip_fraction, approx_kl) =
            compute_policy_loss(&log_probs, &log_probs, &advantages, 0.2);

        // ratio = 1 everywhere: each head contributes -mean(A) = -2
        assert!((scalar(&loss) + 4.0).abs() < 1e-6);
        assert_eq!(clip_fraction, 0.0);
        assert!(approx_kl.abs() < 1e-9);
    }

    #[test]
    fn test_ratio_is_clipped_for_positive_advantage() {
        // new/old ratio = e^1 ≈ 2.718, clipped to 1.2
        let old = Tensor::from_slice(&[-2.0_f32]).view([1, 1]);
        let new = Tensor::from_slice(&[-1.0_f32]).view([1, 1]);
        let advantages = Tensor::from_slice(&[2.0_f32]);

        let (loss, clip_fraction, _) = compute_policy_loss(&new, &old, &advantages, 0.2);
        assert!((scalar(&loss) + 2.4).abs() < 1e-5);
        assert_eq!(clip_fraction, 1.0);
    }

    #[test]
    fn test_ratio_is_not_clipped_for_negative_advantage() {
        // The pessimistic bound keeps the unclipped term when it is worse
        let old = Tensor::from_slice(&[-2.0_f32]).view([1, 1]);
        let new = Tensor::from_slice(&[-1.0_f32]).view([1, 1]);
        let advantages = Tensor::from_slice(&[-1.0_f32]);

        let (loss, _, _) = compute_policy_loss(&new, &old, &advantages, 0.2);
        assert!((scalar(&loss) - 1.0_f64.exp()).abs() < 1e-5);
    }

    #[test]
    fn test_value_loss_targets_advantage_plus_old_value() {
        let values = Tensor::from_slice(&[1.0_f32, 2.0]);
        let old_values = Tensor::from_slice(&[0.5_f32, 0.5]);
        let advantages = Tensor::from_slice(&[0.5_f32, 0.5]);

        // targets = [1, 1]; errors = [0, 1]
        let (loss, _) = compute_value_loss(&values, &old_values, &advantages);
        assert!((scalar(&loss) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_entropy_loss_sign() {
        let entropy = Tensor::from(0.7_f32);
        assert!((scalar(&compute_entropy_loss(&entropy)) + 0.7).abs() < 1e-6);
    }
}

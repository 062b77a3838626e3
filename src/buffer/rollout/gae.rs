//! Generalized Advantage Estimation (GAE) computation
//!
//! This module implements GAE for computing advantages from a rollout.
//! GAE trades bias for variance through the λ mixing factor.

use crate::error::{CoreError, Result};

/// Compute Generalized Advantage Estimation (GAE)
///
/// `values` carries one more entry than `rewards`: `values[t + 1]` is the
/// bootstrap for step `t`. `dones[t]` zeroes that bootstrap when step `t`
/// ended a game. The exponentially weighted sum is *not* cut at a done
/// flag; only the bootstrap term is.
///
/// # Arguments
/// * `rewards` - Rewards `r[0..n)`
/// * `values` - Value estimates `v[0..n]`
/// * `dones` - Terminal flags `d[0..n)`
/// * `gamma` - Discount factor (0 < gamma <= 1)
/// * `gae_lambda` - GAE lambda parameter (0 < lambda <= 1)
///
/// # Mathematical Formula
/// ```text
/// δ_t = r_t + γ * V_{t+1} * (1 - d_t) - V_t
/// A_t = Σ_{k=t}^{n-1} (γλ)^{k-t} δ_k  =  δ_t + γ * λ * A_{t+1}
/// ```
pub fn compute_gae(
    rewards: &[f32],
    values: &[f32],
    dones: &[bool],
    gamma: f32,
    gae_lambda: f32,
) -> Result<Vec<f32>> {
    let n = rewards.len();
    if values.len() != n + 1 {
        return Err(CoreError::ShapeMismatch {
            what: "GAE values (rewards + bootstrap)",
            expected: n + 1,
            actual: values.len(),
        });
    }
    if dones.len() != n {
        return Err(CoreError::ShapeMismatch { what: "GAE dones", expected: n, actual: dones.len() });
    }

    let mut advantages = vec![0.0; n];
    let mut gae = 0.0;

    // Backward iteration through the rollout
    for t in (0..n).rev() {
        let next_non_terminal = if dones[t] { 0.0 } else { 1.0 };
        let delta = rewards[t] + gamma * values[t + 1] * next_non_terminal - values[t];
        gae = delta + gamma * gae_lambda * gae;
        advantages[t] = gae;
    }

    Ok(advantages)
}

/// Advantages for a rollout where every transition stores its own value
///
/// Only the first `n - 1` transitions have a bootstrap value, so the last
/// transition's advantage is left at `0.0`. Whether that boundary is an
/// intentional truncation is an open question; it is kept as-is.
pub fn rollout_advantages(
    rewards: &[f32],
    values: &[f32],
    dones: &[bool],
    gamma: f32,
    gae_lambda: f32,
) -> Result<Vec<f32>> {
    let n = rewards.len();
    if values.len() != n {
        return Err(CoreError::ShapeMismatch { what: "rollout values", expected: n, actual: values.len() });
    }
    if dones.len() != n {
        return Err(CoreError::ShapeMismatch { what: "rollout dones", expected: n, actual: dones.len() });
    }
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut advantages = compute_gae(&rewards[..n - 1], values, &dones[..n - 1], gamma, gae_lambda)?;
    advantages.push(0.0);
    Ok(advantages)
}

/// Normalize advantages to zero mean and unit variance in place
pub fn normalize_advantages(advantages: &mut [f32]) {
    if advantages.is_empty() {
        return;
    }

    let n = advantages.len() as f32;
    let mean: f32 = advantages.iter().sum::<f32>() / n;
    let variance: f32 = advantages.iter().map(|&x| (x - mean).powi(2)).sum::<f32>() / n;
    let std = variance.sqrt().max(1e-8); // Avoid division by zero

    for a in advantages.iter_mut() {
        *a = (*a - mean) / std;
    }
}

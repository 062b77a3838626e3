//! Tests for rollout buffer functionality

use rand::{rngs::StdRng, SeedableRng};

use super::*;

fn transition(obs: [f32; 3], action: i64, value: f32, reward: f32, done: bool) -> Transition {
    Transition {
        observation: obs.to_vec(),
        action: vec![action],
        log_probs: vec![-1.386],
        value,
        reward,
        done,
    }
}

mod gae_tests {
    use super::*;

    #[test]
    fn test_gae_hand_computed_example() {
        // γ = λ = 0.9, zero values, no terminals:
        // a[1] = 1, a[0] = 1 + 0.81 * 1 = 1.81
        let advantages = compute_gae(&[1.0, 1.0], &[0.0, 0.0, 0.0], &[false, false], 0.9, 0.9).unwrap();

        assert!((advantages[1] - 1.0).abs() < 1e-6, "a[1] = {}", advantages[1]);
        assert!((advantages[0] - 1.81).abs() < 1e-6, "a[0] = {}", advantages[0]);
    }

    #[test]
    fn test_gae_matches_direct_sum() {
        let rewards = [1.0, 0.0, 1.0, 0.0];
        let values = [0.5, 0.5, 0.5, 0.5, 0.0];
        let dones = [false, false, false, true];
        let (gamma, lambda) = (0.99_f64, 0.95_f64);

        let advantages = compute_gae(&rewards, &values, &dones, gamma as f32, lambda as f32).unwrap();

        // Σ_{k=t}^{n-1} (γλ)^{k-t} δ_k evaluated term by term in f64
        for t in 0..rewards.len() {
            let mut expected = 0.0_f64;
            let mut discount = 1.0_f64;
            for k in t..rewards.len() {
                let not_done = if dones[k] { 0.0 } else { 1.0 };
                expected += discount
                    * (rewards[k] as f64 + gamma * values[k + 1] as f64 * not_done - values[k] as f64);
                discount *= gamma * lambda;
            }
            assert!(
                (advantages[t] as f64 - expected).abs() < 1e-5,
                "step {t}: got {}, expected {expected}",
                advantages[t]
            );
        }
    }

    #[test]
    fn test_gae_end_to_end_reference() {
        let advantages = compute_gae(
            &[1.0, 0.0, 1.0, 0.0],
            &[0.5, 0.5, 0.5, 0.5, 0.0],
            &[false, false, false, true],
            0.99,
            0.95,
        )
        .unwrap();

        let reference = [1.454_46_f32, 0.488_527_4, 0.524_75, -0.5];
        for (got, want) in advantages.iter().zip(reference) {
            assert!((got - want).abs() < 1e-5, "got {got}, want {want}");
        }
    }

    #[test]
    fn test_gae_zero_rewards_constant_values_undiscounted() {
        let advantages = compute_gae(&[0.0; 5], &[2.5; 6], &[false; 5], 1.0, 0.95).unwrap();
        assert!(advantages.iter().all(|&a| a.abs() < 1e-6));
    }

    #[test]
    fn test_gae_terminal_blocks_bootstrap_only() {
        // With done at step 0 the bootstrap v[1] is ignored for δ_0, but the
        // weighted sum still includes δ_1.
        let advantages = compute_gae(&[0.0, 1.0], &[0.0, 10.0, 0.0], &[true, false], 1.0, 1.0).unwrap();
        // δ_1 = 1 + 0 - 10 = -9 ; δ_0 = 0 + 0 - 0 = 0 ; a[0] = 0 + (-9)
        assert!((advantages[1] + 9.0).abs() < 1e-6);
        assert!((advantages[0] + 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_gae_length_checks() {
        assert!(matches!(
            compute_gae(&[1.0, 1.0], &[0.0, 0.0], &[false, false], 0.99, 0.95),
            Err(CoreError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            compute_gae(&[1.0], &[0.0, 0.0], &[], 0.99, 0.95),
            Err(CoreError::ShapeMismatch { .. })
        ));
    }

    /// Known edge case awaiting product-owner confirmation: the final stored
    /// transition has no bootstrap value, so its advantage stays at zero even
    /// when its reward is large.
    #[test]
    fn test_final_transition_advantage_is_zero_known_edge_case() {
        let advantages =
            rollout_advantages(&[1.0, 1.0, 50.0], &[0.0, 0.0, 0.0], &[false, false, true], 0.9, 0.9)
                .unwrap();

        assert_eq!(advantages.len(), 3);
        assert!((advantages[0] - 1.81).abs() < 1e-6);
        assert!((advantages[1] - 1.0).abs() < 1e-6);
        assert_eq!(advantages[2], 0.0);
    }

    #[test]
    fn test_rollout_advantages_single_transition() {
        let advantages = rollout_advantages(&[3.0], &[1.0], &[true], 0.99, 0.95).unwrap();
        assert_eq!(advantages, vec![0.0]);
    }

    #[test]
    fn test_normalize_advantages() {
        let mut advantages = vec![1.0, 2.0, 3.0, 4.0];
        normalize_advantages(&mut advantages);

        let mean: f32 = advantages.iter().sum::<f32>() / 4.0;
        assert!(mean.abs() < 1e-6);
        assert!(advantages[0] < 0.0 && advantages[3] > 0.0);
    }
}

mod buffer_tests {
    use super::*;

    #[test]
    fn test_store_and_arrays() {
        let mut buffer = RolloutBuffer::new(3, 1);
        buffer.store(transition([1.0, 2.0, 3.0], 2, 0.5, 1.0, false)).unwrap();
        buffer.store(transition([4.0, 5.0, 6.0], 0, 0.4, 0.0, true)).unwrap();

        let arrays = buffer.arrays();
        assert_eq!(arrays.len(), 2);
        assert_eq!(arrays.observation(1), &[4.0, 5.0, 6.0]);
        assert_eq!(arrays.action(0), &[2]);
        assert_eq!(arrays.values, &[0.5, 0.4]);
        assert_eq!(arrays.dones, &[false, true]);
    }

    #[test]
    fn test_store_rejects_bad_shapes() {
        let mut buffer = RolloutBuffer::new(3, 2);
        let bad_obs = Transition {
            observation: vec![0.0; 2],
            action: vec![0, 0],
            log_probs: vec![0.0, 0.0],
            value: 0.0,
            reward: 0.0,
            done: false,
        };
        assert!(matches!(buffer.store(bad_obs), Err(CoreError::ShapeMismatch { .. })));

        let bad_heads = Transition {
            observation: vec![0.0; 3],
            action: vec![0],
            log_probs: vec![0.0, 0.0],
            value: 0.0,
            reward: 0.0,
            done: false,
        };
        assert!(buffer.store(bad_heads).is_err());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_generate_batches_is_a_partition() {
        let mut buffer = RolloutBuffer::with_seed(3, 1, 11);
        for i in 0..10 {
            buffer.store(transition([i as f32; 3], 0, 0.0, 0.0, false)).unwrap();
        }

        let (arrays, groups) = buffer.generate_batches(4).unwrap();
        assert_eq!(arrays.len(), 10);

        // ceil(10 / 4) = 3 groups, the last one shorter
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].len(), 4);
        assert_eq!(groups[1].len(), 4);
        assert_eq!(groups[2].len(), 2);

        let mut all: Vec<usize> = groups.into_iter().flatten().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_generate_batches_leaves_arrays_unmodified() {
        let mut buffer = RolloutBuffer::with_seed(3, 1, 5);
        for i in 0..6 {
            buffer.store(transition([i as f32, 0.0, 0.0], i, i as f32, i as f32, false)).unwrap();
        }

        let (arrays, _) = buffer.generate_batches(2).unwrap();
        assert_eq!(arrays.rewards, &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(arrays.actions, &[0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_generate_batches_on_empty_buffer() {
        let mut buffer = RolloutBuffer::new(3, 1);
        assert!(matches!(buffer.generate_batches(2), Err(CoreError::EmptyBuffer)));
    }

    #[test]
    fn test_generate_batches_zero_batch_size() {
        let mut buffer = RolloutBuffer::new(3, 1);
        buffer.store(transition([0.0; 3], 0, 0.0, 0.0, false)).unwrap();
        assert!(matches!(buffer.generate_batches(0), Err(CoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_clear_then_store_matches_fresh_buffer() {
        let mut reused = RolloutBuffer::with_seed(3, 1, 42);
        reused.store(transition([9.0; 3], 3, 9.0, 9.0, true)).unwrap();
        reused.store(transition([8.0; 3], 2, 8.0, 8.0, false)).unwrap();
        reused.clear();
        assert!(reused.is_empty());

        let mut fresh = RolloutBuffer::with_seed(3, 1, 42);

        let step = transition([1.0, 2.0, 3.0], 1, 0.5, 1.0, false);
        reused.store(step.clone()).unwrap();
        fresh.store(step).unwrap();

        let (a, b) = (reused.arrays(), fresh.arrays());
        assert_eq!(a.len(), 1);
        assert_eq!(a.observations, b.observations);
        assert_eq!(a.actions, b.actions);
        assert_eq!(a.log_probs, b.log_probs);
        assert_eq!(a.values, b.values);
        assert_eq!(a.rewards, b.rewards);
        assert_eq!(a.dones, b.dones);
        assert_eq!(reused.advantages(0.99, 0.95).unwrap(), fresh.advantages(0.99, 0.95).unwrap());
    }

    #[test]
    fn test_gather_minibatch() {
        let mut buffer = RolloutBuffer::new(3, 1);
        for i in 0..4 {
            buffer.store(transition([i as f32; 3], i, i as f32 * 0.1, 0.0, false)).unwrap();
        }
        let advantages = [10.0, 11.0, 12.0, 13.0];

        let batch = buffer.arrays().gather(&[3, 1], &advantages);
        assert_eq!(batch.obs_shape(), (2, 3));
        assert_eq!(batch.head_shape(), (2, 1));
        assert_eq!(batch.observations, vec![3.0, 3.0, 3.0, 1.0, 1.0, 1.0]);
        assert_eq!(batch.actions, vec![3, 1]);
        assert_eq!(batch.advantages, vec![13.0, 11.0]);
    }
}

mod sampling_tests {
    use super::*;

    #[test]
    fn test_minibatch_indices() {
        let mut rng = StdRng::seed_from_u64(0);
        let batches = generate_minibatch_indices(100, 32, &mut rng);

        // Should have ceil(100/32) = 4 batches
        assert_eq!(batches.len(), 4);
        assert_eq!(batches[3].len(), 4);

        let mut all_indices: Vec<usize> = batches.into_iter().flatten().collect();
        all_indices.sort_unstable();
        assert_eq!(all_indices, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_minibatch_indices_shuffle() {
        let mut rng = StdRng::seed_from_u64(1);
        let flat1: Vec<usize> = generate_minibatch_indices(50, 10, &mut rng).into_iter().flatten().collect();
        let flat2: Vec<usize> = generate_minibatch_indices(50, 10, &mut rng).into_iter().flatten().collect();

        // Not a perfect test, but very unlikely to fail
        assert_ne!(flat1, flat2);
    }

    #[test]
    fn test_seeded_shuffles_repeat() {
        let a = generate_minibatch_indices(20, 6, &mut StdRng::seed_from_u64(3));
        let b = generate_minibatch_indices(20, 6, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }
}

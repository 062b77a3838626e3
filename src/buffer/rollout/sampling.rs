//! Minibatch index generation
//!
//! PPO revisits the same rollout several times per update; every pass uses
//! a fresh permutation of the stored indices.

use rand::{seq::SliceRandom, Rng};

/// Generate minibatch indices for PPO training
///
/// Shuffles `0..buffer_size` uniformly and partitions the permutation into
/// contiguous runs of `batch_size`. The last run may be shorter.
///
/// # Arguments
/// * `buffer_size` - Total number of samples in buffer
/// * `batch_size` - Desired size of each minibatch (must be non-zero)
/// * `rng` - Source of randomness for the shuffle
///
/// # Returns
/// Vector of vectors, where each inner vector contains indices for one minibatch
pub fn generate_minibatch_indices<R: Rng + ?Sized>(
    buffer_size: usize,
    batch_size: usize,
    rng: &mut R,
) -> Vec<Vec<usize>> {
    let mut indices: Vec<usize> = (0..buffer_size).collect();
    indices.shuffle(rng);

    indices
        .chunks(batch_size)
        .map(|chunk| chunk.to_vec())
        .collect()
}

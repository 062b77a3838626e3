//! Error taxonomy for the learning core
//!
//! Construction-time problems (bad hyperparameters, head layouts that do not
//! match the environment) surface as [`CoreError::InvalidConfig`] or
//! [`CoreError::ActionSpaceMismatch`] before any inference happens.
//! Numerical divergence during an update is fatal and always propagated.
//! A missing checkpoint is *not* an error; see
//! [`crate::checkpoint::LoadOutcome`].

use thiserror::Error;

/// Errors produced by buffers, networks, and update loops
#[derive(Debug, Error)]
pub enum CoreError {
    /// A hyperparameter or structural setting is out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Policy head layout disagrees with the environment's action contract
    #[error("action space mismatch: policy heads {expected:?}, environment {actual:?}")]
    ActionSpaceMismatch {
        /// Cardinalities the policy was built with
        expected: Vec<i64>,
        /// Cardinalities the environment reports
        actual: Vec<i64>,
    },

    /// A vector or tensor has the wrong length
    #[error("{what}: expected length {expected}, got {actual}")]
    ShapeMismatch {
        /// Which input was malformed
        what: &'static str,
        /// Required length
        expected: usize,
        /// Length actually supplied
        actual: usize,
    },

    /// An action value lies outside its head's cardinality
    #[error("action head {head}: value {value} outside [0, {cardinality})")]
    ActionOutOfRange {
        /// Head index
        head: usize,
        /// Value supplied
        value: i64,
        /// Number of choices the head has
        cardinality: i64,
    },

    /// Minibatches were requested from a buffer with no transitions
    #[error("cannot generate minibatches from an empty rollout buffer")]
    EmptyBuffer,

    /// The loss became NaN or infinite
    #[error("numerical divergence at epoch {epoch}, minibatch {batch}: loss = {loss}")]
    NumericalDivergence {
        /// Epoch index within the learn call
        epoch: usize,
        /// Minibatch index within the epoch
        batch: usize,
        /// Offending loss value
        loss: f64,
    },

    /// An accelerator was requested that this machine does not have
    #[error("compute target unavailable: {0}")]
    UnavailableDevice(String),

    /// Error raised by libtorch
    #[error(transparent)]
    Tensor(#[from] tch::TchError),

    /// Filesystem error while reading or writing checkpoints
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed configuration file
    #[error(transparent)]
    Config(#[from] serde_json::Error),
}

/// Result alias used throughout the core
pub type Result<T> = std::result::Result<T, CoreError>;

//! Multi-discrete action spaces
//!
//! An action is a fixed tuple of independent discrete choices. The game's
//! action tuple is an action type followed by two board indices and eight
//! card-count slots used for trades and discards.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Number of distinct action types the game backend accepts
pub const CATAN_ACTION_TYPES: i64 = 15;

/// Number of edge/node slots an action may reference
pub const CATAN_BOARD_INDICES: i64 = 72;

/// Range of card amounts per trade slot
pub const CATAN_CARD_AMOUNTS: i64 = 10;

/// Ordered list of per-head cardinalities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<i64>", into = "Vec<i64>")]
pub struct ActionSpace {
    cardinalities: Vec<i64>,
}

impl ActionSpace {
    /// Create an action space, rejecting empty layouts and empty heads
    pub fn new(cardinalities: Vec<i64>) -> Result<Self> {
        if cardinalities.is_empty() {
            return Err(CoreError::InvalidConfig(
                "action space needs at least one head".to_string(),
            ));
        }
        if let Some(head) = cardinalities.iter().position(|&n| n < 1) {
            return Err(CoreError::InvalidConfig(format!(
                "action head {head} has cardinality {}; every head needs at least one choice",
                cardinalities[head]
            )));
        }
        Ok(Self { cardinalities })
    }

    /// The game's 11-head layout: `[15, 72, 72, 10 × 8]`
    pub fn catan() -> Self {
        let mut cardinalities = vec![CATAN_ACTION_TYPES, CATAN_BOARD_INDICES, CATAN_BOARD_INDICES];
        cardinalities.extend(std::iter::repeat(CATAN_CARD_AMOUNTS).take(8));
        Self { cardinalities }
    }

    /// Per-head cardinalities
    pub fn cardinalities(&self) -> &[i64] {
        &self.cardinalities
    }

    /// Number of heads
    pub fn num_heads(&self) -> usize {
        self.cardinalities.len()
    }

    /// Sum of all cardinalities (width of a flat Q-value output)
    pub fn total_choices(&self) -> i64 {
        self.cardinalities.iter().sum()
    }

    /// Start offset of each head inside a flat concatenated output
    pub fn offsets(&self) -> Vec<i64> {
        self.cardinalities
            .iter()
            .scan(0, |acc, &n| {
                let start = *acc;
                *acc += n;
                Some(start)
            })
            .collect()
    }

    /// Check an action tuple against this space
    pub fn validate_action(&self, action: &[i64]) -> Result<()> {
        if action.len() != self.num_heads() {
            return Err(CoreError::ShapeMismatch {
                what: "action heads",
                expected: self.num_heads(),
                actual: action.len(),
            });
        }
        for (head, (&a, &n)) in action.iter().zip(&self.cardinalities).enumerate() {
            if !(0..n).contains(&a) {
                return Err(CoreError::ActionOutOfRange { head, value: a, cardinality: n });
            }
        }
        Ok(())
    }

    /// Fail unless `other` has exactly the same heads
    pub fn ensure_matches(&self, other: &ActionSpace) -> Result<()> {
        if self != other {
            return Err(CoreError::ActionSpaceMismatch {
                expected: self.cardinalities.clone(),
                actual: other.cardinalities.clone(),
            });
        }
        Ok(())
    }
}

impl TryFrom<Vec<i64>> for ActionSpace {
    type Error = CoreError;

    fn try_from(cardinalities: Vec<i64>) -> Result<Self> {
        Self::new(cardinalities)
    }
}

impl From<ActionSpace> for Vec<i64> {
    fn from(space: ActionSpace) -> Self {
        space.cardinalities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catan_layout() {
        let space = ActionSpace::catan();
        assert_eq!(space.num_heads(), 11);
        assert_eq!(space.cardinalities()[..3], [15, 72, 72]);
        assert_eq!(space.total_choices(), 15 + 72 + 72 + 80);
    }

    #[test]
    fn test_rejects_bad_layouts() {
        assert!(ActionSpace::new(vec![]).is_err());
        assert!(ActionSpace::new(vec![4, 0]).is_err());
        assert!(ActionSpace::new(vec![4, 2]).is_ok());
    }

    #[test]
    fn test_offsets() {
        let space = ActionSpace::new(vec![3, 5, 2]).unwrap();
        assert_eq!(space.offsets(), vec![0, 3, 8]);
    }

    #[test]
    fn test_validate_action() {
        let space = ActionSpace::new(vec![3, 5]).unwrap();
        assert!(space.validate_action(&[2, 4]).is_ok());
        assert!(matches!(
            space.validate_action(&[3, 0]),
            Err(CoreError::ActionOutOfRange { head: 0, value: 3, cardinality: 3 })
        ));
        assert!(space.validate_action(&[0]).is_err());
    }

    #[test]
    fn test_mismatch_is_reported() {
        let a = ActionSpace::new(vec![15, 72]).unwrap();
        let b = ActionSpace::new(vec![16, 72]).unwrap();
        assert!(matches!(a.ensure_matches(&b), Err(CoreError::ActionSpaceMismatch { .. })));
        assert!(a.ensure_matches(&a.clone()).is_ok());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: ActionSpace = serde_json::from_str("[4, 2]").unwrap();
        assert_eq!(ok.num_heads(), 2);
        assert!(serde_json::from_str::<ActionSpace>("[4, -1]").is_err());
    }
}

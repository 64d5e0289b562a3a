//! Weight snapshots
//!
//! A snapshot is one participant's model state at a point in time. It is
//! treated as an opaque flat payload by the exchange protocol; only the
//! privacy and averaging mechanisms look inside.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// An immutable flat view of model weights at a point in time.
///
/// Two snapshots exist per exchange round: the stale snapshot the round
/// started from and the updated snapshot produced by local training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightSnapshot(Vec<f32>);

impl WeightSnapshot {
    /// Create a snapshot from raw weight values
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    /// Create an all-zero snapshot of the given dimension
    pub fn zeros(dim: usize) -> Self {
        Self(vec![0.0; dim])
    }

    /// Number of weight values
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the snapshot holds no values
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the weight values
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Consume the snapshot, yielding its values
    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// Euclidean norm of the weight values
    pub fn l2_norm(&self) -> f32 {
        self.0.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    /// Element-wise difference `self - other`
    pub fn delta(&self, other: &WeightSnapshot) -> Result<WeightSnapshot> {
        if self.len() != other.len() {
            return Err(Error::ShapeMismatch);
        }
        Ok(Self(
            self.0.iter().zip(&other.0).map(|(a, b)| a - b).collect(),
        ))
    }

    /// Element-wise sum `self + delta`
    pub fn offset(&self, delta: &WeightSnapshot) -> Result<WeightSnapshot> {
        if self.len() != delta.len() {
            return Err(Error::ShapeMismatch);
        }
        Ok(Self(
            self.0.iter().zip(&delta.0).map(|(a, b)| a + b).collect(),
        ))
    }
}

impl From<Vec<f32>> for WeightSnapshot {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

impl AsRef<[f32]> for WeightSnapshot {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

//! Weight averaging
//!
//! The averaging seam combines the snapshots received from peers into the
//! next round's starting point. The exchange protocol treats the call as an
//! atomic external operation.

use crate::snapshot::WeightSnapshot;
use crate::{Error, Result};

/// Trait for weight averaging mechanisms
pub trait WeightAverager: Send + Sync {
    /// Average a collection of snapshots into one.
    ///
    /// A single-element collection must yield that element unchanged.
    fn average(&self, snapshots: &[WeightSnapshot]) -> Result<WeightSnapshot>;
}

/// Uniform element-wise mean
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanAverager;

impl WeightAverager for MeanAverager {
    fn average(&self, snapshots: &[WeightSnapshot]) -> Result<WeightSnapshot> {
        if snapshots.is_empty() {
            return Err(Error::EmptyAggregation);
        }
        // Degenerate quorum-of-one: hand the contribution back untouched.
        if snapshots.len() == 1 {
            return Ok(snapshots[0].clone());
        }

        let dim = snapshots[0].len();
        for snapshot in &snapshots[1..] {
            if snapshot.len() != dim {
                return Err(Error::ShapeMismatch);
            }
        }

        let n = snapshots.len() as f32;
        let mut result = vec![0.0f32; dim];
        for snapshot in snapshots {
            for (acc, &v) in result.iter_mut().zip(snapshot.as_slice()) {
                *acc += v / n;
            }
        }

        Ok(WeightSnapshot::new(result))
    }
}

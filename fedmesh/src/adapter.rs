//! Privacy/aggregation adapter
//!
//! The seam between the exchange protocol and the external privacy and
//! averaging mechanisms. The adapter implements no numeric logic of its
//! own; the coordinator calls each side exactly once per round.

use std::sync::Arc;

use fedmesh_core::aggregation::WeightAverager;
use fedmesh_core::privacy::NoiseMechanism;
use fedmesh_core::snapshot::WeightSnapshot;
use fedmesh_core::task::TaskConfig;
use fedmesh_core::Result;

/// Bridges the round coordinator to the noise and averaging mechanisms
pub struct PrivacyAdapter {
    noise: Arc<dyn NoiseMechanism>,
    averager: Arc<dyn WeightAverager>,
}

impl PrivacyAdapter {
    /// Create an adapter over the given mechanisms
    pub fn new(noise: Arc<dyn NoiseMechanism>, averager: Arc<dyn WeightAverager>) -> Self {
        Self { noise, averager }
    }

    /// Perturb the round's local result before it is shared
    pub fn perturb(
        &self,
        updated: &WeightSnapshot,
        stale: &WeightSnapshot,
        task: &TaskConfig,
    ) -> Result<WeightSnapshot> {
        self.noise.add_noise(updated, stale, task)
    }

    /// Combine the round's received snapshots into one.
    ///
    /// The input is the keyed-by-sender collection drained from the
    /// messenger, one entry per distinct contributor; coincidentally
    /// identical snapshots each count.
    pub fn aggregate(&self, snapshots: &[WeightSnapshot]) -> Result<WeightSnapshot> {
        self.averager.average(snapshots)
    }
}

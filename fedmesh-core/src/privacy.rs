//! Privacy noise mechanisms
//!
//! Before a participant shares its local result, the round's update is
//! perturbed so that no peer learns the exact training outcome. The
//! mechanism is a seam: the protocol calls it once per round with the
//! updated and stale snapshots and the task configuration.

use std::sync::Mutex;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::snapshot::WeightSnapshot;
use crate::task::TaskConfig;
use crate::{Error, Result};

/// Trait for privacy noise mechanisms
pub trait NoiseMechanism: Send + Sync {
    /// Perturb the round's update.
    ///
    /// `updated` is the snapshot after local training, `stale` the snapshot
    /// the round started from. Returns the snapshot to share with peers.
    fn add_noise(
        &self,
        updated: &WeightSnapshot,
        stale: &WeightSnapshot,
        task: &TaskConfig,
    ) -> Result<WeightSnapshot>;
}

/// Clipped-Gaussian mechanism.
///
/// The update delta (`updated - stale`) has its L2 norm clipped to the
/// task's `clipping_radius`, then zero-mean Gaussian noise with standard
/// deviation `noise_scale` is added per coordinate. Either parameter may be
/// absent; with neither configured the updated snapshot passes through
/// unchanged.
pub struct GaussianNoise {
    rng: Mutex<ChaCha8Rng>,
}

impl GaussianNoise {
    /// Create a mechanism seeded from system entropy
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::from_entropy()),
        }
    }

    /// Create a deterministically seeded mechanism
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }
}

impl Default for GaussianNoise {
    fn default() -> Self {
        Self::new()
    }
}

/// Sample a standard normal value via the Box-Muller transform
fn standard_normal<R: Rng>(rng: &mut R) -> f32 {
    let u1: f32 = rng.gen::<f32>().max(f32::MIN_POSITIVE);
    let u2: f32 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (core::f32::consts::TAU * u2).cos()
}

impl NoiseMechanism for GaussianNoise {
    fn add_noise(
        &self,
        updated: &WeightSnapshot,
        stale: &WeightSnapshot,
        task: &TaskConfig,
    ) -> Result<WeightSnapshot> {
        if updated.len() != stale.len() {
            return Err(Error::ShapeMismatch);
        }
        if task.noise_scale.is_none() && task.clipping_radius.is_none() {
            return Ok(updated.clone());
        }

        let mut delta = updated.delta(stale)?.into_inner();

        if let Some(radius) = task.clipping_radius {
            let norm = delta.iter().map(|v| v * v).sum::<f32>().sqrt();
            if norm > radius {
                let factor = radius / norm;
                for v in &mut delta {
                    *v *= factor;
                }
            }
        }

        if let Some(scale) = task.noise_scale {
            let mut rng = match self.rng.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            for v in &mut delta {
                *v += standard_normal(&mut *rng) * scale;
            }
        }

        stale.offset(&WeightSnapshot::new(delta))
    }
}

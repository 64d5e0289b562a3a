//! # fedmesh Core
//!
//! Core types and algorithm seams for fedmesh collaborative learning.
//!
//! This crate provides:
//! - Weight snapshots and peer identities
//! - The weight codec seam and its postcard reference implementation
//! - The privacy-noise and averaging seams with reference implementations
//! - Per-task configuration

pub mod aggregation;
pub mod codec;
pub mod identity;
pub mod privacy;
pub mod snapshot;
pub mod task;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::aggregation::{MeanAverager, WeightAverager};
    pub use crate::codec::{PostcardCodec, WeightCodec};
    pub use crate::identity::PeerId;
    pub use crate::privacy::{GaussianNoise, NoiseMechanism};
    pub use crate::snapshot::WeightSnapshot;
    pub use crate::task::TaskConfig;
}

/// Result type for fedmesh core operations
pub type Result<T> = core::result::Result<T, Error>;

/// Error type for fedmesh core operations
#[derive(Debug)]
pub enum Error {
    /// Serialization/deserialization error
    Serialization,
    /// Aggregation was requested over an empty collection
    EmptyAggregation,
    /// Weight snapshots of differing dimension were combined
    ShapeMismatch,
    /// Task configuration failed validation
    InvalidConfig(&'static str),
}

impl std::error::Error for Error {}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Serialization => write!(f, "serialization error"),
            Error::EmptyAggregation => write!(f, "aggregation over empty collection"),
            Error::ShapeMismatch => write!(f, "weight snapshot dimensions do not match"),
            Error::InvalidConfig(reason) => write!(f, "invalid task configuration: {reason}"),
        }
    }
}

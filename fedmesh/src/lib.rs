//! # fedmesh
//!
//! **Decentralized federated learning: quorum-synchronized weight exchange
//! over a signaling relay.**
//!
//! A fixed group of participants jointly trains a shared model without any
//! central aggregator holding the weights. Each round, every participant
//! trains locally, announces readiness, waits for a quorum of peers,
//! broadcasts its privacy-perturbed result, waits for the peers' results,
//! and averages them into the next round's starting point. Participants
//! may join and leave between rounds; the relay is asynchronous and
//! unreliable, and the protocol tolerates dropped messages by quorum
//! counting rather than retries.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fedmesh::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mesh = InMemoryMesh::new();
//!     let (member, events) = mesh.join();
//!
//!     let mut coordinator = ParticipantBuilder::new()
//!         .config(TaskConfig::named("demo"))
//!         .connect(Arc::new(member), events)?;
//!
//!     let stale = WeightSnapshot::zeros(16);
//!     let updated = local_training(&stale);
//!     let next = coordinator.exchange_round(&updated, &stale).await?;
//!     coordinator.finish_training();
//!     # let _ = next;
//!     Ok(())
//! }
//! # fn local_training(stale: &WeightSnapshot) -> WeightSnapshot { stale.clone() }
//! ```
//!
//! ## Crate Structure
//!
//! - [`fedmesh_core`]: snapshots, identities, codec/privacy/averaging seams
//! - [`fedmesh_net`]: relay abstraction, wire protocol, in-memory mesh
//! - [`fedmesh_runtime`]: the polling wait primitive

#![forbid(unsafe_code)]

// Re-export sub-crates
pub use fedmesh_core as core;
pub use fedmesh_net as net;
pub use fedmesh_runtime as runtime;

pub mod adapter;
pub mod coordinator;
pub mod messenger;
pub mod observer;
pub mod registry;

pub use adapter::PrivacyAdapter;
pub use coordinator::{RoundCoordinator, RoundError, RoundPhase};
pub use messenger::{BroadcastStats, RoundMessenger};
pub use observer::{NullObserver, ProgressObserver, TracingObserver};
pub use registry::PeerRegistry;

// Re-export commonly used items at the top level
pub use fedmesh_core::{
    aggregation::{MeanAverager, WeightAverager},
    codec::{PostcardCodec, WeightCodec},
    identity::PeerId,
    privacy::{GaussianNoise, NoiseMechanism},
    snapshot::WeightSnapshot,
    task::TaskConfig,
};
pub use fedmesh_net::{
    traits::{Recipient, Relay, RelayEvent},
    InMemoryMesh,
};

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        GaussianNoise, InMemoryMesh, MeanAverager, NullObserver, ParticipantBuilder, PeerId,
        PostcardCodec, ProgressObserver, Relay, RelayEvent, RoundCoordinator, RoundError,
        TaskConfig, TracingObserver, WeightSnapshot,
    };
}

/// Assembles a participant's [`RoundCoordinator`].
///
/// Defaults: postcard codec, clipped-Gaussian noise (inert until the task
/// configures privacy parameters), uniform mean averaging, tracing-backed
/// progress observer.
pub struct ParticipantBuilder {
    config: TaskConfig,
    codec: Arc<dyn WeightCodec>,
    noise: Arc<dyn NoiseMechanism>,
    averager: Arc<dyn WeightAverager>,
    observer: Arc<dyn ProgressObserver>,
}

impl ParticipantBuilder {
    /// Create a builder with default mechanisms
    pub fn new() -> Self {
        Self {
            config: TaskConfig::default(),
            codec: Arc::new(PostcardCodec),
            noise: Arc::new(GaussianNoise::new()),
            averager: Arc::new(MeanAverager),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Set the task configuration
    pub fn config(mut self, config: TaskConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the weight codec
    pub fn codec(mut self, codec: impl WeightCodec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Set the privacy noise mechanism
    pub fn noise(mut self, noise: impl NoiseMechanism + 'static) -> Self {
        self.noise = Arc::new(noise);
        self
    }

    /// Set the averaging mechanism
    pub fn averager(mut self, averager: impl WeightAverager + 'static) -> Self {
        self.averager = Arc::new(averager);
        self
    }

    /// Set the progress observer
    pub fn observer(mut self, observer: impl ProgressObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// Validate the configuration and wire the coordinator to a relay.
    ///
    /// `events` must be the feed belonging to `relay`.
    pub fn connect(
        self,
        relay: Arc<dyn Relay>,
        events: UnboundedReceiver<RelayEvent>,
    ) -> Result<RoundCoordinator, fedmesh_core::Error> {
        self.config.validate()?;
        let adapter = PrivacyAdapter::new(self.noise, self.averager);
        Ok(RoundCoordinator::new(
            relay,
            events,
            self.config,
            self.codec,
            adapter,
            self.observer,
        ))
    }
}

impl Default for ParticipantBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_invalid_config() {
        let mesh = InMemoryMesh::new();
        let (member, events) = mesh.join();
        let result = ParticipantBuilder::new()
            .config(TaskConfig {
                quorum: 0,
                ..TaskConfig::default()
            })
            .connect(Arc::new(member), events);
        assert!(result.is_err());
    }

    #[test]
    fn coordinator_takes_the_relay_identity() {
        let mesh = InMemoryMesh::new();
        let (member, events) = mesh.join();
        let id = member.local_id();
        let coordinator = ParticipantBuilder::new()
            .observer(NullObserver)
            .connect(Arc::new(member), events)
            .unwrap();
        assert_eq!(coordinator.identity(), id);
        assert_eq!(coordinator.round(), 0);
    }
}

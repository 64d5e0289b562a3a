//! Round coordinator
//!
//! Owns one round's lifecycle: announce readiness, perturb and encode the
//! local result, wait for a peer quorum, broadcast, wait for peer results,
//! aggregate. The coordinator is the protocol's only entry point; the two
//! quorum waits are its only suspension points, and relay events are
//! drained into protocol state from inside those waits, never from
//! delivery callbacks.

use std::sync::Arc;

use fedmesh_core::codec::WeightCodec;
use fedmesh_core::identity::PeerId;
use fedmesh_core::snapshot::WeightSnapshot;
use fedmesh_core::task::TaskConfig;
use fedmesh_net::traits::{Relay, RelayEvent};
use fedmesh_runtime::{await_condition, WaitTimeout};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::adapter::PrivacyAdapter;
use crate::messenger::RoundMessenger;
use crate::observer::ProgressObserver;
use crate::registry::PeerRegistry;

/// Phases of one exchange round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// Between rounds
    Idle,
    /// Readiness announced to the relay
    Announced,
    /// Perturbing and encoding the local result
    Perturbing,
    /// Waiting for enough peers to broadcast to
    AwaitingPeerQuorum,
    /// Sending weights to the frozen peer set
    Broadcasting,
    /// Waiting for enough peer results
    AwaitingWeightQuorum,
    /// Combining the received results
    Aggregating,
    /// Round finished; the aggregate is the next round's baseline
    Complete,
}

/// Errors that fail a round
#[derive(Debug, thiserror::Error)]
pub enum RoundError {
    /// A bounded quorum wait expired
    #[error("round timed out in {phase:?}: {source}")]
    Timeout {
        /// The wait that expired
        phase: RoundPhase,
        /// The underlying wait error
        source: WaitTimeout,
    },
    /// The relay rejected an operation the round cannot proceed without
    #[error("relay error: {0}")]
    Relay(#[from] fedmesh_net::Error),
    /// Perturbation, encoding, or aggregation failed
    #[error(transparent)]
    Core(#[from] fedmesh_core::Error),
}

/// Drives the weight-exchange protocol for one participant
pub struct RoundCoordinator {
    relay: Arc<dyn Relay>,
    events: UnboundedReceiver<RelayEvent>,
    identity: PeerId,
    round: u64,
    phase: RoundPhase,
    config: TaskConfig,
    codec: Arc<dyn WeightCodec>,
    registry: PeerRegistry,
    messenger: RoundMessenger,
    adapter: PrivacyAdapter,
    observer: Arc<dyn ProgressObserver>,
}

/// Apply every queued relay event to protocol state.
///
/// Runs inside the quorum-wait predicates, so each poll tick observes a
/// fully applied view of the feed.
fn apply_relay_events(
    events: &mut UnboundedReceiver<RelayEvent>,
    registry: &mut PeerRegistry,
    messenger: &mut RoundMessenger,
    own_identity: PeerId,
) {
    while let Ok(event) = events.try_recv() {
        match event {
            RelayEvent::PeerDiscovered(peer) => {
                if peer != own_identity {
                    registry.add_peer(peer);
                }
            }
            RelayEvent::Message { from, bytes } => messenger.handle_inbound(from, &bytes),
        }
    }
}

impl RoundCoordinator {
    pub(crate) fn new(
        relay: Arc<dyn Relay>,
        events: UnboundedReceiver<RelayEvent>,
        config: TaskConfig,
        codec: Arc<dyn WeightCodec>,
        adapter: PrivacyAdapter,
        observer: Arc<dyn ProgressObserver>,
    ) -> Self {
        let identity = relay.local_id();
        let messenger = RoundMessenger::new(Arc::clone(&relay), Arc::clone(&codec));
        Self {
            relay,
            events,
            identity,
            round: 0,
            phase: RoundPhase::Idle,
            config,
            codec,
            registry: PeerRegistry::new(),
            messenger,
            adapter,
            observer,
        }
    }

    /// The relay-assigned identity of this participant
    pub fn identity(&self) -> PeerId {
        self.identity
    }

    /// The round the next exchange will run
    pub fn round(&self) -> u64 {
        self.round
    }

    /// The phase the coordinator last entered
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Run one exchange round.
    ///
    /// `updated` is the snapshot produced by this round's local training,
    /// `stale` the snapshot the round started from. On success the
    /// returned aggregate becomes the next round's stale baseline and the
    /// round number advances by one.
    pub async fn exchange_round(
        &mut self,
        updated: &WeightSnapshot,
        stale: &WeightSnapshot,
    ) -> Result<WeightSnapshot, RoundError> {
        let round = self.round;
        let quorum = self.config.quorum;
        let poll = self.config.poll_interval;
        let bound = self.config.round_timeout;

        self.messenger.begin_round(round);

        self.phase = RoundPhase::Announced;
        self.messenger.announce_ready(round).await;
        if let Err(error) = self.relay.refresh_peers().await {
            warn!(%error, round, "peer refresh failed");
        }

        self.phase = RoundPhase::Perturbing;
        let shared = self.adapter.perturb(updated, stale, &self.config)?;
        let payload = self.codec.encode(&shared)?;

        self.phase = RoundPhase::AwaitingPeerQuorum;
        debug!(round, quorum, "waiting for peer quorum");
        {
            let events = &mut self.events;
            let registry = &mut self.registry;
            let messenger = &mut self.messenger;
            let own_identity = self.identity;
            await_condition(
                || {
                    apply_relay_events(events, registry, messenger, own_identity);
                    registry.peer_count() >= quorum
                },
                poll,
                bound,
            )
            .await
            .map_err(|source| RoundError::Timeout {
                phase: RoundPhase::AwaitingPeerQuorum,
                source,
            })?;
        }

        // The peer set is frozen here: no events are drained between the
        // quorum check succeeding and the broadcast taking its targets.
        self.phase = RoundPhase::Broadcasting;
        let peers: Vec<PeerId> = self.registry.current_peers().to_vec();
        let stats = self
            .messenger
            .broadcast_weights(round, self.identity, &peers, &payload)
            .await?;
        info!(round, sent = stats.sent, failed = stats.failed, "broadcast weights");
        self.observer.message(&format!(
            "Round {round}: sent weights to {} of {} peers",
            stats.sent,
            peers.len()
        ));
        self.registry.reset_after_broadcast();

        self.phase = RoundPhase::AwaitingWeightQuorum;
        debug!(round, quorum, "waiting for peer results");
        {
            let events = &mut self.events;
            let registry = &mut self.registry;
            let messenger = &mut self.messenger;
            let own_identity = self.identity;
            await_condition(
                || {
                    apply_relay_events(events, registry, messenger, own_identity);
                    messenger.received_count() >= quorum
                },
                poll,
                bound,
            )
            .await
            .map_err(|source| RoundError::Timeout {
                phase: RoundPhase::AwaitingWeightQuorum,
                source,
            })?;
        }

        self.phase = RoundPhase::Aggregating;
        let received = self.messenger.take_received();
        debug!(round, contributors = received.len(), "aggregating");
        let snapshots: Vec<WeightSnapshot> = received
            .into_iter()
            .map(|(_, snapshot)| snapshot)
            .collect();
        let aggregated = self.adapter.aggregate(&snapshots)?;
        self.observer.message(&format!(
            "Round {round}: aggregated {} contributions",
            snapshots.len()
        ));

        self.phase = RoundPhase::Complete;
        self.round += 1;
        Ok(aggregated)
    }

    /// Hook to run once when training ends overall.
    ///
    /// Performs no protocol work beyond notifying the observer.
    pub fn finish_training(&self) {
        self.observer.message("Training finished.");
    }
}

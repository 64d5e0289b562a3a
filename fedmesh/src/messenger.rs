//! Round messenger
//!
//! Builds and dispatches the round's outbound signals and stores decoded
//! inbound weights keyed by sender. Delivery is at-least-once with no
//! acknowledgements: a failed send is logged and the round simply proceeds
//! with a smaller effective peer count.

use std::collections::HashMap;
use std::sync::Arc;

use fedmesh_core::codec::WeightCodec;
use fedmesh_core::identity::PeerId;
use fedmesh_core::snapshot::WeightSnapshot;
use fedmesh_net::protocol::{Signal, SignalEnvelope};
use fedmesh_net::traits::{Recipient, Relay};
use tracing::{debug, warn};

/// Statistics from a weight broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastStats {
    /// Number of peers the weights were handed to the relay for
    pub sent: usize,
    /// Number of sends the relay rejected
    pub failed: usize,
}

/// Constructs, dispatches, and receives the round's weight-exchange signals
pub struct RoundMessenger {
    relay: Arc<dyn Relay>,
    codec: Arc<dyn WeightCodec>,
    expected_round: u64,
    received: HashMap<PeerId, WeightSnapshot>,
}

impl RoundMessenger {
    /// Create a messenger over the given relay and codec
    pub fn new(relay: Arc<dyn Relay>, codec: Arc<dyn WeightCodec>) -> Self {
        Self {
            relay,
            codec,
            expected_round: 0,
            received: HashMap::new(),
        }
    }

    /// Start accepting weights for `round`, forgetting everything held for
    /// any earlier round.
    pub fn begin_round(&mut self, round: u64) {
        self.expected_round = round;
        self.received.clear();
    }

    /// Announce that local training for `round` has finished.
    ///
    /// Side effect only; a failed send is reported and the round proceeds
    /// optimistically.
    pub async fn announce_ready(&self, round: u64) {
        let envelope = SignalEnvelope::new(Signal::Ready {
            round,
            sender: self.relay.local_id(),
        });
        match envelope.serialize() {
            Ok(bytes) => {
                if let Err(error) = self.relay.send(Recipient::Broadcast, bytes).await {
                    warn!(%error, round, "readiness announcement failed");
                }
            }
            Err(error) => warn!(%error, round, "could not serialize readiness announcement"),
        }
    }

    /// Send `payload` to every peer in `peers`.
    ///
    /// Destination addressing is positional: the Nth message is tagged for
    /// the Nth entry of the peer sequence as frozen at call time. Per-peer
    /// send failures are counted and logged, never fatal; broadcasting
    /// without a live relay connection aborts the round.
    pub async fn broadcast_weights(
        &self,
        round: u64,
        sender: PeerId,
        peers: &[PeerId],
        payload: &[u8],
    ) -> Result<BroadcastStats, fedmesh_net::Error> {
        if !self.relay.is_connected() {
            return Err(fedmesh_net::Error::NotConnected);
        }

        let mut stats = BroadcastStats::default();
        for (index, peer) in peers.iter().enumerate() {
            let envelope = SignalEnvelope::new(Signal::Weights {
                round,
                sender,
                destination_index: index as u32,
                payload: payload.to_vec(),
            });
            let bytes = envelope.serialize()?;
            match self.relay.send(Recipient::Peer(*peer), bytes).await {
                Ok(()) => stats.sent += 1,
                Err(error) => {
                    warn!(%error, peer = %peer, round, "weight send failed");
                    stats.failed += 1;
                }
            }
        }
        Ok(stats)
    }

    /// Handle one inbound relay message.
    ///
    /// Signals for a round other than the expected one and payloads that
    /// fail to decode are discarded; a later message from a sender already
    /// in the map replaces the earlier one.
    pub fn handle_inbound(&mut self, from: PeerId, bytes: &[u8]) {
        let envelope = match SignalEnvelope::deserialize(bytes) {
            Ok(envelope) => envelope,
            Err(error) => {
                warn!(%error, from = %from, "discarding undecodable signal");
                return;
            }
        };
        match envelope.signal {
            Signal::Ready { round, sender } => {
                debug!(round, sender = %sender, "peer announced readiness");
            }
            Signal::Weights {
                round,
                sender,
                payload,
                ..
            } => {
                if round != self.expected_round {
                    debug!(
                        round,
                        expected = self.expected_round,
                        sender = %sender,
                        "discarding weights for another round"
                    );
                    return;
                }
                match self.codec.decode(&payload) {
                    Ok(snapshot) => {
                        self.received.insert(sender, snapshot);
                    }
                    Err(error) => {
                        warn!(%error, sender = %sender, round, "discarding undecodable weight payload");
                    }
                }
            }
        }
    }

    /// Number of distinct peers whose weights arrived this round
    pub fn received_count(&self) -> usize {
        self.received.len()
    }

    /// Drain this round's received weights, keyed by sender
    pub fn take_received(&mut self) -> Vec<(PeerId, WeightSnapshot)> {
        self.received.drain().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedmesh_core::codec::PostcardCodec;
    use fedmesh_net::InMemoryMesh;

    fn weights_signal(round: u64, sender: PeerId, values: Vec<f32>) -> Vec<u8> {
        let payload = PostcardCodec
            .encode(&WeightSnapshot::new(values))
            .unwrap();
        SignalEnvelope::new(Signal::Weights {
            round,
            sender,
            destination_index: 0,
            payload,
        })
        .serialize()
        .unwrap()
    }

    fn messenger() -> RoundMessenger {
        let mesh = InMemoryMesh::new();
        let (member, _events) = mesh.join();
        RoundMessenger::new(Arc::new(member), Arc::new(PostcardCodec))
    }

    #[test]
    fn duplicate_sender_keeps_the_later_payload() {
        let mut messenger = messenger();
        messenger.begin_round(0);
        let sender = PeerId::derive(b"peer");

        messenger.handle_inbound(sender, &weights_signal(0, sender, vec![1.0]));
        messenger.handle_inbound(sender, &weights_signal(0, sender, vec![2.0]));

        assert_eq!(messenger.received_count(), 1);
        let received = messenger.take_received();
        assert_eq!(received[0].1, WeightSnapshot::new(vec![2.0]));
    }

    #[test]
    fn weights_for_another_round_are_discarded() {
        let mut messenger = messenger();
        messenger.begin_round(2);
        let sender = PeerId::derive(b"peer");

        messenger.handle_inbound(sender, &weights_signal(1, sender, vec![1.0]));
        messenger.handle_inbound(sender, &weights_signal(3, sender, vec![1.0]));
        assert_eq!(messenger.received_count(), 0);

        messenger.handle_inbound(sender, &weights_signal(2, sender, vec![1.0]));
        assert_eq!(messenger.received_count(), 1);
    }

    #[test]
    fn beginning_a_round_forgets_earlier_weights() {
        let mut messenger = messenger();
        messenger.begin_round(0);
        let sender = PeerId::derive(b"peer");
        messenger.handle_inbound(sender, &weights_signal(0, sender, vec![1.0]));
        assert_eq!(messenger.received_count(), 1);

        messenger.begin_round(1);
        assert_eq!(messenger.received_count(), 0);
    }

    #[test]
    fn malformed_signals_are_discarded() {
        let mut messenger = messenger();
        messenger.begin_round(0);
        messenger.handle_inbound(PeerId::derive(b"peer"), &[0xba, 0xad]);
        assert_eq!(messenger.received_count(), 0);
    }

    #[test]
    fn ready_signals_do_not_count_as_weights() {
        let mut messenger = messenger();
        messenger.begin_round(0);
        let sender = PeerId::derive(b"peer");
        let bytes = SignalEnvelope::new(Signal::Ready { round: 0, sender })
            .serialize()
            .unwrap();
        messenger.handle_inbound(sender, &bytes);
        assert_eq!(messenger.received_count(), 0);
    }

    #[tokio::test]
    async fn partial_broadcast_counts_failures() {
        let mesh = InMemoryMesh::new();
        let (member, _events) = mesh.join();
        let (b, _b_rx) = mesh.join();
        let (c, _c_rx) = mesh.join();
        let sender = member.local_id();
        mesh.sever_link(sender, b.local_id());

        let messenger = RoundMessenger::new(Arc::new(member), Arc::new(PostcardCodec));
        let stats = messenger
            .broadcast_weights(0, sender, &[b.local_id(), c.local_id()], &[1, 2, 3])
            .await
            .unwrap();
        assert_eq!(stats, BroadcastStats { sent: 1, failed: 1 });
    }

    #[tokio::test]
    async fn broadcasting_without_a_connection_is_fatal() {
        let mesh = InMemoryMesh::new();
        let (member, _events) = mesh.join();
        let (b, _b_rx) = mesh.join();
        let sender = member.local_id();
        member.disconnect();

        let messenger = RoundMessenger::new(Arc::new(member), Arc::new(PostcardCodec));
        assert!(matches!(
            messenger
                .broadcast_weights(0, sender, &[b.local_id()], &[1])
                .await,
            Err(fedmesh_net::Error::NotConnected)
        ));
    }
}

//! Relay traits and event feed
//!
//! A relay is the signaling transport that lets participants exchange
//! opaque bytes and learn about each other without a direct network path.
//! Delivery is fire-and-forget: there is no acknowledgement protocol, and
//! the exchange protocol tolerates dropped messages by quorum counting
//! rather than retries.

use fedmesh_core::identity::PeerId;

use crate::Result;

/// Destination of a relay send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// A single peer
    Peer(PeerId),
    /// Every other participant the relay currently knows
    Broadcast,
}

/// Events delivered on a relay's feed.
///
/// The feed is the only path by which relay activity reaches protocol
/// state: consumers drain it from their own task, so delivery callbacks
/// never race with protocol reads.
#[derive(Debug, Clone)]
pub enum RelayEvent {
    /// The relay learned of a new peer on this task
    PeerDiscovered(PeerId),
    /// An inbound message arrived
    Message {
        /// Relay-reported sender
        from: PeerId,
        /// Opaque payload
        bytes: Vec<u8>,
    },
}

/// Core relay trait for signaling transports
#[async_trait::async_trait]
pub trait Relay: Send + Sync {
    /// The identity the relay assigned to this participant
    fn local_id(&self) -> PeerId;

    /// Whether the relay connection is live
    fn is_connected(&self) -> bool;

    /// Send opaque bytes, fire-and-forget
    async fn send(&self, to: Recipient, bytes: Vec<u8>) -> Result<()>;

    /// Replay the peers currently known for this task onto the event feed.
    ///
    /// The peer set is rebuilt from discovery events every round, so
    /// participants ask for a replay after announcing readiness.
    async fn refresh_peers(&self) -> Result<()>;
}

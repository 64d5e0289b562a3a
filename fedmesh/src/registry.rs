//! Peer set registry
//!
//! Tracks the peers eligible to receive the current round's broadcast. The
//! set is rebuilt from discovery events every round and emptied immediately
//! after a broadcast so this round's send targets never leak into the next.

use fedmesh_core::identity::PeerId;

/// The ordered set of peers known for the current round
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: Vec<PeerId>,
}

impl PeerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer. Adding an already-present identity is a no-op.
    pub fn add_peer(&mut self, peer: PeerId) {
        if !self.peers.contains(&peer) {
            self.peers.push(peer);
        }
    }

    /// The currently known peers, in discovery order
    pub fn current_peers(&self) -> &[PeerId] {
        &self.peers
    }

    /// Number of currently known peers
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Empty the set. Called right after a broadcast completes.
    pub fn reset_after_broadcast(&mut self) {
        self.peers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_peer_is_idempotent() {
        let mut registry = PeerRegistry::new();
        let peer = PeerId::derive(b"p1");
        registry.add_peer(peer);
        registry.add_peer(peer);
        assert_eq!(registry.peer_count(), 1);
        assert_eq!(registry.current_peers(), &[peer]);
    }

    #[test]
    fn discovery_order_is_preserved() {
        let mut registry = PeerRegistry::new();
        let first = PeerId::derive(b"p1");
        let second = PeerId::derive(b"p2");
        let third = PeerId::derive(b"p3");
        registry.add_peer(first);
        registry.add_peer(second);
        registry.add_peer(third);
        registry.add_peer(second);
        assert_eq!(registry.current_peers(), &[first, second, third]);
    }

    #[test]
    fn reset_empties_the_set() {
        let mut registry = PeerRegistry::new();
        registry.add_peer(PeerId::derive(b"p1"));
        registry.reset_after_broadcast();
        assert_eq!(registry.peer_count(), 0);
    }
}

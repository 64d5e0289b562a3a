//! In-memory mesh relay
//!
//! A loopback hub wiring any number of participants together in one
//! process. Used by the test suites and the examples, and usable as a
//! single-host simulation transport. Supports severing individual links to
//! exercise partial-broadcast behavior.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use fedmesh_core::identity::PeerId;
use tokio::sync::mpsc;
use tracing::debug;

use crate::traits::{Recipient, Relay, RelayEvent};
use crate::{Error, Result};

struct MeshState {
    members: HashMap<PeerId, mpsc::UnboundedSender<RelayEvent>>,
    join_order: Vec<PeerId>,
    next_join: u64,
    severed: HashSet<(PeerId, PeerId)>,
}

/// A hub connecting in-process participants
#[derive(Clone)]
pub struct InMemoryMesh {
    state: Arc<Mutex<MeshState>>,
}

impl InMemoryMesh {
    /// Create an empty mesh
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MeshState {
                members: HashMap::new(),
                join_order: Vec::new(),
                next_join: 0,
                severed: HashSet::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MeshState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Join the mesh.
    ///
    /// Mints an identity for the new member, announces it to every existing
    /// member, and replays the existing membership onto the new member's
    /// event feed. Returns the member handle and its feed.
    pub fn join(&self) -> (MeshMember, mpsc::UnboundedReceiver<RelayEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.lock();

        let mut seed = Vec::from(&b"mesh-member-"[..]);
        seed.extend_from_slice(&state.next_join.to_be_bytes());
        state.next_join += 1;
        let id = PeerId::derive(&seed);

        for existing in &state.join_order {
            if let Some(peer_tx) = state.members.get(existing) {
                let _ = peer_tx.send(RelayEvent::PeerDiscovered(id));
            }
            let _ = tx.send(RelayEvent::PeerDiscovered(*existing));
        }

        state.members.insert(id, tx);
        state.join_order.push(id);
        debug!(member = %id, total = state.join_order.len(), "mesh member joined");

        (
            MeshMember {
                id,
                state: Arc::clone(&self.state),
                connected: AtomicBool::new(true),
            },
            rx,
        )
    }

    /// Make sends from `from` to `to` fail until restored
    pub fn sever_link(&self, from: PeerId, to: PeerId) {
        self.lock().severed.insert((from, to));
    }

    /// Restore a previously severed link
    pub fn restore_link(&self, from: PeerId, to: PeerId) {
        self.lock().severed.remove(&(from, to));
    }

    /// Number of currently connected members
    pub fn member_count(&self) -> usize {
        self.lock().members.len()
    }
}

impl Default for InMemoryMesh {
    fn default() -> Self {
        Self::new()
    }
}

/// One participant's handle on an [`InMemoryMesh`]
pub struct MeshMember {
    id: PeerId,
    state: Arc<Mutex<MeshState>>,
    connected: AtomicBool,
}

impl MeshMember {
    /// Drop off the mesh; subsequent sends fail with `NotConnected`
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.members.remove(&self.id);
        state.join_order.retain(|id| *id != self.id);
    }
}

#[async_trait::async_trait]
impl Relay for MeshMember {
    fn local_id(&self) -> PeerId {
        self.id
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send(&self, to: Recipient, bytes: Vec<u8>) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        let state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match to {
            Recipient::Peer(peer) => {
                if state.severed.contains(&(self.id, peer)) {
                    debug!(from = %self.id, to = %peer, "send dropped on severed link");
                    return Err(Error::SendFailed);
                }
                let tx = state.members.get(&peer).ok_or(Error::PeerUnknown)?;
                tx.send(RelayEvent::Message {
                    from: self.id,
                    bytes,
                })
                .map_err(|_| Error::SendFailed)
            }
            Recipient::Broadcast => {
                for (peer, tx) in &state.members {
                    if *peer == self.id || state.severed.contains(&(self.id, *peer)) {
                        continue;
                    }
                    let _ = tx.send(RelayEvent::Message {
                        from: self.id,
                        bytes: bytes.clone(),
                    });
                }
                Ok(())
            }
        }
    }

    async fn refresh_peers(&self) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        let state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let own_tx = state.members.get(&self.id).ok_or(Error::NotConnected)?;
        for peer in &state.join_order {
            if *peer != self.id {
                let _ = own_tx.send(RelayEvent::PeerDiscovered(*peer));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<RelayEvent>) -> Vec<RelayEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn join_announces_discovery_both_ways() {
        let mesh = InMemoryMesh::new();
        let (a, mut a_rx) = mesh.join();
        let (b, mut b_rx) = mesh.join();

        let a_events = drain(&mut a_rx);
        assert!(matches!(
            a_events.as_slice(),
            [RelayEvent::PeerDiscovered(id)] if *id == b.local_id()
        ));

        let b_events = drain(&mut b_rx);
        assert!(matches!(
            b_events.as_slice(),
            [RelayEvent::PeerDiscovered(id)] if *id == a.local_id()
        ));
    }

    #[tokio::test]
    async fn send_routes_to_the_addressed_peer() {
        let mesh = InMemoryMesh::new();
        let (a, _a_rx) = mesh.join();
        let (b, mut b_rx) = mesh.join();
        drain(&mut b_rx);

        a.send(Recipient::Peer(b.local_id()), vec![42])
            .await
            .unwrap();
        let events = drain(&mut b_rx);
        assert!(matches!(
            events.as_slice(),
            [RelayEvent::Message { from, bytes }] if *from == a.local_id() && bytes == &[42]
        ));
    }

    #[tokio::test]
    async fn broadcast_excludes_the_sender() {
        let mesh = InMemoryMesh::new();
        let (a, mut a_rx) = mesh.join();
        let (_b, mut b_rx) = mesh.join();
        let (_c, mut c_rx) = mesh.join();
        drain(&mut a_rx);
        drain(&mut b_rx);
        drain(&mut c_rx);

        a.send(Recipient::Broadcast, vec![7]).await.unwrap();
        assert!(drain(&mut a_rx).is_empty());
        assert_eq!(drain(&mut b_rx).len(), 1);
        assert_eq!(drain(&mut c_rx).len(), 1);
    }

    #[tokio::test]
    async fn severed_link_fails_the_send() {
        let mesh = InMemoryMesh::new();
        let (a, _a_rx) = mesh.join();
        let (b, mut b_rx) = mesh.join();
        drain(&mut b_rx);

        mesh.sever_link(a.local_id(), b.local_id());
        assert!(matches!(
            a.send(Recipient::Peer(b.local_id()), vec![1]).await,
            Err(Error::SendFailed)
        ));

        mesh.restore_link(a.local_id(), b.local_id());
        assert!(a.send(Recipient::Peer(b.local_id()), vec![1]).await.is_ok());
    }

    #[tokio::test]
    async fn disconnected_member_cannot_send() {
        let mesh = InMemoryMesh::new();
        let (a, _a_rx) = mesh.join();
        let (b, _b_rx) = mesh.join();

        a.disconnect();
        assert!(!a.is_connected());
        assert!(matches!(
            a.send(Recipient::Peer(b.local_id()), vec![1]).await,
            Err(Error::NotConnected)
        ));
        assert_eq!(mesh.member_count(), 1);
    }

    #[tokio::test]
    async fn refresh_replays_current_membership() {
        let mesh = InMemoryMesh::new();
        let (a, mut a_rx) = mesh.join();
        let (b, _b_rx) = mesh.join();
        let (c, _c_rx) = mesh.join();
        drain(&mut a_rx);

        a.refresh_peers().await.unwrap();
        let peers: Vec<PeerId> = drain(&mut a_rx)
            .into_iter()
            .filter_map(|event| match event {
                RelayEvent::PeerDiscovered(id) => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(peers, vec![b.local_id(), c.local_id()]);
    }

    #[tokio::test]
    async fn sending_to_an_unknown_peer_is_reported() {
        let mesh = InMemoryMesh::new();
        let (a, _a_rx) = mesh.join();
        let stranger = PeerId::derive(b"never-joined");
        assert!(matches!(
            a.send(Recipient::Peer(stranger), vec![1]).await,
            Err(Error::PeerUnknown)
        ));
    }
}

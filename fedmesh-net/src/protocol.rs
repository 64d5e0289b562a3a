//! Signal wire format
//!
//! Participants exchange two kinds of signals through the relay: a
//! readiness announcement at the start of a round, and one weight-exchange
//! message per broadcast target. Both are tagged with the sender's identity
//! and the round number; receivers discard signals for any round other than
//! the one they are currently in.

use fedmesh_core::identity::PeerId;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Envelope carrying one signal plus the protocol version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalEnvelope {
    /// Protocol version (major, minor)
    pub version: (u8, u8),
    /// The signal itself
    pub signal: Signal,
}

impl SignalEnvelope {
    /// Current protocol version
    pub const CURRENT_VERSION: (u8, u8) = (0, 1);

    /// Wrap a signal in a current-version envelope
    pub fn new(signal: Signal) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            signal,
        }
    }

    /// Serialize the envelope to bytes
    pub fn serialize(&self) -> Result<Vec<u8>> {
        postcard::to_allocvec(self).map_err(|_| Error::Serialization)
    }

    /// Deserialize an envelope, rejecting incompatible major versions
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let envelope: Self = postcard::from_bytes(bytes).map_err(|_| Error::InvalidMessage)?;
        if envelope.version.0 != Self::CURRENT_VERSION.0 {
            return Err(Error::InvalidMessage);
        }
        Ok(envelope)
    }
}

/// A protocol signal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Signal {
    /// Announces that the sender has finished local training for `round`
    Ready {
        /// Round the sender is ready to exchange
        round: u64,
        /// Sender's identity
        sender: PeerId,
    },
    /// Carries one participant's encoded weights to one broadcast target
    Weights {
        /// Round these weights belong to
        round: u64,
        /// Sender's identity
        sender: PeerId,
        /// Position of the target in the sender's peer sequence at send time
        destination_index: u32,
        /// Encoded weight snapshot
        payload: Vec<u8>,
    },
}

impl Signal {
    /// The round this signal is tagged with
    pub fn round(&self) -> u64 {
        match self {
            Signal::Ready { round, .. } | Signal::Weights { round, .. } => *round,
        }
    }

    /// The identity of the participant that sent this signal
    pub fn sender(&self) -> PeerId {
        match self {
            Signal::Ready { sender, .. } | Signal::Weights { sender, .. } => *sender,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trip() {
        let sender = PeerId::derive(b"peer-a");
        let envelope = SignalEnvelope::new(Signal::Weights {
            round: 3,
            sender,
            destination_index: 1,
            payload: vec![1, 2, 3],
        });

        let bytes = envelope.serialize().unwrap();
        let back = SignalEnvelope::deserialize(&bytes).unwrap();
        assert_eq!(back.version, SignalEnvelope::CURRENT_VERSION);
        assert_eq!(back.signal.round(), 3);
        assert_eq!(back.signal.sender(), sender);
    }

    #[test]
    fn incompatible_major_version_is_rejected() {
        let mut envelope = SignalEnvelope::new(Signal::Ready {
            round: 0,
            sender: PeerId::derive(b"peer-b"),
        });
        envelope.version = (1, 0);
        let bytes = postcard::to_allocvec(&envelope).unwrap();
        assert!(matches!(
            SignalEnvelope::deserialize(&bytes),
            Err(Error::InvalidMessage)
        ));
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        assert!(SignalEnvelope::deserialize(&[0xde, 0xad]).is_err());
    }
}

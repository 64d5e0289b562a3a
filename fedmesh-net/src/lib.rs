//! # fedmesh Network
//!
//! Relay transport abstraction and wire protocol for fedmesh.
//!
//! This crate provides:
//! - The `Relay` trait every signaling transport implements
//! - The signal wire format (readiness and weight-exchange messages)
//! - The relay event feed (inbound messages and peer discovery)
//! - An in-memory mesh relay for tests and single-host simulation

pub mod mem;
pub mod protocol;
pub mod traits;

pub use mem::InMemoryMesh;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::protocol::*;
    pub use crate::traits::*;
}

/// Result type for network operations
pub type Result<T> = core::result::Result<T, Error>;

/// Network error types
#[derive(Debug)]
pub enum Error {
    /// Send failed at the relay level
    SendFailed,
    /// Operation requires a live relay connection and none exists
    NotConnected,
    /// Destination peer is not known to the relay
    PeerUnknown,
    /// Serialization error
    Serialization,
    /// Invalid or incompatible message format
    InvalidMessage,
}

impl std::error::Error for Error {}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::SendFailed => write!(f, "send failed"),
            Error::NotConnected => write!(f, "no relay connection"),
            Error::PeerUnknown => write!(f, "peer not known to relay"),
            Error::Serialization => write!(f, "serialization error"),
            Error::InvalidMessage => write!(f, "invalid message format"),
        }
    }
}

//! Participant identity
//!
//! Identities are opaque 32-byte values assigned by the relay when a
//! participant joins, stable for the session lifetime.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Peer identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(pub [u8; 32]);

impl PeerId {
    /// Create a new PeerId from bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive a PeerId by hashing arbitrary seed bytes (SHA-256)
    pub fn derive(seed: &[u8]) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(seed);
        let result = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&result);
        Self(bytes)
    }

    /// Get the raw bytes
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl AsRef<[u8]> for PeerId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for PeerId {
    /// Abbreviated hex form for logs
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        let a = PeerId::derive(b"join-nonce-1");
        let b = PeerId::derive(b"join-nonce-1");
        let c = PeerId::derive(b"join-nonce-2");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn display_is_short_hex() {
        let id = PeerId::new([0xab; 32]);
        assert_eq!(id.to_string(), "abababab");
    }
}

//! Weight wire codec
//!
//! The exchange protocol moves weight snapshots as opaque bytes. The codec
//! seam lets integrators swap the encoding; the shipped implementation uses
//! postcard, which writes `f32` values as their 4-byte little-endian bit
//! patterns and so round-trips exactly.

use crate::snapshot::WeightSnapshot;
use crate::{Error, Result};

/// Encoding/decoding of weight snapshots for transmission.
///
/// Implementations must round-trip exactly: `decode(encode(w)) == w`.
pub trait WeightCodec: Send + Sync {
    /// Encode a snapshot to bytes
    fn encode(&self, snapshot: &WeightSnapshot) -> Result<Vec<u8>>;

    /// Decode a snapshot from bytes
    fn decode(&self, bytes: &[u8]) -> Result<WeightSnapshot>;
}

/// Postcard-backed codec
#[derive(Debug, Clone, Copy, Default)]
pub struct PostcardCodec;

impl WeightCodec for PostcardCodec {
    fn encode(&self, snapshot: &WeightSnapshot) -> Result<Vec<u8>> {
        postcard::to_allocvec(snapshot).map_err(|_| Error::Serialization)
    }

    fn decode(&self, bytes: &[u8]) -> Result<WeightSnapshot> {
        postcard::from_bytes(bytes).map_err(|_| Error::Serialization)
    }
}

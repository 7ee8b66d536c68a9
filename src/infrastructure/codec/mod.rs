//! Sqids-backed implementation of the id/hash codec.

use sqids::Sqids;

use crate::domain::codec::{CodecError, IdCodec};

/// Default minimum hash length.
pub const DEFAULT_MIN_LENGTH: u8 = 6;

/// Encodes link ids with the Sqids alphabet (`[0-9A-Za-z]`).
///
/// Sqids accepts several spellings for some ids, so `decode` re-encodes and
/// rejects anything that is not the canonical form. This keeps the mapping a
/// bijection: one id, one public hash.
pub struct SqidsCodec {
    sqids: Sqids,
}

impl SqidsCodec {
    /// # Errors
    ///
    /// Returns [`CodecError::Config`] if the Sqids builder rejects the settings.
    pub fn new(min_length: u8) -> Result<Self, CodecError> {
        let sqids = Sqids::builder()
            .min_length(min_length)
            .build()
            .map_err(|e| CodecError::Config(e.to_string()))?;

        Ok(Self { sqids })
    }
}

impl IdCodec for SqidsCodec {
    fn encode(&self, id: u64) -> Result<String, CodecError> {
        self.sqids.encode(&[id]).map_err(|_| CodecError::Encode(id))
    }

    fn decode(&self, hash: &str) -> Result<u64, CodecError> {
        let malformed = || CodecError::Malformed(hash.to_string());

        let ids = self.sqids.decode(hash);
        let &[id] = ids.as_slice() else {
            return Err(malformed());
        };

        match self.sqids.encode(&[id]) {
            Ok(canonical) if canonical == hash => Ok(id),
            _ => Err(malformed()),
        }
    }
}

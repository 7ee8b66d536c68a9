//! Reversible mapping between numeric link IDs and public short hashes.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("cannot encode id {0}")]
    Encode(u64),
    #[error("malformed hash '{0}'")]
    Malformed(String),
    #[error("invalid codec configuration: {0}")]
    Config(String),
}

/// Deterministic bijection between IDs and hashes.
///
/// `decode(encode(id)) == id` for every id, and `decode` rejects any string that
/// is not the canonical encoding of exactly one id.
#[cfg_attr(test, mockall::automock)]
pub trait IdCodec: Send + Sync {
    fn encode(&self, id: u64) -> Result<String, CodecError>;

    fn decode(&self, hash: &str) -> Result<u64, CodecError>;
}

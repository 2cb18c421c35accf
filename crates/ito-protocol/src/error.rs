//! Error types for the protocol layer.

/// Errors raised while encoding, decoding or validating wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, a missing required
    /// field, a wrong type or an unknown action tag.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded but breaks a protocol rule (oversized text,
    /// empty identity, unknown mode).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

//! Unified error type for the Ito server.

use ito_protocol::ProtocolError;
use ito_session::SessionError;
use ito_transport::TransportError;

/// Top-level error that wraps the crate-specific errors.
///
/// The `#[from]` attribute on each wrapped variant lets `?` convert
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The room actor's command channel is closed.
    #[error("room is unavailable")]
    RoomUnavailable,

    /// A setting read from the environment could not be used.
    #[error("invalid configuration: {0}")]
    Config(String),
}

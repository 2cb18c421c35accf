//! Wire protocol for the Ito session coordinator.
//!
//! - **Types**: identities, phases and the redacted views clients see.
//! - **Actions** ([`ClientAction`]): the closed set of client requests.
//! - **Events** ([`ServerEvent`]): everything the server pushes back.
//! - **Codec** ([`Codec`], [`JsonCodec`]): bytes in, typed values out.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientEnvelope) → Session (state machine)
//! ```

mod action;
mod codec;
mod error;
mod event;
mod types;

pub use action::{
    ClientAction, ClientEnvelope, MAX_CHAT_LEN, MAX_CLUE_LEN,
    MAX_IDENTITY_LEN, MAX_NAME_LEN, MAX_REORDER_LEN, MAX_THEME_LEN,
};
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use event::{ServerEnvelope, ServerEvent};
pub use types::{
    CardId, ChatMessage, Mode, OwnCard, ParticipantId, ParticipantView,
    PublicCard, Recipient, Role, RoleReveal, SessionConfig, Status, Team,
    VoteTally,
};

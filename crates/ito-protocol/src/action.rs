//! Client actions: the closed set of things a client may ask for.
//!
//! Every payload field is untrusted. Serde rejects missing fields and
//! wrong types; [`ClientAction::validate`] then enforces sizes so that
//! nothing oversized ever reaches the session.

use serde::{Deserialize, Serialize};

use crate::{CardId, ParticipantId, ProtocolError};

/// Longest accepted participant identity.
pub const MAX_IDENTITY_LEN: usize = 64;
/// Longest accepted display name.
pub const MAX_NAME_LEN: usize = 32;
/// Longest accepted topic text.
pub const MAX_THEME_LEN: usize = 200;
/// Longest accepted clue text.
pub const MAX_CLUE_LEN: usize = 200;
/// Longest accepted chat line.
pub const MAX_CHAT_LEN: usize = 500;
/// Largest accepted reorder list.
pub const MAX_REORDER_LEN: usize = 256;
/// Longest accepted reset secret.
const MAX_SECRET_LEN: usize = 128;

/// An action sent by a client.
///
/// Internally tagged, e.g. `{ "type": "PlayCard", "card": "9f3a..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientAction {
    /// First action on every connection: binds it to an identity.
    Login {
        participant: ParticipantId,
        #[serde(default)]
        name: String,
    },

    /// Set the discussion topic.
    UpdateTheme { theme: String },

    /// Pick a topic from the preset list.
    RequestRandomTheme,

    /// Start (or restart) a round. `mode` is `normal`, `double` or `wolf`.
    StartGame {
        #[serde(default)]
        mode: Option<String>,
    },

    /// Wipe the whole session. Spectators must supply the secret.
    EmergencyReset {
        #[serde(default)]
        secret: Option<String>,
    },

    /// Edit the clue on one of the sender's cards.
    UpdateClue { card: CardId, clue: String },

    /// Move a card from the sender's hand to the end of the table.
    PlayCard { card: CardId },

    /// Replace the table order. Must be a permutation of the current ids.
    ReorderCards { order: Vec<CardId> },

    /// Return one of the sender's cards from the table to their hand.
    TakeBackCard { card: CardId },

    /// Stop concealment and judge the order.
    RevealCards,

    /// Cast a ballot in wolf mode.
    SubmitVote { target: ParticipantId },

    /// Post a chat line.
    SendChat { text: String },

    /// Keep-alive; answered by the connection handler.
    Heartbeat { client_time: u64 },
}

impl ClientAction {
    /// Short action name for logs and advisories.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Login { .. } => "Login",
            Self::UpdateTheme { .. } => "UpdateTheme",
            Self::RequestRandomTheme => "RequestRandomTheme",
            Self::StartGame { .. } => "StartGame",
            Self::EmergencyReset { .. } => "EmergencyReset",
            Self::UpdateClue { .. } => "UpdateClue",
            Self::PlayCard { .. } => "PlayCard",
            Self::ReorderCards { .. } => "ReorderCards",
            Self::TakeBackCard { .. } => "TakeBackCard",
            Self::RevealCards => "RevealCards",
            Self::SubmitVote { .. } => "SubmitVote",
            Self::SendChat { .. } => "SendChat",
            Self::Heartbeat { .. } => "Heartbeat",
        }
    }

    /// Checks field sizes and non-emptiness.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] naming the offending field.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            Self::Login { participant, name } => {
                let id = participant.as_str();
                if id.trim().is_empty() {
                    return Err(invalid("participant must not be empty"));
                }
                check_len("participant", id, MAX_IDENTITY_LEN)?;
                check_len("name", name, MAX_NAME_LEN)
            }
            Self::UpdateTheme { theme } => {
                if theme.trim().is_empty() {
                    return Err(invalid("theme must not be empty"));
                }
                check_len("theme", theme, MAX_THEME_LEN)
            }
            Self::StartGame { mode: Some(mode) } => {
                check_len("mode", mode, MAX_NAME_LEN)
            }
            Self::EmergencyReset { secret: Some(secret) } => {
                check_len("secret", secret, MAX_SECRET_LEN)
            }
            Self::UpdateClue { card, clue } => {
                check_len("card", card.as_str(), MAX_IDENTITY_LEN)?;
                check_len("clue", clue, MAX_CLUE_LEN)
            }
            Self::PlayCard { card } | Self::TakeBackCard { card } => {
                check_len("card", card.as_str(), MAX_IDENTITY_LEN)
            }
            Self::ReorderCards { order } => {
                if order.len() > MAX_REORDER_LEN {
                    return Err(invalid(format!(
                        "order has {} entries, limit is {MAX_REORDER_LEN}",
                        order.len()
                    )));
                }
                Ok(())
            }
            Self::SubmitVote { target } => {
                check_len("target", target.as_str(), MAX_IDENTITY_LEN)
            }
            Self::SendChat { text } => check_len("text", text, MAX_CHAT_LEN),
            Self::StartGame { mode: None }
            | Self::EmergencyReset { secret: None }
            | Self::RequestRandomTheme
            | Self::RevealCards
            | Self::Heartbeat { .. } => Ok(()),
        }
    }
}

/// Client → server frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientEnvelope {
    /// Client-side sequence number, echoed in logs only.
    #[serde(default)]
    pub seq: u64,
    pub action: ClientAction,
}

fn check_len(field: &str, value: &str, max: usize) -> Result<(), ProtocolError> {
    let len = value.chars().count();
    if len > max {
        return Err(invalid(format!(
            "{field} is {len} characters, limit is {max}"
        )));
    }
    Ok(())
}

fn invalid(msg: impl Into<String>) -> ProtocolError {
    ProtocolError::InvalidMessage(msg.into())
}

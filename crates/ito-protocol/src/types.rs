//! Identity, phase and view types shared by the coordinator and clients.
//!
//! Everything in this module travels on the wire. Views (`PublicCard`,
//! `ParticipantView`, ...) are projections built by the session; they
//! never carry more than the receiving client is allowed to see.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Durable participant identity, supplied by the client.
///
/// Opaque to the server: it is only compared for equality. The client
/// keeps it in local storage so a page refresh resolves to the same
/// participant record (the reconnection path).
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    /// Wraps a raw identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier of a single dealt card. Generated by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub String);

impl CardId {
    /// Wraps a raw card identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who receives a server event.
///
/// `Participant` events are private (own hand, own role, authorization
/// errors). `All` events are public room state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every logged-in connection in the room.
    All,
    /// Every connection bound to this participant.
    Participant(ParticipantId),
}

// ---------------------------------------------------------------------------
// Phase, mode, role
// ---------------------------------------------------------------------------

/// Overall session phase.
///
/// ```text
/// waiting ──startGame──→ playing ──reveal ok──→ revealed ──startGame──→ playing
///                           │
///                           └──reveal failed (wolf)──→ voting ──resolved──→ revealed
///
/// any ──emergencyReset──→ waiting
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Waiting,
    Playing,
    Revealed,
    Voting,
}

impl Status {
    /// Topic changes are only legal before cards are committed.
    pub fn accepts_theme(self) -> bool {
        matches!(self, Self::Waiting | Self::Playing)
    }

    /// Numbers are public once the table has been revealed.
    pub fn numbers_public(self) -> bool {
        matches!(self, Self::Revealed | Self::Voting)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Waiting => "waiting",
            Self::Playing => "playing",
            Self::Revealed => "revealed",
            Self::Voting => "voting",
        };
        f.write_str(s)
    }
}

/// Game variant chosen at `startGame`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Normal,
    /// Two cards per participant.
    Double,
    /// Hidden wolves; a failed reveal goes to a vote.
    Wolf,
}

impl Mode {
    /// Number of cards each eligible participant is dealt.
    pub fn cards_per_participant(self) -> usize {
        match self {
            Self::Double => 2,
            Self::Normal | Self::Wolf => 1,
        }
    }
}

impl FromStr for Mode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" | "" => Ok(Self::Normal),
            "double" => Ok(Self::Double),
            "wolf" => Ok(Self::Wolf),
            other => Err(ProtocolError::InvalidMessage(format!(
                "unknown mode {other:?}"
            ))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Normal => "normal",
            Self::Double => "double",
            Self::Wolf => "wolf",
        };
        f.write_str(s)
    }
}

/// Hidden role in wolf mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Villager,
    Wolf,
}

/// Winning side of a wolf-mode game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Villagers,
    Wolves,
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Topic, phase and mode of the session. Public to every client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub theme: String,
    pub status: Status,
    pub mode: Mode,
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// A card on the table as clients see it.
///
/// `number` is `None` until the table is revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicCard {
    pub id: CardId,
    pub owner: ParticipantId,
    pub owner_name: String,
    pub clue: String,
    pub number: Option<u8>,
}

/// A card in the receiving participant's own hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnCard {
    pub id: CardId,
    pub number: u8,
    pub clue: String,
}

/// Roster entry. Never carries numbers or roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantView {
    pub id: ParticipantId,
    pub name: String,
    pub online: bool,
    pub spectator: bool,
    /// Cards still in hand.
    pub hand_size: usize,
    /// Cards this participant has on the table.
    pub played: usize,
}

/// One line of the chat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub name: String,
    pub text: String,
    /// Unix time in milliseconds.
    pub timestamp: u64,
}

/// A participant's role, published when a wolf-mode game ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleReveal {
    pub participant: ParticipantId,
    pub name: String,
    pub role: Role,
}

/// Final vote count for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub target: ParticipantId,
    pub votes: usize,
}

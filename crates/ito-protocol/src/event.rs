//! Server events: everything the coordinator tells clients.
//!
//! The session decides the [`Recipient`](crate::Recipient) of each event.
//! Private events (own hand, own role, authorization errors) are sent to a
//! single participant; the rest describe public room state.

use serde::{Deserialize, Serialize};

use crate::{
    ChatMessage, Mode, OwnCard, ParticipantId, ParticipantView, PublicCard,
    Role, RoleReveal, SessionConfig, Team, VoteTally,
};

/// An event sent by the server.
///
/// Internally tagged: `{ "type": "ThemeUpdated", "theme": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    // -- Login / roster --

    /// Snapshot sent to a connection right after it logs in.
    LoginSuccess {
        me: ParticipantView,
        config: SessionConfig,
        table: Vec<PublicCard>,
        chat_history: Vec<ChatMessage>,
        /// Online, non-spectator participants.
        active_count: usize,
    },

    /// Full roster, in join order.
    PlayerList { players: Vec<ParticipantView> },

    // -- Round setup --

    ThemeUpdated { theme: String },

    GameStarted { mode: Mode, active_count: usize },

    /// Private: the receiver's own cards, numbers included.
    YourHand { cards: Vec<OwnCard> },

    /// Private: the receiver's role. Wolves learn each other here.
    RoleAssigned {
        role: Role,
        fellow_wolves: Vec<ParticipantId>,
    },

    /// The pool ran dry before these participants got their cards.
    DealIncomplete { starved: Vec<ParticipantId> },

    // -- Table --

    /// Projected table; numbers are `null` until the reveal.
    TableUpdated { cards: Vec<PublicCard> },

    PlayerPlayed { participant: ParticipantId },

    PlayerTookBack { participant: ParticipantId },

    // -- Reveal --

    /// Revealed table and verdict. `failed_indices` holds every `i`
    /// where card `i` outranks card `i + 1`.
    GameResult {
        table: Vec<PublicCard>,
        success: bool,
        failed_indices: Vec<usize>,
    },

    /// The round is over; the next `StartGame` deals a new one.
    GameEnded,

    // -- Wolf vote --

    /// The reveal failed in wolf mode; the ballot opens after a pause.
    VotingAnnounced { opens_in_ms: u64 },

    VotingOpened {
        round: u8,
        /// Empty in round 1 (anyone but yourself).
        candidates: Vec<ParticipantId>,
        voters: Vec<ParticipantId>,
    },

    /// Progress only: who voted for whom stays hidden until the end.
    VoteCast {
        voter: ParticipantId,
        cast: usize,
        needed: usize,
    },

    /// Everyone got exactly one vote; round 1 starts over.
    VoteVoid { reopens_in_ms: u64 },

    /// Round 1 tied; a runoff among `candidates` opens after a pause.
    VoteTied {
        candidates: Vec<ParticipantId>,
        opens_in_ms: u64,
    },

    /// Terminal outcome of a wolf-mode round, roles revealed.
    GameOver {
        winner: Team,
        eliminated: Option<ParticipantId>,
        roles: Vec<RoleReveal>,
        tally: Vec<VoteTally>,
    },

    // -- Misc --

    ChatMessage { message: ChatMessage },

    /// The session was wiped; clients drop local state.
    ForceReset,

    HeartbeatAck { client_time: u64, server_time: u64 },

    /// Non-fatal advisory: the named action was ignored.
    Rejected { action: String, reason: String },

    /// Explicit error. `code` follows HTTP conventions (400, 403, ...).
    Error { code: u16, message: String },
}

/// Server → client frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEnvelope {
    /// Per-connection outbound counter.
    pub seq: u64,
    /// Unix time in milliseconds.
    pub timestamp: u64,
    pub event: ServerEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_json_shape() {
        let event = ServerEvent::Rejected {
            action: "PlayCard".into(),
            reason: "card not in hand".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Rejected");
        assert_eq!(json["action"], "PlayCard");
    }

    #[test]
    fn test_game_over_serializes_team_lowercase() {
        let event = ServerEvent::GameOver {
            winner: Team::Wolves,
            eliminated: None,
            roles: vec![RoleReveal {
                participant: ParticipantId::new("a"),
                name: "Ann".into(),
                role: Role::Wolf,
            }],
            tally: vec![],
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["winner"], "wolves");
        assert!(json["eliminated"].is_null());
        assert_eq!(json["roles"][0]["role"], "wolf");
    }

    #[test]
    fn test_unit_event_round_trips() {
        let json = serde_json::to_string(&ServerEvent::ForceReset).unwrap();
        assert_eq!(json, r#"{"type":"ForceReset"}"#);
        let back: ServerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ServerEvent::ForceReset);
    }
}

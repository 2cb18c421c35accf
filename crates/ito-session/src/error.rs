//! Error types for the session layer.

use ito_protocol::{CardId, ParticipantId, ServerEvent, Status};

/// How the room should surface a [`SessionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wrong phase, stale reference, duplicate vote. Advisory only.
    Precondition,
    /// Wrong reset secret. Explicit error to the requester.
    Authorization,
    /// Not enough numbers left in the pool. Never fails an action.
    Exhaustion,
}

/// Errors raised by session operations.
///
/// Every `Err` returned by a [`Session`](crate::Session) operation leaves
/// the session exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The acting identity has not logged in (or was wiped by a reset).
    #[error("unknown participant {0}")]
    UnknownParticipant(ParticipantId),

    #[error("{action} is not allowed while the game is {status}")]
    WrongPhase {
        action: &'static str,
        status: Status,
    },

    /// Topic changes are locked once a card is on the table.
    #[error("the topic is locked while cards are on the table")]
    TableNotEmpty,

    #[error("card {0} is not in your hand")]
    CardNotInHand(CardId),

    #[error("card {0} is not on the table")]
    CardNotOnTable(CardId),

    #[error("card {0} belongs to someone else")]
    NotCardOwner(CardId),

    /// The proposed order is not a permutation of the current table.
    #[error("table order is out of date")]
    StaleReorder,

    #[error("no eligible participants")]
    NoEligibleParticipants,

    #[error("every participant must play all cards before the reveal")]
    CardsStillInHand,

    #[error("the table is empty")]
    EmptyTable,

    #[error("the ballot is not open")]
    VotingClosed,

    #[error("you are not a voter in this round")]
    NotEligibleVoter,

    #[error("runoff candidates cannot vote")]
    CandidateCannotVote,

    #[error("you have already voted")]
    AlreadyVoted,

    #[error("unknown vote target {0}")]
    UnknownTarget(ParticipantId),

    #[error("you cannot vote for yourself")]
    SelfVote,

    #[error("{0} is not a runoff candidate")]
    TargetNotCandidate(ParticipantId),

    #[error("message is empty")]
    EmptyMessage,

    #[error("no preset topics are configured")]
    NoThemePresets,

    #[error("wrong reset secret")]
    Unauthorized,

    /// The pool ran out before every eligible participant was served.
    #[error("deck exhausted: {starved} participant(s) left without cards")]
    DeckExhausted { starved: usize },
}

impl SessionError {
    /// Classifies the error for logging and delivery.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized => ErrorKind::Authorization,
            Self::DeckExhausted { .. } => ErrorKind::Exhaustion,
            _ => ErrorKind::Precondition,
        }
    }

    /// The event sent back to the connection whose `action` failed.
    pub fn to_event(&self, action: &str) -> ServerEvent {
        match self.kind() {
            ErrorKind::Authorization => ServerEvent::Error {
                code: 403,
                message: self.to_string(),
            },
            ErrorKind::Precondition | ErrorKind::Exhaustion => {
                ServerEvent::Rejected {
                    action: action.to_string(),
                    reason: self.to_string(),
                }
            }
        }
    }
}

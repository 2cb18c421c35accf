//! The Ito session coordinator.
//!
//! One [`Session`] owns the whole game: who is here, who holds which
//! card, what lies on the table, whether the order was right and, in wolf
//! mode, the vote that follows a failed reveal.
//!
//! # How it fits in the stack
//!
//! ```text
//! Server (room actor)  ← owns the Session, delivers Outcomes, runs timers
//!     ↕
//! Session (this crate)  ← registry, deck, table, judge, roles, vote, chat
//!     ↕
//! Protocol  ← ids, views, ClientAction, ServerEvent
//! ```
//!
//! The session is synchronous and single-owner. It assumes nothing about
//! the order actions arrive in: every operation checks current state and
//! rejects what no longer applies.

mod chat;
mod config;
mod error;
mod session;

pub mod deck;
pub mod judge;
pub mod registry;
pub mod roles;
pub mod table;
pub mod vote;

pub use chat::{ChatLog, unix_millis};
pub use config::{DEFAULT_THEME_PRESETS, SessionSettings};
pub use error::{ErrorKind, SessionError};
pub use registry::{Card, Participant, Registry, Resolution};
pub use session::{
    Continuation, Deferred, INITIAL_THEME, Outcome, ROUND_PROMPT_THEME, Session,
    TimerSlot,
};
pub use table::Table;
pub use vote::{VoteResult, VotingState};

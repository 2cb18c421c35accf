//! Identity registry: durable participant records keyed by client identity.
//!
//! Records are never removed on disconnect, only flagged offline, so a
//! page refresh resolves to the same hand, role and spectator flag. The
//! registry only mutates records; the session decides what to announce.
//!
//! ```text
//!   resolve() ──→ [online] ──disconnect()──→ [offline]
//!                    ↑                           │
//!                    └──────── resolve() ────────┘
//! ```

use std::collections::HashMap;

use ito_protocol::{CardId, OwnCard, ParticipantId, ParticipantView, Role, Status};

use crate::SessionError;

/// Name given to participants who log in without one.
pub const DEFAULT_NAME: &str = "Anonymous";

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

/// A dealt card. Lives in exactly one hand or on the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub id: CardId,
    pub number: u8,
    pub clue: String,
}

impl Card {
    /// The owner's view of this card, number included.
    pub fn to_own(&self) -> OwnCard {
        OwnCard {
            id: self.id.clone(),
            number: self.number,
            clue: self.clue.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub online: bool,
    /// Joined after the current round began. Cleared when a round ends.
    pub spectator: bool,
    pub hand: Vec<Card>,
    /// Set only in wolf mode, for participants eligible at game start.
    pub role: Option<Role>,
}

impl Participant {
    /// Online and not spectating.
    pub fn is_eligible(&self) -> bool {
        self.online && !self.spectator
    }

    pub fn own_hand(&self) -> Vec<OwnCard> {
        self.hand.iter().map(Card::to_own).collect()
    }

    /// Roster entry. `played` is the number of this participant's cards
    /// on the table.
    pub fn view(&self, played: usize) -> ParticipantView {
        ParticipantView {
            id: self.id.clone(),
            name: self.name.clone(),
            online: self.online,
            spectator: self.spectator,
            hand_size: self.hand.len(),
            played,
        }
    }
}

/// What [`Registry::resolve`] did with a login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// A new record was created.
    Joined,
    /// An existing record was brought back online.
    Reconnected,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// All participants, in join order.
#[derive(Debug, Default)]
pub struct Registry {
    participants: Vec<Participant>,
    /// Identity → position in `participants`. Records are only ever
    /// appended, so positions never shift.
    index: HashMap<ParticipantId, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a login to a participant record.
    ///
    /// A known identity comes back online with its hand, role and
    /// spectator flag untouched; a non-empty `name` replaces the old one.
    /// An unknown identity gets a fresh record and is a spectator unless
    /// the session is still `waiting`.
    pub fn resolve(
        &mut self,
        id: &ParticipantId,
        name: &str,
        status: Status,
    ) -> Resolution {
        let name = name.trim();

        if let Some(&pos) = self.index.get(id) {
            let participant = &mut self.participants[pos];
            participant.online = true;
            if !name.is_empty() {
                participant.name = name.to_string();
            }
            return Resolution::Reconnected;
        }

        let name = if name.is_empty() { DEFAULT_NAME } else { name };
        self.index.insert(id.clone(), self.participants.len());
        self.participants.push(Participant {
            id: id.clone(),
            name: name.to_string(),
            online: true,
            spectator: status != Status::Waiting,
            hand: Vec::new(),
            role: None,
        });
        Resolution::Joined
    }

    /// Flags a participant offline. The record is kept.
    ///
    /// # Errors
    /// Returns [`SessionError::UnknownParticipant`] if the identity was
    /// never registered.
    pub fn disconnect(&mut self, id: &ParticipantId) -> Result<(), SessionError> {
        let participant = self
            .get_mut(id)
            .ok_or_else(|| SessionError::UnknownParticipant(id.clone()))?;
        participant.online = false;
        Ok(())
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.index.get(id).map(|&pos| &self.participants[pos])
    }

    pub fn get_mut(&mut self, id: &ParticipantId) -> Option<&mut Participant> {
        self.index.get(id).map(|&pos| &mut self.participants[pos])
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.index.contains_key(id)
    }

    /// Participants in join order.
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Participant> {
        self.participants.iter_mut()
    }

    /// Online, non-spectator participants in join order.
    pub fn eligible(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.is_eligible())
    }

    pub fn eligible_count(&self) -> usize {
        self.eligible().count()
    }

    /// Ends every spectator's wait; they join the next round.
    pub fn clear_spectators(&mut self) {
        for p in &mut self.participants {
            p.spectator = false;
        }
    }

    pub fn clear_roles(&mut self) {
        for p in &mut self.participants {
            p.role = None;
        }
    }

    /// Current wolves, in join order.
    pub fn wolves(&self) -> Vec<ParticipantId> {
        self.participants
            .iter()
            .filter(|p| p.role == Some(Role::Wolf))
            .map(|p| p.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

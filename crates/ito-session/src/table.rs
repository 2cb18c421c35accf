//! The shared table: the ordered sequence of played cards.
//!
//! Ownership of a card moves between a hand and the table only through
//! [`Table::play`] and [`Table::take_back`]; every operation either
//! applies completely or returns an error with nothing changed.

use std::collections::{HashMap, HashSet};

use ito_protocol::{CardId, ParticipantId, PublicCard};

use crate::registry::{Card, Registry};
use crate::SessionError;

/// A card on the table and who played it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayedCard {
    pub card: Card,
    pub owner: ParticipantId,
}

/// Where a clue edit landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClueLocation {
    Hand,
    Table,
}

#[derive(Debug, Default)]
pub struct Table {
    cards: Vec<PlayedCard>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `card_id` from `owner`'s hand to the end of the table.
    ///
    /// # Errors
    /// [`SessionError::CardNotInHand`] if the owner does not hold it
    /// (already played, someone else's, or stale).
    pub fn play(
        &mut self,
        registry: &mut Registry,
        owner: &ParticipantId,
        card_id: &CardId,
    ) -> Result<(), SessionError> {
        let participant = registry
            .get_mut(owner)
            .ok_or_else(|| SessionError::UnknownParticipant(owner.clone()))?;
        let pos = participant
            .hand
            .iter()
            .position(|c| &c.id == card_id)
            .ok_or_else(|| SessionError::CardNotInHand(card_id.clone()))?;

        let card = participant.hand.remove(pos);
        self.cards.push(PlayedCard {
            card,
            owner: owner.clone(),
        });
        Ok(())
    }

    /// Replaces the order with `new_order`.
    ///
    /// # Errors
    /// [`SessionError::StaleReorder`] unless `new_order` names every card
    /// currently on the table exactly once.
    pub fn reorder(&mut self, new_order: &[CardId]) -> Result<(), SessionError> {
        if new_order.len() != self.cards.len() {
            return Err(SessionError::StaleReorder);
        }
        let positions: HashMap<&CardId, usize> = new_order
            .iter()
            .enumerate()
            .map(|(i, id)| (id, i))
            .collect();
        if positions.len() != new_order.len()
            || self.cards.iter().any(|c| !positions.contains_key(&c.card.id))
        {
            return Err(SessionError::StaleReorder);
        }

        self.cards.sort_by_cached_key(|c| {
            positions.get(&c.card.id).copied().unwrap_or(usize::MAX)
        });
        Ok(())
    }

    /// Returns `card_id` from the table to its owner's hand.
    ///
    /// # Errors
    /// [`SessionError::CardNotOnTable`] if it is not there,
    /// [`SessionError::NotCardOwner`] if `owner` did not play it.
    pub fn take_back(
        &mut self,
        registry: &mut Registry,
        owner: &ParticipantId,
        card_id: &CardId,
    ) -> Result<(), SessionError> {
        let pos = self
            .cards
            .iter()
            .position(|c| &c.card.id == card_id)
            .ok_or_else(|| SessionError::CardNotOnTable(card_id.clone()))?;
        if &self.cards[pos].owner != owner {
            return Err(SessionError::NotCardOwner(card_id.clone()));
        }
        let participant = registry
            .get_mut(owner)
            .ok_or_else(|| SessionError::UnknownParticipant(owner.clone()))?;

        let played = self.cards.remove(pos);
        participant.hand.push(played.card);
        participant.hand.sort_by_key(|c| c.number);
        Ok(())
    }

    /// Edits the clue on a card `owner` holds or has on the table.
    ///
    /// # Errors
    /// [`SessionError::CardNotInHand`] if the owner has no such card
    /// anywhere.
    pub fn update_clue(
        &mut self,
        registry: &mut Registry,
        owner: &ParticipantId,
        card_id: &CardId,
        clue: &str,
    ) -> Result<ClueLocation, SessionError> {
        let participant = registry
            .get_mut(owner)
            .ok_or_else(|| SessionError::UnknownParticipant(owner.clone()))?;

        if let Some(card) = participant.hand.iter_mut().find(|c| &c.id == card_id) {
            card.clue = clue.to_string();
            return Ok(ClueLocation::Hand);
        }
        if let Some(played) = self
            .cards
            .iter_mut()
            .find(|c| &c.card.id == card_id && &c.owner == owner)
        {
            played.card.clue = clue.to_string();
            return Ok(ClueLocation::Table);
        }
        Err(SessionError::CardNotInHand(card_id.clone()))
    }

    /// Client view of the table; numbers are `None` when `redact` is set.
    pub fn project(&self, registry: &Registry, redact: bool) -> Vec<PublicCard> {
        self.cards
            .iter()
            .map(|c| PublicCard {
                id: c.card.id.clone(),
                owner: c.owner.clone(),
                owner_name: registry
                    .get(&c.owner)
                    .map(|p| p.name.clone())
                    .unwrap_or_default(),
                clue: c.card.clue.clone(),
                number: (!redact).then_some(c.card.number),
            })
            .collect()
    }

    /// Numbers in table order.
    pub fn numbers(&self) -> Vec<u8> {
        self.cards.iter().map(|c| c.card.number).collect()
    }

    pub fn ids(&self) -> Vec<CardId> {
        self.cards.iter().map(|c| c.card.id.clone()).collect()
    }

    /// How many cards `owner` has on the table.
    pub fn played_by(&self, owner: &ParticipantId) -> usize {
        self.cards.iter().filter(|c| &c.owner == owner).count()
    }

    /// Numbers held on the table, for excluding them from a deal pass.
    pub fn numbers_in_play(&self) -> HashSet<u8> {
        self.cards.iter().map(|c| c.card.number).collect()
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

//! Number pool and dealing.
//!
//! Each deal pass shuffles the numbers 1..=100 that are not already in
//! play and hands fresh cards to every eligible participant whose hand
//! is empty. Participants who hold cards are skipped, so a deal pass can
//! run any number of times without clobbering or duplicating hands.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use ito_protocol::{CardId, ParticipantId};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::registry::{Card, Registry};
use crate::SessionError;

/// Every number a card can carry.
pub const NUMBER_RANGE: RangeInclusive<u8> = 1..=100;

/// Result of a deal pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DealOutcome {
    /// Participants who received their full allotment, in join order.
    pub dealt: Vec<ParticipantId>,
    /// Participants left empty-handed because the pool ran dry.
    pub starved: Vec<ParticipantId>,
}

impl DealOutcome {
    pub fn is_complete(&self) -> bool {
        self.starved.is_empty()
    }

    /// The exhaustion condition, if this pass was partial.
    pub fn exhaustion(&self) -> Option<SessionError> {
        (!self.starved.is_empty()).then(|| SessionError::DeckExhausted {
            starved: self.starved.len(),
        })
    }
}

/// Deals `per_participant` cards to every eligible, empty-handed
/// participant, drawing without replacement from numbers not in `in_use`.
///
/// A participant either gets the whole allotment or nothing: once the
/// pool cannot cover the next participant, dealing stops and everyone
/// still waiting is reported in [`DealOutcome::starved`].
pub fn deal_to<R: Rng + ?Sized>(
    registry: &mut Registry,
    in_use: &HashSet<u8>,
    per_participant: usize,
    rng: &mut R,
) -> DealOutcome {
    let mut pool: Vec<u8> = NUMBER_RANGE.filter(|n| !in_use.contains(n)).collect();
    pool.shuffle(rng);

    let mut outcome = DealOutcome::default();
    for participant in registry
        .iter_mut()
        .filter(|p| p.is_eligible() && p.hand.is_empty())
    {
        if !outcome.starved.is_empty() || pool.len() < per_participant {
            outcome.starved.push(participant.id.clone());
            continue;
        }
        let split = pool.len() - per_participant;
        for number in pool.drain(split..) {
            participant.hand.push(Card {
                id: new_card_id(rng),
                number,
                clue: String::new(),
            });
        }
        participant.hand.sort_by_key(|c| c.number);
        outcome.dealt.push(participant.id.clone());
    }
    outcome
}

/// Empties every hand.
pub fn reset_hands(registry: &mut Registry) {
    for participant in registry.iter_mut() {
        participant.hand.clear();
    }
}

/// 128 random bits as 32 lowercase hex characters.
fn new_card_id<R: Rng + ?Sized>(rng: &mut R) -> CardId {
    let bytes: [u8; 16] = rng.random();
    CardId::new(bytes.iter().map(|b| format!("{b:02x}")).collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ito_protocol::Status;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn registry_with(n: usize) -> Registry {
        let mut reg = Registry::new();
        for i in 0..n {
            reg.resolve(&ParticipantId::new(format!("p{i}")), "", Status::Waiting);
        }
        reg
    }

    fn numbers(reg: &Registry) -> Vec<u8> {
        reg.iter().flat_map(|p| p.hand.iter().map(|c| c.number)).collect()
    }

    #[test]
    fn test_deal_to_double_mode_four_players_eight_distinct() {
        let mut reg = registry_with(4);
        let mut rng = StdRng::seed_from_u64(7);

        let outcome = deal_to(&mut reg, &HashSet::new(), 2, &mut rng);

        assert!(outcome.is_complete());
        assert_eq!(outcome.dealt.len(), 4);
        let nums = numbers(&reg);
        assert_eq!(nums.len(), 8);
        assert_eq!(nums.iter().collect::<HashSet<_>>().len(), 8);
        assert!(nums.iter().all(|n| NUMBER_RANGE.contains(n)));
        assert!(reg.iter().all(|p| p.hand.len() == 2));
    }

    #[test]
    fn test_deal_to_skips_holders_and_is_idempotent() {
        let mut reg = registry_with(3);
        let mut rng = StdRng::seed_from_u64(1);
        deal_to(&mut reg, &HashSet::new(), 1, &mut rng);
        let before = numbers(&reg);

        let in_use: HashSet<u8> = before.iter().copied().collect();
        let again = deal_to(&mut reg, &in_use, 1, &mut rng);

        assert!(again.dealt.is_empty());
        assert_eq!(numbers(&reg), before);
    }

    #[test]
    fn test_deal_to_skips_offline_and_spectators() {
        let mut reg = registry_with(2);
        reg.resolve(&ParticipantId::new("late"), "", Status::Playing);
        reg.disconnect(&ParticipantId::new("p1")).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        let outcome = deal_to(&mut reg, &HashSet::new(), 1, &mut rng);

        assert_eq!(outcome.dealt, vec![ParticipantId::new("p0")]);
        assert!(reg.get(&ParticipantId::new("late")).unwrap().hand.is_empty());
    }

    #[test]
    fn test_deal_to_avoids_numbers_in_use() {
        let mut reg = registry_with(1);
        let in_use: HashSet<u8> = NUMBER_RANGE.filter(|&n| n != 64).collect();
        let mut rng = StdRng::seed_from_u64(9);

        deal_to(&mut reg, &in_use, 1, &mut rng);

        assert_eq!(numbers(&reg), vec![64]);
    }

    #[test]
    fn test_deal_to_exhausted_pool_is_partial_not_split() {
        // 51 participants, two cards each: the 51st cannot be served.
        let mut reg = registry_with(51);
        let mut rng = StdRng::seed_from_u64(11);

        let outcome = deal_to(&mut reg, &HashSet::new(), 2, &mut rng);

        assert_eq!(outcome.dealt.len(), 50);
        assert_eq!(outcome.starved, vec![ParticipantId::new("p50")]);
        assert_eq!(
            outcome.exhaustion(),
            Some(SessionError::DeckExhausted { starved: 1 })
        );
        assert!(reg.iter().all(|p| p.hand.len() == 2 || p.hand.is_empty()));
        assert_eq!(numbers(&reg).into_iter().collect::<HashSet<_>>().len(), 100);
    }

    #[test]
    fn test_deal_to_card_ids_are_32_hex_chars() {
        let mut reg = registry_with(2);
        let mut rng = StdRng::seed_from_u64(5);
        deal_to(&mut reg, &HashSet::new(), 1, &mut rng);

        for p in reg.iter() {
            let id = p.hand[0].id.as_str();
            assert_eq!(id.len(), 32);
            assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn test_reset_hands_empties_everyone() {
        let mut reg = registry_with(3);
        let mut rng = StdRng::seed_from_u64(2);
        deal_to(&mut reg, &HashSet::new(), 2, &mut rng);

        reset_hands(&mut reg);

        assert!(reg.iter().all(|p| p.hand.is_empty()));
    }
}

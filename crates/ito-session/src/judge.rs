//! Reveal judgement.

use crate::registry::Registry;
use crate::table::Table;
use crate::SessionError;

/// Outcome of judging the table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub success: bool,
    /// Every `i` where card `i` outranks card `i + 1`.
    pub failed_indices: Vec<usize>,
}

/// Scans `numbers` left to right for inversions between neighbours.
pub fn judge(numbers: &[u8]) -> Verdict {
    let failed_indices: Vec<usize> = numbers
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[0] > pair[1])
        .map(|(i, _)| i)
        .collect();
    Verdict {
        success: failed_indices.is_empty(),
        failed_indices,
    }
}

/// Checks that a reveal is legal and judges the table.
///
/// Preconditions, in order: someone is eligible, no eligible participant
/// still holds a card, the table is not empty. Nothing is mutated.
pub fn attempt_reveal(
    table: &Table,
    registry: &Registry,
) -> Result<Verdict, SessionError> {
    if registry.eligible_count() == 0 {
        return Err(SessionError::NoEligibleParticipants);
    }
    if registry.eligible().any(|p| !p.hand.is_empty()) {
        return Err(SessionError::CardsStillInHand);
    }
    if table.is_empty() {
        return Err(SessionError::EmptyTable);
    }
    Ok(judge(&table.numbers()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Card;
    use ito_protocol::{CardId, ParticipantId, Status};

    #[test]
    fn test_judge_single_inversion() {
        let verdict = judge(&[3, 7, 5, 9]);
        assert!(!verdict.success);
        assert_eq!(verdict.failed_indices, [1]);
    }

    #[test]
    fn test_judge_ascending_is_success() {
        let verdict = judge(&[1, 2, 3]);
        assert!(verdict.success);
        assert!(verdict.failed_indices.is_empty());
    }

    #[test]
    fn test_judge_descending_marks_every_pair() {
        assert_eq!(judge(&[9, 5, 2, 1]).failed_indices, [0, 1, 2]);
    }

    #[test]
    fn test_judge_single_card_is_success() {
        assert!(judge(&[42]).success);
    }

    fn one_player() -> (Registry, Table) {
        let mut reg = Registry::new();
        let a = ParticipantId::new("a");
        reg.resolve(&a, "Ann", Status::Playing);
        reg.clear_spectators();
        reg.get_mut(&a).unwrap().hand.push(Card {
            id: CardId::new("c"),
            number: 50,
            clue: String::new(),
        });
        (reg, Table::new())
    }

    #[test]
    fn test_attempt_reveal_no_eligible_participants() {
        let (mut reg, table) = one_player();
        reg.disconnect(&ParticipantId::new("a")).unwrap();
        assert_eq!(
            attempt_reveal(&table, &reg),
            Err(SessionError::NoEligibleParticipants)
        );
    }

    #[test]
    fn test_attempt_reveal_cards_still_in_hand() {
        let (reg, table) = one_player();
        assert_eq!(
            attempt_reveal(&table, &reg),
            Err(SessionError::CardsStillInHand)
        );
    }

    #[test]
    fn test_attempt_reveal_empty_table() {
        let (mut reg, table) = one_player();
        reg.get_mut(&ParticipantId::new("a")).unwrap().hand.clear();
        assert_eq!(attempt_reveal(&table, &reg), Err(SessionError::EmptyTable));
    }

    #[test]
    fn test_attempt_reveal_all_played_judges_table() {
        let (mut reg, mut table) = one_player();
        table
            .play(&mut reg, &ParticipantId::new("a"), &CardId::new("c"))
            .unwrap();
        assert!(attempt_reveal(&table, &reg).unwrap().success);
    }
}

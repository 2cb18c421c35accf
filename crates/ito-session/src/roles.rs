//! Hidden-role assignment for wolf mode.

use std::collections::BTreeSet;

use ito_protocol::{ParticipantId, Role};
use rand::Rng;

use crate::registry::Registry;

/// Fewest eligible participants a wolf game needs.
pub const MIN_WOLF_PLAYERS: usize = 5;

/// Wolves for a table of `eligible` participants.
pub fn wolf_count(eligible: usize) -> usize {
    match eligible {
        0..=4 => 0,
        5..=6 => 1,
        7..=11 => 2,
        _ => 3,
    }
}

/// Draws the wolves among the eligible participants and gives every
/// eligible participant a role. Others keep no role. Below
/// [`MIN_WOLF_PLAYERS`] nobody is given a role.
///
/// Returns the wolves in join order.
pub fn assign<R: Rng + ?Sized>(
    registry: &mut Registry,
    rng: &mut R,
) -> Vec<ParticipantId> {
    let eligible: Vec<ParticipantId> =
        registry.eligible().map(|p| p.id.clone()).collect();
    let target = wolf_count(eligible.len());
    if target == 0 {
        return Vec::new();
    }

    // Rejection sampling: redraw until enough distinct indices are chosen.
    let mut chosen = BTreeSet::new();
    while chosen.len() < target {
        chosen.insert(rng.random_range(0..eligible.len()));
    }

    for (i, id) in eligible.iter().enumerate() {
        if let Some(p) = registry.get_mut(id) {
            p.role = Some(if chosen.contains(&i) {
                Role::Wolf
            } else {
                Role::Villager
            });
        }
    }
    chosen.into_iter().map(|i| eligible[i].clone()).collect()
}

//! Wolf-mode vote: bounded-round plurality with a single runoff.
//!
//! ```text
//!   Round1 ──all voted, everyone got one vote──→ Round1 (restart)
//!     │
//!     ├──unique plurality──→ Resolved (eliminated)
//!     └──tie──→ Round2 ──unique plurality──→ Resolved (eliminated)
//!                  └──tie again──→ Resolved (wolves win)
//! ```
//!
//! The ballot is closed between rounds; the session reopens it when the
//! pause continuation fires. Ballots are immutable once cast.

use std::collections::HashMap;

use ito_protocol::{ParticipantId, VoteTally};

use crate::registry::Registry;
use crate::SessionError;

/// How a completed round ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteResult {
    /// Round 1 where every target got exactly one vote. Ballots are
    /// cleared and round 1 runs again.
    Void,
    /// Round 1 tie: a runoff among these candidates follows.
    Runoff { candidates: Vec<ParticipantId> },
    /// A unique plurality. The game is over.
    Eliminated {
        target: ParticipantId,
        tally: Vec<VoteTally>,
    },
    /// The runoff tied too; wolves win by default.
    Deadlock { tally: Vec<VoteTally> },
}

#[derive(Debug, Clone)]
pub struct VotingState {
    round: u8,
    /// Voter → target, in cast order.
    ballots: Vec<(ParticipantId, ParticipantId)>,
    /// Non-empty only in round 2.
    candidates: Vec<ParticipantId>,
    open: bool,
}

impl Default for VotingState {
    fn default() -> Self {
        Self::new()
    }
}

impl VotingState {
    /// Round 1, ballot closed until [`open`](Self::open).
    pub fn new() -> Self {
        Self {
            round: 1,
            ballots: Vec::new(),
            candidates: Vec::new(),
            open: false,
        }
    }

    pub fn round(&self) -> u8 {
        self.round
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn candidates(&self) -> &[ParticipantId] {
        &self.candidates
    }

    pub fn ballots_cast(&self) -> usize {
        self.ballots.len()
    }

    pub fn has_voted(&self, voter: &ParticipantId) -> bool {
        self.ballots.iter().any(|(v, _)| v == voter)
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    fn is_candidate(&self, id: &ParticipantId) -> bool {
        self.candidates.contains(id)
    }

    /// Who may vote right now: eligible participants dealt into this
    /// game, minus the runoff candidates in round 2.
    pub fn eligible_voters(&self, registry: &Registry) -> Vec<ParticipantId> {
        registry
            .eligible()
            .filter(|p| p.role.is_some() && !self.is_candidate(&p.id))
            .map(|p| p.id.clone())
            .collect()
    }

    /// Records `voter`'s ballot for `target`.
    ///
    /// # Errors
    /// Checked in order: ballot closed, voter not eligible (candidates
    /// get [`SessionError::CandidateCannotVote`]), already voted, target
    /// unknown or spectating, self-vote, target not a runoff candidate.
    pub fn submit(
        &mut self,
        registry: &Registry,
        voter: &ParticipantId,
        target: &ParticipantId,
    ) -> Result<(), SessionError> {
        if !self.open {
            return Err(SessionError::VotingClosed);
        }
        if self.round == 2 && self.is_candidate(voter) {
            return Err(SessionError::CandidateCannotVote);
        }
        if !registry
            .get(voter)
            .is_some_and(|p| p.is_eligible() && p.role.is_some())
        {
            return Err(SessionError::NotEligibleVoter);
        }
        if self.has_voted(voter) {
            return Err(SessionError::AlreadyVoted);
        }
        if !registry
            .get(target)
            .is_some_and(|p| !p.spectator && p.role.is_some())
        {
            return Err(SessionError::UnknownTarget(target.clone()));
        }
        if self.round == 1 && voter == target {
            return Err(SessionError::SelfVote);
        }
        if self.round == 2 && !self.is_candidate(target) {
            return Err(SessionError::TargetNotCandidate(target.clone()));
        }

        self.ballots.push((voter.clone(), target.clone()));
        Ok(())
    }

    /// Open, and every current voter has voted. Round 1 also needs at
    /// least one ballot; a runoff with no voters left is complete.
    ///
    /// Re-evaluated whenever the eligible set shrinks (a disconnect).
    pub fn is_complete(&self, registry: &Registry) -> bool {
        if !self.open {
            return false;
        }
        let voters = self.eligible_voters(registry);
        if self.round == 1 && self.ballots.is_empty() {
            return false;
        }
        voters.iter().all(|v| self.has_voted(v))
    }

    /// Votes per target, highest first; ties in first-vote order.
    pub fn tally(&self) -> Vec<VoteTally> {
        let mut order: Vec<ParticipantId> = Vec::new();
        let mut counts: HashMap<&ParticipantId, usize> = HashMap::new();
        for (_, target) in &self.ballots {
            let count = counts.entry(target).or_insert(0);
            if *count == 0 {
                order.push(target.clone());
            }
            *count += 1;
        }
        let mut tally: Vec<VoteTally> = order
            .into_iter()
            .map(|target| {
                let votes = counts.get(&target).copied().unwrap_or(0);
                VoteTally { target, votes }
            })
            .collect();
        tally.sort_by(|a, b| b.votes.cmp(&a.votes));
        tally
    }

    /// Closes the ballot and resolves the round.
    ///
    /// `Void` and `Runoff` leave the state ready for the next
    /// [`open`](Self::open); the other results are terminal.
    pub fn resolve(&mut self) -> VoteResult {
        self.open = false;
        let tally = self.tally();
        let max = tally.first().map_or(0, |t| t.votes);
        let winners: Vec<ParticipantId> = tally
            .iter()
            .filter(|t| t.votes == max)
            .map(|t| t.target.clone())
            .collect();

        if self.round == 1 && max == 1 && winners.len() == self.ballots.len() {
            self.ballots.clear();
            return VoteResult::Void;
        }
        if winners.len() > 1 {
            if self.round == 1 {
                self.round = 2;
                self.ballots.clear();
                self.candidates = winners.clone();
                return VoteResult::Runoff {
                    candidates: winners,
                };
            }
            return VoteResult::Deadlock { tally };
        }
        match winners.into_iter().next() {
            Some(target) => VoteResult::Eliminated { target, tally },
            None => VoteResult::Deadlock { tally },
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

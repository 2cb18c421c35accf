//! The session aggregate: the only thing the server talks to.
//!
//! Every operation runs to completion against `&mut self` and returns an
//! [`Outcome`]: the events to deliver, the continuations to schedule and
//! the timer slots to cancel. Timers and sockets belong to the room that
//! owns the session.
//!
//! An `Err` from any operation means nothing changed.
//!
//! ```text
//! waiting ──start──→ playing ──reveal──→ revealed ──start──→ playing
//!                       │  ↺ start
//!                       └──reveal failed, wolf──→ voting ──resolved──→ revealed
//! any ──emergency reset / empty-room wipe──→ waiting
//! ```

use std::collections::HashSet;
use std::time::Duration;

use ito_protocol::{
    CardId, ChatMessage, ClientAction, Mode, ParticipantId, ParticipantView,
    PublicCard, Recipient, Role, RoleReveal, ServerEvent, SessionConfig, Status,
    Team, VoteTally,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::chat::{ChatLog, unix_millis};
use crate::config::SessionSettings;
use crate::registry::{Participant, Registry, Resolution};
use crate::table::{ClueLocation, Table};
use crate::vote::{VoteResult, VotingState};
use crate::{ErrorKind, SessionError, deck, judge, roles};

/// Topic shown before anyone sets one.
pub const INITIAL_THEME: &str = "Waiting for a topic...";
/// Topic shown after `StartGame` until a real one is set.
pub const ROUND_PROMPT_THEME: &str = "Set a topic to deal cards...";

// ---------------------------------------------------------------------------
// Deferred continuations
// ---------------------------------------------------------------------------

/// Timer slot a continuation occupies. One pending continuation per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerSlot {
    Voting,
    Wipe,
}

/// Work to resume later through [`Session::resume`].
///
/// Each carries the generation it was created under; a continuation that
/// outlives a reset or phase change no longer matches and is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Open (or reopen) the wolf-mode ballot.
    OpenBallot { epoch: u64 },
    /// Wipe the session after the room stayed empty.
    Wipe { token: u64 },
}

impl Continuation {
    pub fn slot(&self) -> TimerSlot {
        match self {
            Self::OpenBallot { .. } => TimerSlot::Voting,
            Self::Wipe { .. } => TimerSlot::Wipe,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deferred {
    pub delay: Duration,
    pub continuation: Continuation,
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Everything an operation wants done outside the session.
#[derive(Debug, Default)]
pub struct Outcome {
    /// Events in emission order.
    pub events: Vec<(Recipient, ServerEvent)>,
    pub deferred: Vec<Deferred>,
    pub cancelled: Vec<TimerSlot>,
}

impl Outcome {
    fn broadcast(&mut self, event: ServerEvent) {
        self.events.push((Recipient::All, event));
    }

    fn send_to(&mut self, id: &ParticipantId, event: ServerEvent) {
        self.events.push((Recipient::Participant(id.clone()), event));
    }

    fn defer(&mut self, delay: Duration, continuation: Continuation) {
        self.deferred.push(Deferred {
            delay,
            continuation,
        });
    }

    fn cancel(&mut self, slot: TimerSlot) {
        if !self.cancelled.contains(&slot) {
            self.cancelled.push(slot);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.deferred.is_empty() && self.cancelled.is_empty()
    }

    /// Events addressed to everyone.
    pub fn broadcasts(&self) -> impl Iterator<Item = &ServerEvent> {
        self.events.iter().filter_map(|(to, e)| match to {
            Recipient::All => Some(e),
            Recipient::Participant(_) => None,
        })
    }

    /// Events addressed privately to `id`.
    pub fn private_to<'a>(
        &'a self,
        id: &ParticipantId,
    ) -> impl Iterator<Item = &'a ServerEvent> + use<'a> {
        let id = id.clone();
        self.events.iter().filter_map(move |(to, e)| match to {
            Recipient::Participant(p) if *p == id => Some(e),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Everything a full reset throws away.
#[derive(Debug)]
struct State {
    config: SessionConfig,
    registry: Registry,
    table: Table,
    voting: Option<VotingState>,
    chat: ChatLog,
}

impl State {
    fn new(settings: &SessionSettings) -> Self {
        Self {
            config: SessionConfig {
                theme: INITIAL_THEME.to_string(),
                status: Status::Waiting,
                mode: Mode::Normal,
            },
            registry: Registry::new(),
            table: Table::new(),
            voting: None,
            chat: ChatLog::new(settings.chat_capacity, settings.chat_retention),
        }
    }
}

/// The authoritative game session.
pub struct Session {
    state: State,
    settings: SessionSettings,
    rng: StdRng,
    /// Bumped on every game start, game end and reset. Survives resets.
    epoch: u64,
    wipe_seq: u64,
    pending_wipe: Option<u64>,
}

impl Session {
    /// Creates a session seeded from the OS.
    pub fn new(settings: SessionSettings) -> Self {
        Self::with_rng(settings, StdRng::from_os_rng())
    }

    /// Creates a session with a fixed seed, for reproducible deals.
    pub fn with_seed(settings: SessionSettings, seed: u64) -> Self {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(settings: SessionSettings, rng: StdRng) -> Self {
        Self {
            state: State::new(&settings),
            settings,
            rng,
            epoch: 0,
            wipe_seq: 0,
            pending_wipe: None,
        }
    }

    // -- Accessors --------------------------------------------------------

    pub fn config(&self) -> &SessionConfig {
        &self.state.config
    }

    pub fn status(&self) -> Status {
        self.state.config.status
    }

    pub fn mode(&self) -> Mode {
        self.state.config.mode
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Registry {
        &self.state.registry
    }

    pub fn table(&self) -> &Table {
        &self.state.table
    }

    pub fn voting(&self) -> Option<&VotingState> {
        self.state.voting.as_ref()
    }

    /// Online, non-spectator participants.
    pub fn active_count(&self) -> usize {
        self.state.registry.eligible_count()
    }

    pub fn wipe_pending(&self) -> bool {
        self.pending_wipe.is_some()
    }

    // -- Dispatch ---------------------------------------------------------

    /// Applies a client action on behalf of `actor`.
    ///
    /// `Login` registers its own `participant`; every other action acts
    /// as `actor`, which must already be registered.
    pub fn apply(
        &mut self,
        actor: &ParticipantId,
        action: ClientAction,
    ) -> Result<Outcome, SessionError> {
        let action_name = action.name();
        let result = match action {
            ClientAction::Login { participant, name } => {
                Ok(self.login(&participant, &name))
            }
            ClientAction::UpdateTheme { theme } => self.update_theme(actor, &theme),
            ClientAction::RequestRandomTheme => self.request_random_theme(actor),
            ClientAction::StartGame { mode } => self.start_game(actor, mode.as_deref()),
            ClientAction::EmergencyReset { secret } => {
                self.emergency_reset(actor, secret.as_deref())
            }
            ClientAction::UpdateClue { card, clue } => {
                self.update_clue(actor, &card, &clue)
            }
            ClientAction::PlayCard { card } => self.play_card(actor, &card),
            ClientAction::ReorderCards { order } => self.reorder_cards(actor, &order),
            ClientAction::TakeBackCard { card } => self.take_back_card(actor, &card),
            ClientAction::RevealCards => self.reveal_cards(actor),
            ClientAction::SubmitVote { target } => self.submit_vote(actor, &target),
            ClientAction::SendChat { text } => self.send_chat(actor, &text),
            ClientAction::Heartbeat { .. } => {
                self.require(actor)?;
                Ok(Outcome::default())
            }
        };

        if let Err(err) = &result {
            match err.kind() {
                ErrorKind::Authorization => {
                    warn!(%actor, action = action_name, error = %err, "action refused")
                }
                ErrorKind::Precondition | ErrorKind::Exhaustion => {
                    debug!(%actor, action = action_name, error = %err, "action rejected")
                }
            }
        }
        result
    }

    // -- Login / lifecycle ------------------------------------------------

    /// Registers or reconnects `id` and sends it a full snapshot.
    pub fn login(&mut self, id: &ParticipantId, name: &str) -> Outcome {
        let status = self.status();
        let resolution = self.state.registry.resolve(id, name, status);
        match resolution {
            Resolution::Joined => info!(participant = %id, %status, "participant joined"),
            Resolution::Reconnected => info!(participant = %id, "participant reconnected"),
        }

        let mut out = Outcome::default();
        let now = unix_millis();
        let chat_history = self.state.chat.history(now);
        if let Some(me) = self.view_of(id) {
            out.send_to(
                id,
                ServerEvent::LoginSuccess {
                    me,
                    config: self.state.config.clone(),
                    table: self.table_view(),
                    chat_history,
                    active_count: self.active_count(),
                },
            );
        }
        out.send_to(id, self.hand_event(id));
        if let Some(event) = self.role_event(id) {
            out.send_to(id, event);
        }
        if let Some(voting) = self.state.voting.as_ref().filter(|v| v.is_open()) {
            out.send_to(id, self.voting_opened_event(voting));
        }
        self.push_roster(&mut out);
        out
    }

    /// The last connection bound to `id` closed.
    pub fn disconnect(&mut self, id: &ParticipantId) -> Result<Outcome, SessionError> {
        self.state.registry.disconnect(id)?;
        info!(participant = %id, "participant offline");

        let mut out = Outcome::default();
        self.push_roster(&mut out);
        self.check_vote_completion(&mut out);
        Ok(out)
    }

    /// The room has no connections left: schedule a wipe after the grace
    /// period.
    pub fn room_emptied(&mut self) -> Outcome {
        self.wipe_seq += 1;
        let token = self.wipe_seq;
        self.pending_wipe = Some(token);
        info!(
            grace_ms = millis(self.settings.empty_room_grace),
            "room empty, wipe scheduled"
        );

        let mut out = Outcome::default();
        out.defer(self.settings.empty_room_grace, Continuation::Wipe { token });
        out
    }

    /// A connection arrived: any pending wipe is called off.
    pub fn connection_opened(&mut self) -> Outcome {
        let mut out = Outcome::default();
        if self.pending_wipe.take().is_some() {
            debug!("pending wipe cancelled");
            out.cancel(TimerSlot::Wipe);
        }
        out
    }

    /// Runs a deferred continuation if it is still current.
    pub fn resume(&mut self, continuation: Continuation) -> Outcome {
        let mut out = Outcome::default();
        match continuation {
            Continuation::OpenBallot { epoch } => {
                let current = epoch == self.epoch && self.status() == Status::Voting;
                let Some(voting) = self.state.voting.as_mut().filter(|_| current) else {
                    debug!(epoch, current = self.epoch, "stale ballot continuation");
                    return out;
                };
                voting.open();
                let round = voting.round();
                info!(round, epoch, "ballot open");
                if let Some(voting) = &self.state.voting {
                    out.broadcast(self.voting_opened_event(voting));
                }
                self.check_vote_completion(&mut out);
            }
            Continuation::Wipe { token } => {
                if self.pending_wipe != Some(token) {
                    debug!(token, "stale wipe continuation");
                    return out;
                }
                self.reset();
                info!(epoch = self.epoch, "empty room wiped");
                out.cancel(TimerSlot::Voting);
            }
        }
        out
    }

    // -- Topic ------------------------------------------------------------

    pub fn update_theme(
        &mut self,
        actor: &ParticipantId,
        theme: &str,
    ) -> Result<Outcome, SessionError> {
        self.require(actor)?;
        self.check_theme_allowed("UpdateTheme")?;
        let theme = theme.trim();
        if theme.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        Ok(self.set_theme(theme.to_string()))
    }

    /// Picks a preset uniformly and formats it with its 1-based index.
    pub fn request_random_theme(
        &mut self,
        actor: &ParticipantId,
    ) -> Result<Outcome, SessionError> {
        self.require(actor)?;
        self.check_theme_allowed("RequestRandomTheme")?;
        let presets = &self.settings.theme_presets;
        if presets.is_empty() {
            return Err(SessionError::NoThemePresets);
        }
        let index = self.rng.random_range(0..presets.len());
        let theme = format!("Random topic #{}: {}", index + 1, presets[index]);
        Ok(self.set_theme(theme))
    }

    fn check_theme_allowed(&self, action: &'static str) -> Result<(), SessionError> {
        let status = self.status();
        if !status.accepts_theme() {
            return Err(SessionError::WrongPhase { action, status });
        }
        if !self.state.table.is_empty() {
            return Err(SessionError::TableNotEmpty);
        }
        Ok(())
    }

    fn set_theme(&mut self, theme: String) -> Outcome {
        debug!(%theme, "topic set");
        self.state.config.theme = theme.clone();
        let mut out = Outcome::default();
        out.broadcast(ServerEvent::ThemeUpdated { theme });
        if self.status() == Status::Playing {
            self.deal_pass(&mut out);
        }
        out
    }

    // -- Round lifecycle --------------------------------------------------

    /// Starts a fresh round. Cards are dealt once a topic is set.
    pub fn start_game(
        &mut self,
        actor: &ParticipantId,
        mode: Option<&str>,
    ) -> Result<Outcome, SessionError> {
        self.require(actor)?;
        let status = self.status();
        if status == Status::Voting {
            return Err(SessionError::WrongPhase {
                action: "StartGame",
                status,
            });
        }

        let requested = mode.unwrap_or_default();
        let mut mode = requested.parse::<Mode>().unwrap_or_else(|_| {
            debug!(mode = requested, "unknown mode, playing normal");
            Mode::Normal
        });

        let mut out = Outcome::default();
        out.cancel(TimerSlot::Voting);
        self.state.voting = None;
        self.state.table.clear();
        deck::reset_hands(&mut self.state.registry);
        self.state.registry.clear_spectators();
        self.state.registry.clear_roles();

        let active = self.active_count();
        if mode == Mode::Wolf && active < roles::MIN_WOLF_PLAYERS {
            info!(active, "too few players for wolf mode, playing normal");
            mode = Mode::Normal;
        }

        self.epoch += 1;
        let config = &mut self.state.config;
        config.status = Status::Playing;
        config.mode = mode;
        config.theme = ROUND_PROMPT_THEME.to_string();
        info!(%actor, %mode, active, epoch = self.epoch, "game started");

        out.broadcast(ServerEvent::ThemeUpdated {
            theme: ROUND_PROMPT_THEME.to_string(),
        });
        out.broadcast(ServerEvent::GameStarted {
            mode,
            active_count: active,
        });
        let ids: Vec<ParticipantId> =
            self.state.registry.iter().map(|p| p.id.clone()).collect();
        for id in &ids {
            out.send_to(id, ServerEvent::YourHand { cards: Vec::new() });
        }

        if mode == Mode::Wolf {
            let wolves = roles::assign(&mut self.state.registry, &mut self.rng);
            debug!(wolves = wolves.len(), "roles assigned");
            for id in &ids {
                if let Some(event) = self.role_event(id) {
                    out.send_to(id, event);
                }
            }
        }

        self.push_table(&mut out);
        self.push_roster(&mut out);
        Ok(out)
    }

    /// Judges the table. A failure in wolf mode opens the vote.
    pub fn reveal_cards(&mut self, actor: &ParticipantId) -> Result<Outcome, SessionError> {
        self.require(actor)?;
        self.require_status("RevealCards", Status::Playing)?;
        let verdict = judge::attempt_reveal(&self.state.table, &self.state.registry)?;
        let wolf = self.mode() == Mode::Wolf;

        let mut out = Outcome::default();
        if verdict.success || !wolf {
            self.state.config.status = Status::Revealed;
            info!(
                %actor,
                success = verdict.success,
                failed = verdict.failed_indices.len(),
                "cards revealed"
            );
            out.broadcast(ServerEvent::GameResult {
                table: self.table_view(),
                success: verdict.success,
                failed_indices: verdict.failed_indices,
            });
            if wolf {
                self.finish_wolf_game(&mut out, Team::Villagers, None, Vec::new());
            } else {
                self.state.registry.clear_spectators();
                self.push_roster(&mut out);
                out.broadcast(ServerEvent::GameEnded);
            }
            return Ok(out);
        }

        self.state.config.status = Status::Voting;
        self.state.voting = Some(VotingState::new());
        info!(%actor, failed = verdict.failed_indices.len(), epoch = self.epoch, "reveal failed, vote announced");
        out.broadcast(ServerEvent::GameResult {
            table: self.table_view(),
            success: false,
            failed_indices: verdict.failed_indices,
        });
        let pause = self.settings.vote_announce_pause;
        out.broadcast(ServerEvent::VotingAnnounced {
            opens_in_ms: millis(pause),
        });
        out.defer(pause, Continuation::OpenBallot { epoch: self.epoch });
        Ok(out)
    }

    /// Wipes the whole session. Spectators must know the reset secret.
    pub fn emergency_reset(
        &mut self,
        actor: &ParticipantId,
        secret: Option<&str>,
    ) -> Result<Outcome, SessionError> {
        let requester = self.require(actor)?;
        if requester.spectator && secret != Some(self.settings.reset_secret.as_str()) {
            return Err(SessionError::Unauthorized);
        }

        self.reset();
        info!(%actor, epoch = self.epoch, "emergency reset");
        let mut out = Outcome::default();
        out.cancel(TimerSlot::Voting);
        out.cancel(TimerSlot::Wipe);
        out.broadcast(ServerEvent::ForceReset);
        Ok(out)
    }

    /// Replaces all state with a fresh instance; the epoch moves on.
    fn reset(&mut self) {
        self.state = State::new(&self.settings);
        self.epoch += 1;
        self.pending_wipe = None;
    }

    // -- Cards ------------------------------------------------------------

    pub fn update_clue(
        &mut self,
        actor: &ParticipantId,
        card: &CardId,
        clue: &str,
    ) -> Result<Outcome, SessionError> {
        self.require(actor)?;
        let status = self.status();
        if status.numbers_public() {
            return Err(SessionError::WrongPhase {
                action: "UpdateClue",
                status,
            });
        }
        let location =
            self.state
                .table
                .update_clue(&mut self.state.registry, actor, card, clue)?;

        let mut out = Outcome::default();
        match location {
            ClueLocation::Hand => out.send_to(actor, self.hand_event(actor)),
            ClueLocation::Table => self.push_table(&mut out),
        }
        Ok(out)
    }

    pub fn play_card(
        &mut self,
        actor: &ParticipantId,
        card: &CardId,
    ) -> Result<Outcome, SessionError> {
        self.require(actor)?;
        self.require_status("PlayCard", Status::Playing)?;
        self.state.table.play(&mut self.state.registry, actor, card)?;
        debug!(%actor, %card, "card played");

        let mut out = Outcome::default();
        out.send_to(actor, self.hand_event(actor));
        self.push_table(&mut out);
        out.broadcast(ServerEvent::PlayerPlayed {
            participant: actor.clone(),
        });
        self.push_roster(&mut out);
        Ok(out)
    }

    pub fn reorder_cards(
        &mut self,
        actor: &ParticipantId,
        order: &[CardId],
    ) -> Result<Outcome, SessionError> {
        self.require(actor)?;
        self.require_status("ReorderCards", Status::Playing)?;
        self.state.table.reorder(order)?;

        let mut out = Outcome::default();
        self.push_table(&mut out);
        Ok(out)
    }

    pub fn take_back_card(
        &mut self,
        actor: &ParticipantId,
        card: &CardId,
    ) -> Result<Outcome, SessionError> {
        self.require(actor)?;
        let status = self.status();
        if status.numbers_public() {
            return Err(SessionError::WrongPhase {
                action: "TakeBackCard",
                status,
            });
        }
        self.state
            .table
            .take_back(&mut self.state.registry, actor, card)?;
        debug!(%actor, %card, "card taken back");

        let mut out = Outcome::default();
        out.send_to(actor, self.hand_event(actor));
        self.push_table(&mut out);
        out.broadcast(ServerEvent::PlayerTookBack {
            participant: actor.clone(),
        });
        self.push_roster(&mut out);
        Ok(out)
    }

    /// Every eligible, empty-handed participant gets their cards.
    fn deal_pass(&mut self, out: &mut Outcome) {
        let mut in_use: HashSet<u8> = self.state.table.numbers_in_play();
        in_use.extend(
            self.state
                .registry
                .iter()
                .flat_map(|p| p.hand.iter().map(|c| c.number)),
        );
        let per = self.mode().cards_per_participant();
        let dealt = deck::deal_to(&mut self.state.registry, &in_use, per, &mut self.rng);

        for id in &dealt.dealt {
            out.send_to(id, self.hand_event(id));
        }
        if let Some(err) = dealt.exhaustion() {
            warn!(error = %err, dealt = dealt.dealt.len(), "partial deal");
            out.broadcast(ServerEvent::DealIncomplete {
                starved: dealt.starved.clone(),
            });
        }
        if !dealt.dealt.is_empty() {
            debug!(count = dealt.dealt.len(), per, "cards dealt");
            self.push_roster(out);
        }
    }

    // -- Vote -------------------------------------------------------------

    pub fn submit_vote(
        &mut self,
        actor: &ParticipantId,
        target: &ParticipantId,
    ) -> Result<Outcome, SessionError> {
        self.require(actor)?;
        self.require_status("SubmitVote", Status::Voting)?;
        let registry = &self.state.registry;
        let Some(voting) = self.state.voting.as_mut() else {
            return Err(SessionError::VotingClosed);
        };
        voting.submit(registry, actor, target)?;
        let cast = voting.ballots_cast();
        let needed = voting.eligible_voters(registry).len();
        debug!(%actor, cast, needed, "vote cast");

        let mut out = Outcome::default();
        out.broadcast(ServerEvent::VoteCast {
            voter: actor.clone(),
            cast,
            needed,
        });
        self.check_vote_completion(&mut out);
        Ok(out)
    }

    fn check_vote_completion(&mut self, out: &mut Outcome) {
        let registry = &self.state.registry;
        let Some(voting) = self
            .state
            .voting
            .as_mut()
            .filter(|v| v.is_complete(registry))
        else {
            return;
        };
        let round = voting.round();
        let result = voting.resolve();
        let pause = self.settings.vote_round_pause;

        match result {
            VoteResult::Void => {
                info!(round, "vote void, round restarts");
                out.broadcast(ServerEvent::VoteVoid {
                    reopens_in_ms: millis(pause),
                });
                out.defer(pause, Continuation::OpenBallot { epoch: self.epoch });
            }
            VoteResult::Runoff { candidates } => {
                info!(candidates = candidates.len(), "vote tied, runoff");
                out.broadcast(ServerEvent::VoteTied {
                    candidates,
                    opens_in_ms: millis(pause),
                });
                out.defer(pause, Continuation::OpenBallot { epoch: self.epoch });
            }
            VoteResult::Eliminated { target, tally } => {
                let was_wolf = self
                    .state
                    .registry
                    .get(&target)
                    .is_some_and(|p| p.role == Some(Role::Wolf));
                let winner = if was_wolf {
                    Team::Villagers
                } else {
                    Team::Wolves
                };
                info!(eliminated = %target, was_wolf, round, "vote resolved");
                self.finish_wolf_game(out, winner, Some(target), tally);
            }
            VoteResult::Deadlock { tally } => {
                info!("runoff tied again, wolves win");
                self.finish_wolf_game(out, Team::Wolves, None, tally);
            }
        }
    }

    /// Ends a wolf game: roles revealed, spectators promoted.
    fn finish_wolf_game(
        &mut self,
        out: &mut Outcome,
        winner: Team,
        eliminated: Option<ParticipantId>,
        tally: Vec<VoteTally>,
    ) {
        self.state.config.status = Status::Revealed;
        self.state.voting = None;
        self.state.registry.clear_spectators();
        self.epoch += 1;
        out.cancel(TimerSlot::Voting);
        info!(?winner, epoch = self.epoch, "wolf game over");

        out.broadcast(ServerEvent::GameOver {
            winner,
            eliminated,
            roles: self.role_reveals(),
            tally,
        });
        self.push_roster(out);
        out.broadcast(ServerEvent::GameEnded);
    }

    // -- Chat -------------------------------------------------------------

    pub fn send_chat(
        &mut self,
        actor: &ParticipantId,
        text: &str,
    ) -> Result<Outcome, SessionError> {
        let name = self.require(actor)?.name.clone();
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let now = unix_millis();
        let message = ChatMessage {
            name,
            text: text.to_string(),
            timestamp: now,
        };
        self.state.chat.push(message.clone(), now);

        let mut out = Outcome::default();
        out.broadcast(ServerEvent::ChatMessage { message });
        Ok(out)
    }

    // -- Helpers ----------------------------------------------------------

    fn require(
        &self,
        id: &ParticipantId,
    ) -> Result<&Participant, SessionError> {
        self.state
            .registry
            .get(id)
            .ok_or_else(|| SessionError::UnknownParticipant(id.clone()))
    }

    fn require_status(
        &self,
        action: &'static str,
        expected: Status,
    ) -> Result<(), SessionError> {
        let status = self.status();
        if status != expected {
            return Err(SessionError::WrongPhase { action, status });
        }
        Ok(())
    }

    fn view_of(&self, id: &ParticipantId) -> Option<ParticipantView> {
        self.state
            .registry
            .get(id)
            .map(|p| p.view(self.state.table.played_by(id)))
    }

    fn roster(&self) -> Vec<ParticipantView> {
        self.state
            .registry
            .iter()
            .map(|p| p.view(self.state.table.played_by(&p.id)))
            .collect()
    }

    fn push_roster(&self, out: &mut Outcome) {
        out.broadcast(ServerEvent::PlayerList {
            players: self.roster(),
        });
    }

    /// Numbers stay hidden until the table is revealed.
    fn table_view(&self) -> Vec<PublicCard> {
        let redact = !self.status().numbers_public();
        self.state.table.project(&self.state.registry, redact)
    }

    fn push_table(&self, out: &mut Outcome) {
        out.broadcast(ServerEvent::TableUpdated {
            cards: self.table_view(),
        });
    }

    fn hand_event(&self, id: &ParticipantId) -> ServerEvent {
        let cards = self
            .state
            .registry
            .get(id)
            .map(|p| p.own_hand())
            .unwrap_or_default();
        ServerEvent::YourHand { cards }
    }

    /// Private role notice. Wolves also learn who the other wolves are.
    fn role_event(&self, id: &ParticipantId) -> Option<ServerEvent> {
        let role = self.state.registry.get(id)?.role?;
        let fellow_wolves = match role {
            Role::Wolf => self
                .state
                .registry
                .wolves()
                .into_iter()
                .filter(|w| w != id)
                .collect(),
            Role::Villager => Vec::new(),
        };
        Some(ServerEvent::RoleAssigned {
            role,
            fellow_wolves,
        })
    }

    fn role_reveals(&self) -> Vec<RoleReveal> {
        self.state
            .registry
            .iter()
            .filter_map(|p| {
                p.role.map(|role| RoleReveal {
                    participant: p.id.clone(),
                    name: p.name.clone(),
                    role,
                })
            })
            .collect()
    }

    fn voting_opened_event(&self, voting: &VotingState) -> ServerEvent {
        ServerEvent::VotingOpened {
            round: voting.round(),
            candidates: voting.candidates().to_vec(),
            voters: voting.eligible_voters(&self.state.registry),
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

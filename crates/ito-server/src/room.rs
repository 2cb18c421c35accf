//! Room actor: the single task that owns the session.
//!
//! Connection handlers talk to it through an mpsc channel; it processes
//! one command at a time to completion, so the session never needs a
//! lock. Deferred continuations (ballot pauses, the empty-room wipe) sit
//! in a [`DeferredQueue`] polled from the same `select!` loop.
//!
//! The actor also owns the connection → identity bindings. A connection
//! is anonymous until it sends `Login`; from then on every action it
//! sends acts as that identity, whatever the payload claims.

use std::collections::BTreeMap;

use ito_protocol::{ClientAction, ParticipantId, Recipient, ServerEvent, Status};
use ito_session::{Continuation, Outcome, Session, TimerSlot};
use ito_timer::DeferredQueue;
use ito_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::ServerError;

/// Bound on queued commands before handlers wait.
pub const ROOM_CHANNEL_SIZE: usize = 256;

/// Channel delivering events to one connection's handler.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Commands sent to the room actor.
pub(crate) enum RoomCommand {
    /// A connection was accepted.
    Connect {
        conn_id: ConnectionId,
        sender: EventSender,
    },

    /// A decoded, validated action from a connection.
    Action {
        conn_id: ConnectionId,
        action: ClientAction,
    },

    /// A connection closed.
    Disconnect { conn_id: ConnectionId },

    /// Request a summary of the room.
    Snapshot { reply: oneshot::Sender<RoomSnapshot> },
}

/// Summary of the room, for health checks and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub status: Status,
    pub epoch: u64,
    /// Open connections, logged in or not.
    pub connections: usize,
    /// Registered participants, online or not.
    pub participants: usize,
    pub online: usize,
    /// Timer slots with a pending continuation.
    pub pending: Vec<TimerSlot>,
}

/// Handle to the running room actor. Cheap to clone.
#[derive(Clone)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Registers a new connection and the channel its events go to.
    pub async fn connect(
        &self,
        conn_id: ConnectionId,
        sender: EventSender,
    ) -> Result<(), ServerError> {
        self.send(RoomCommand::Connect { conn_id, sender }).await
    }

    /// Forwards an action (fire-and-forget; replies arrive as events).
    pub async fn action(
        &self,
        conn_id: ConnectionId,
        action: ClientAction,
    ) -> Result<(), ServerError> {
        self.send(RoomCommand::Action { conn_id, action }).await
    }

    pub async fn disconnect(&self, conn_id: ConnectionId) -> Result<(), ServerError> {
        self.send(RoomCommand::Disconnect { conn_id }).await
    }

    /// Waits for the actor to process everything queued so far, then
    /// returns a summary.
    pub async fn snapshot(&self) -> Result<RoomSnapshot, ServerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Snapshot { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| ServerError::RoomUnavailable)
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), ServerError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| ServerError::RoomUnavailable)
    }
}

/// One open connection.
struct Binding {
    sender: EventSender,
    participant: Option<ParticipantId>,
}

struct RoomActor {
    session: Session,
    timers: DeferredQueue<TimerSlot, Continuation>,
    /// Ordered so delivery order is stable across connections.
    connections: BTreeMap<ConnectionId, Binding>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        info!("room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                (slot, continuation) = self.timers.wait_next() => {
                    debug!(?slot, "continuation due");
                    let outcome = self.session.resume(continuation);
                    self.dispatch(outcome);
                }
            }
        }

        info!("room actor stopped");
    }

    fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Connect { conn_id, sender } => {
                self.connections.insert(
                    conn_id,
                    Binding {
                        sender,
                        participant: None,
                    },
                );
                debug!(%conn_id, connections = self.connections.len(), "connection opened");
                let outcome = self.session.connection_opened();
                self.dispatch(outcome);
            }
            RoomCommand::Action { conn_id, action } => {
                self.handle_action(conn_id, action);
            }
            RoomCommand::Disconnect { conn_id } => {
                self.handle_disconnect(conn_id);
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn handle_action(&mut self, conn_id: ConnectionId, action: ClientAction) {
        let action_name = action.name();
        let Some(bound) = self.connections.get(&conn_id).map(|b| b.participant.clone())
        else {
            debug!(%conn_id, action = action_name, "action from unknown connection");
            return;
        };

        let actor = match (&action, bound) {
            (ClientAction::Login { participant, .. }, _) => {
                self.bind(conn_id, participant);
                participant.clone()
            }
            (_, Some(participant)) => participant,
            (_, None) => {
                debug!(%conn_id, action = action_name, "action before login");
                self.send_to_conn(
                    conn_id,
                    ServerEvent::Rejected {
                        action: action_name.to_string(),
                        reason: "login required".to_string(),
                    },
                );
                return;
            }
        };

        match self.session.apply(&actor, action) {
            Ok(outcome) => self.dispatch(outcome),
            Err(err) => self.send_to_conn(conn_id, err.to_event(action_name)),
        }
    }

    fn handle_disconnect(&mut self, conn_id: ConnectionId) {
        let Some(binding) = self.connections.remove(&conn_id) else {
            return;
        };
        debug!(%conn_id, connections = self.connections.len(), "connection closed");

        if let Some(participant) = binding.participant {
            self.release_identity(&participant);
        }
        if self.connections.is_empty() {
            let outcome = self.session.room_emptied();
            self.dispatch(outcome);
        }
    }

    /// Binds `conn_id` to `participant`. A connection may log in again
    /// as someone else; the old identity is released.
    fn bind(&mut self, conn_id: ConnectionId, participant: &ParticipantId) {
        let previous = self
            .connections
            .get_mut(&conn_id)
            .and_then(|b| b.participant.replace(participant.clone()));
        if let Some(previous) = previous.filter(|p| p != participant) {
            debug!(%conn_id, from = %previous, to = %participant, "connection rebound");
            self.release_identity(&previous);
        }
    }

    /// Marks `participant` offline once no connection is bound to it.
    fn release_identity(&mut self, participant: &ParticipantId) {
        if self.is_bound(participant) {
            return;
        }
        match self.session.disconnect(participant) {
            Ok(outcome) => self.dispatch(outcome),
            // Gone already: the session was reset while it was bound.
            Err(err) => debug!(%participant, error = %err, "release skipped"),
        }
    }

    fn is_bound(&self, participant: &ParticipantId) -> bool {
        self.connections
            .values()
            .any(|b| b.participant.as_ref() == Some(participant))
    }

    /// Applies an outcome: timers first, then events in order.
    fn dispatch(&mut self, outcome: Outcome) {
        for slot in &outcome.cancelled {
            if self.timers.cancel(slot).is_some() {
                debug!(?slot, "continuation cancelled");
            }
        }
        for deferred in outcome.deferred {
            let continuation = deferred.continuation;
            self.timers
                .schedule(continuation.slot(), deferred.delay, continuation);
        }

        let mut reset = false;
        for (recipient, event) in outcome.events {
            reset |= event == ServerEvent::ForceReset;
            match recipient {
                Recipient::All => {
                    for binding in self.connections.values() {
                        if binding.participant.is_some() {
                            let _ = binding.sender.send(event.clone());
                        }
                    }
                }
                Recipient::Participant(id) => {
                    for binding in self.connections.values() {
                        if binding.participant.as_ref() == Some(&id) {
                            let _ = binding.sender.send(event.clone());
                        }
                    }
                }
            }
        }

        // Every identity is gone after a reset; clients log in again.
        if reset {
            for binding in self.connections.values_mut() {
                binding.participant = None;
            }
        }
    }

    /// Sends straight to one connection. Silently drops if its handler
    /// is gone.
    fn send_to_conn(&self, conn_id: ConnectionId, event: ServerEvent) {
        if let Some(binding) = self.connections.get(&conn_id) {
            let _ = binding.sender.send(event);
        }
    }

    fn snapshot(&self) -> RoomSnapshot {
        let registry = self.session.registry();
        RoomSnapshot {
            status: self.session.status(),
            epoch: self.session.epoch(),
            connections: self.connections.len(),
            participants: registry.len(),
            online: registry.iter().filter(|p| p.online).count(),
            pending: [TimerSlot::Voting, TimerSlot::Wipe]
                .into_iter()
                .filter(|slot| self.timers.is_pending(slot))
                .collect(),
        }
    }
}

/// Spawns the room actor for `session` and returns its handle.
pub fn spawn_room(session: Session, channel_size: usize) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let actor = RoomActor {
        session,
        timers: DeferredQueue::new(),
        connections: BTreeMap::new(),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle { sender: tx }
}

//! Cancellable keyed deadlines for a room actor's event loop.
//!
//! A [`DeferredQueue`] holds at most one pending payload per key. The
//! room schedules a continuation (open the next ballot, wipe an empty
//! room) under a slot key; scheduling the same slot again replaces the
//! earlier deadline and cancelling removes it.
//!
//! # Idle mode
//!
//! When nothing is scheduled, [`DeferredQueue::wait_next`] pends forever,
//! so the queue can sit in a `tokio::select!` loop next to the command
//! channel at no cost:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         (slot, continuation) = timers.wait_next() => {
//!             let outcome = session.resume(continuation);
//!         }
//!     }
//! }
//! ```
//!
//! `wait_next` is cancel-safe: nothing is removed until the deadline has
//! passed, so dropping the future (another `select!` branch won) loses
//! nothing.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace};

/// One pending continuation.
#[derive(Debug)]
struct Entry<T> {
    deadline: Instant,
    /// Insertion counter; breaks ties between equal deadlines.
    order: u64,
    payload: T,
}

/// Keyed, cancellable deadlines. One payload per key.
#[derive(Debug)]
pub struct DeferredQueue<K, T> {
    entries: HashMap<K, Entry<T>>,
    next_order: u64,
}

impl<K, T> Default for DeferredQueue<K, T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            next_order: 0,
        }
    }
}

impl<K, T> DeferredQueue<K, T>
where
    K: Eq + Hash + Clone + Debug,
{
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `payload` to fire after `delay` under `key`.
    ///
    /// Returns the payload it replaced, if the key was already pending.
    pub fn schedule(&mut self, key: K, delay: Duration, payload: T) -> Option<T> {
        let deadline = Instant::now() + delay;
        let order = self.next_order;
        self.next_order += 1;
        debug!(?key, delay_ms = delay.as_millis() as u64, "deferred scheduled");
        self.entries
            .insert(
                key,
                Entry {
                    deadline,
                    order,
                    payload,
                },
            )
            .map(|old| old.payload)
    }

    /// Removes the pending payload under `key`, if any.
    pub fn cancel(&mut self, key: &K) -> Option<T> {
        let removed = self.entries.remove(key).map(|e| e.payload);
        if removed.is_some() {
            debug!(?key, "deferred cancelled");
        }
        removed
    }

    /// Drops everything pending.
    pub fn cancel_all(&mut self) {
        if !self.entries.is_empty() {
            debug!(count = self.entries.len(), "all deferred cancelled");
        }
        self.entries.clear();
    }

    /// Whether `key` has a pending deadline.
    pub fn is_pending(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Time left until `key` fires.
    pub fn remaining(&self, key: &K) -> Option<Duration> {
        self.entries
            .get(key)
            .map(|e| e.deadline.saturating_duration_since(Instant::now()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Waits for the earliest deadline and removes its entry.
    ///
    /// Pends forever while the queue is empty.
    pub async fn wait_next(&mut self) -> (K, T) {
        let Some((key, deadline)) = self.earliest() else {
            std::future::pending::<()>().await;
            unreachable!()
        };

        time::sleep_until(deadline).await;

        // `&mut self` is held across the sleep, so the entry is still here.
        match self.entries.remove(&key) {
            Some(entry) => {
                trace!(?key, "deferred fired");
                (key, entry.payload)
            }
            None => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    fn earliest(&self) -> Option<(K, Instant)> {
        self.entries
            .iter()
            .min_by_key(|(_, e)| (e.deadline, e.order))
            .map(|(k, e)| (k.clone(), e.deadline))
    }
}

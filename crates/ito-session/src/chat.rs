//! Bounded, time-limited chat log.

use std::collections::VecDeque;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ito_protocol::ChatMessage;

#[derive(Debug)]
pub struct ChatLog {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
    retention: Duration,
}

impl ChatLog {
    pub fn new(capacity: usize, retention: Duration) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
            retention,
        }
    }

    /// Appends a message, then drops expired and overflowing ones.
    pub fn push(&mut self, message: ChatMessage, now_ms: u64) {
        self.messages.push_back(message);
        self.prune(now_ms);
    }

    /// Drops messages older than the retention window and trims the
    /// oldest beyond capacity.
    pub fn prune(&mut self, now_ms: u64) {
        let retention_ms = u64::try_from(self.retention.as_millis()).unwrap_or(u64::MAX);
        let cutoff = now_ms.saturating_sub(retention_ms);
        self.messages.retain(|m| m.timestamp > cutoff);
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
    }

    /// Pruned copy of the log, oldest first.
    pub fn history(&mut self, now_ms: u64) -> Vec<ChatMessage> {
        self.prune(now_ms);
        self.messages.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Wall-clock unix time in milliseconds.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

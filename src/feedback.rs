//! Transient status messages.
//!
//! Messages queue in arrival order with no coalescing or priority. The host
//! shows the front message; it leaves the queue when its display time runs out
//! or when the user dismisses it. The display clock for a message starts the
//! first time [`FeedbackChannel::expire`] sees it at the front.

#[cfg(test)]
#[path = "feedback_test.rs"]
mod feedback_test;

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackMessage {
    pub id: u64,
    pub kind: FeedbackKind,
    pub text: String,
    pub duration_ms: u64,
}

#[derive(Debug, Default)]
pub struct FeedbackChannel {
    queue: VecDeque<FeedbackMessage>,
    next_id: u64,
    /// When the front message was first shown.
    shown_since: Option<Instant>,
}

impl FeedbackChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a message and return its id.
    pub fn push(&mut self, kind: FeedbackKind, text: impl Into<String>, duration_ms: u64) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.queue.push_back(FeedbackMessage { id, kind, text: text.into(), duration_ms });
        id
    }

    /// Every queued message, front first.
    pub fn messages(&self) -> impl Iterator<Item = &FeedbackMessage> {
        self.queue.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Dismiss the on-screen message.
    pub fn dismiss(&mut self) -> Option<FeedbackMessage> {
        self.shown_since = None;
        self.queue.pop_front()
    }

    /// Drop the front message if its display time has elapsed at `now`.
    ///
    /// Returns the expired message. A message seen for the first time starts
    /// its display clock at `now`.
    pub fn expire(&mut self, now: Instant) -> Option<FeedbackMessage> {
        let front = self.queue.front()?;
        let Some(since) = self.shown_since else {
            self.shown_since = Some(now);
            return None;
        };
        if now.saturating_duration_since(since) < Duration::from_millis(front.duration_ms) {
            return None;
        }
        let expired = self.queue.pop_front();
        self.shown_since = if self.queue.is_empty() { None } else { Some(now) };
        expired
    }
}

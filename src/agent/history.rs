//! Conversation history bounds.

use std::ops::{Deref, DerefMut};

use crate::message::{Message, Role};

/// Shrinks `history` to at most `cap` messages.
///
/// A leading system message is pinned and counts toward the cap. The rest
/// is cut from the front in whole turns: the cut moves forward to the next
/// user message, so the kept window never opens on an assistant reply or
/// on tool results cut off from the request that produced them.
pub fn prune(history: &mut Vec<Message>, cap: usize) {
    if history.len() <= cap {
        return;
    }
    let pinned = usize::from(history.first().is_some_and(|m| m.role == Role::System));
    let keep = cap.saturating_sub(pinned);
    let mut start = history.len() - keep;
    while start < history.len() && history[start].role != Role::User {
        start += 1;
    }
    history.drain(pinned..start);
}

/// Mutable access to the history for the duration of one turn.
///
/// When retention is off, dropping the guard truncates the history back to
/// its length at turn start. This runs on every exit path, including when
/// the turn future is dropped mid-await.
pub struct TurnGuard<'a> {
    history: &'a mut Vec<Message>,
    start: usize,
    retain: bool,
}

impl<'a> TurnGuard<'a> {
    pub fn new(history: &'a mut Vec<Message>, retain: bool) -> Self {
        let start = history.len();
        Self {
            history,
            start,
            retain,
        }
    }
}

impl Deref for TurnGuard<'_> {
    type Target = Vec<Message>;

    fn deref(&self) -> &Self::Target {
        self.history
    }
}

impl DerefMut for TurnGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.history
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if !self.retain {
            self.history.truncate(self.start);
        }
    }
}

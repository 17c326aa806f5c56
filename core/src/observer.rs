//! History change notifications.
//!
//! Observers are plain callbacks owned by the history. A
//! [`NotificationPause`] suppresses delivery for as long as it is alive; it
//! resumes on drop, so every exit path of a batch operation (early return,
//! `?`, unwinding) re-enables notifications.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::history::SequenceId;

/// What changed in a history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryEvent {
    /// A command was executed. `merged` is `true` when it coalesced into the
    /// existing entry `id` instead of appending one.
    Executed { id: SequenceId, merged: bool },
    Undone { id: SequenceId },
    Redone { id: SequenceId },
    Cleared,
    /// A multi-step jump begins. Per-step events are suppressed until
    /// the matching [`Navigated`](Self::Navigated).
    NavigationStarted { from: SequenceId, to: SequenceId },
    Navigated { current: SequenceId },
}

/// Handle returned by [`CommandHistory::subscribe`](crate::history::CommandHistory::subscribe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Callback = Box<dyn FnMut(&HistoryEvent) + Send>;

/// Scoped suppression of history notifications.
///
/// Pauses nest: delivery resumes once the last live pause is dropped.
#[must_use = "notifications resume as soon as the pause is dropped"]
pub struct NotificationPause {
    depth: Arc<AtomicUsize>,
}

impl Drop for NotificationPause {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::AcqRel);
    }
}

impl fmt::Debug for NotificationPause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationPause")
            .field("depth", &self.depth.load(Ordering::Acquire))
            .finish()
    }
}

/// The observer list of one history.
#[derive(Default)]
pub(crate) struct Observers {
    callbacks: Vec<(ObserverId, Callback)>,
    next_id: u64,
    paused: Arc<AtomicUsize>,
}

impl Observers {
    pub(crate) fn subscribe(&mut self, callback: Callback) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, callback));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(existing, _)| *existing != id);
        self.callbacks.len() != before
    }

    pub(crate) fn pause(&self) -> NotificationPause {
        self.paused.fetch_add(1, Ordering::AcqRel);
        NotificationPause {
            depth: Arc::clone(&self.paused),
        }
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire) > 0
    }

    /// Delivers `event` to every observer in subscription order, unless paused.
    pub(crate) fn emit(&mut self, event: HistoryEvent) {
        if self.is_paused() {
            log::trace!("Suppressed {event:?}");
            return;
        }
        for (_, callback) in &mut self.callbacks {
            callback(&event);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.callbacks.len())
            .field("paused", &self.is_paused())
            .finish()
    }
}

//! Coalescing policy.
//!
//! Decides whether a newly submitted command merges into the most recent
//! history entry instead of becoming an entry of its own. Without it, every
//! tick of a slider drag and every keystroke would be a separate undo step.

use std::time::Duration;

use crate::command::{Command, Editable};
use crate::config::HistoryConfig;

/// Default time window for coalescing continuous gestures.
pub const DEFAULT_MERGE_WINDOW: Duration = Duration::from_millis(500);

/// Why a command was coalesced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeReason {
    /// The command kind always merges into a matching entry.
    KindOverride,
    /// The command arrived within the merge window.
    WithinWindow,
}

/// Rules for merging a new command into the previous history entry.
///
/// A merge requires both commands to be mergeable with equal
/// [`MergeKey`](crate::command::MergeKey)s. Kinds that
/// [ignore the merge window](crate::command::CommandKind::ignores_merge_window)
/// then always merge; every other kind must also arrive less than
/// [`window`](Self::window) after the previous execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoalescePolicy {
    window: Duration,
    enabled: bool,
}

impl CoalescePolicy {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            enabled: true,
        }
    }

    /// A policy that never merges.
    pub fn disabled() -> Self {
        Self {
            window: Duration::ZERO,
            enabled: false,
        }
    }

    pub fn from_config(config: &HistoryConfig) -> Self {
        if config.coalescing {
            Self::new(config.merge_window())
        } else {
            Self::disabled()
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Decides whether `command` merges into `last`.
    ///
    /// `elapsed` is the time since the previous execution, or `None` if
    /// nothing has been executed yet.
    pub fn evaluate<T: Editable>(
        &self,
        last: &dyn Command<T>,
        command: &dyn Command<T>,
        elapsed: Option<Duration>,
    ) -> Option<MergeReason> {
        if !self.enabled || !last.is_mergeable() || !command.is_mergeable() {
            return None;
        }
        let key = command.merge_key()?;
        if last.merge_key()? != key {
            return None;
        }
        if key.kind.ignores_merge_window() {
            return Some(MergeReason::KindOverride);
        }
        match elapsed {
            Some(elapsed) if elapsed < self.window => Some(MergeReason::WithinWindow),
            _ => None,
        }
    }
}

impl Default for CoalescePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MERGE_WINDOW)
    }
}

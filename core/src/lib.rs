//! # Retrace Core
//!
//! Undo/redo command engine for interactive editors.
//!
//! - [`Command`]: a reversible edit submitted by the editor (Command pattern)
//! - [`CommandHistory`]: past/future stacks with execute, undo, redo, clear
//! - [`CoalescePolicy`]: merges continuous gestures into one history entry
//! - [`NavigationPlan`]: jumps to any entry via [`CommandHistory::go_to_state`]
//! - [`SimulationFlag`]: locks undo/redo while a live simulation runs
//! - [`Document`]: an editable target bundled with its history
//!
//! The engine never performs domain mutations itself; every change goes
//! through a command's own `execute`/`undo`.
//!
//! # Coalescing
//!
//! A command that is [mergeable](Command::is_mergeable) and carries the same
//! [`MergeKey`] as the most recent entry is absorbed by that entry instead of
//! becoming a new one. Attribute and text edits always merge; other kinds only
//! within the merge window (500 ms by default, see [`HistoryConfig`]).

pub mod clock;
pub mod coalesce;
pub mod command;
pub mod config;
pub mod document;
pub mod gate;
pub mod history;
pub mod navigator;
pub mod observer;
pub mod property;
pub mod queue;

pub use clock::{Clock, ManualClock, SystemClock};
pub use coalesce::{CoalescePolicy, DEFAULT_MERGE_WINDOW, MergeReason};
pub use command::{
    AsAny, AssetId, Command, CommandError, CommandKind, CommandResult, Editable, MergeKey,
    TargetId,
};
pub use config::{ConfigError, HistoryConfig};
pub use document::Document;
pub use gate::{
    BlockedOperation, LogNotifier, Notifier, SimulationFlag, SimulationState,
    SimulationStateSource,
};
pub use history::{
    CommandHistory, Execution, HistoryEntry, HistoryError, HistoryResult, SequenceId,
};
pub use navigator::NavigationPlan;
pub use observer::{HistoryEvent, NotificationPause, ObserverId};
pub use property::SetProperty;
pub use queue::{CommandQueue, FlushReport, QueuedOutcome};

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

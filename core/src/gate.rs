//! Simulation lock for history navigation.
//!
//! While a live simulation or preview is running, rewriting the document's
//! history would fight with the simulation's own changes. The history asks a
//! [`SimulationStateSource`] before every undo, redo or state jump, and
//! reports refusals to the user through a [`Notifier`].
//!
//! Submitting new commands is not gated.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// External notification that a simulation started or stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    Started,
    Stopped,
}

/// Answers whether a simulation is currently running.
pub trait SimulationStateSource: Send + Sync {
    fn is_running(&self) -> bool;
}

/// Shared simulation flag.
///
/// Cloning a flag creates another handle to the same state. The play controls
/// keep one handle and forward their state changes through
/// [`on_simulation_state_changed`](Self::on_simulation_state_changed); each
/// document's history holds another.
#[derive(Clone, Default)]
pub struct SimulationFlag {
    running: Arc<AtomicBool>,
}

impl SimulationFlag {
    /// Creates a flag with no simulation running.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a simulation state notification.
    pub fn on_simulation_state_changed(&self, state: SimulationState) {
        let running = state == SimulationState::Started;
        if self.running.swap(running, Ordering::AcqRel) != running {
            log::info!(
                "History {} ({state:?})",
                if running { "locked" } else { "unlocked" }
            );
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl SimulationStateSource for SimulationFlag {
    fn is_running(&self) -> bool {
        SimulationFlag::is_running(self)
    }
}

impl fmt::Debug for SimulationFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationFlag")
            .field("running", &self.is_running())
            .finish()
    }
}

/// A history operation refused while the simulation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockedOperation {
    Undo,
    Redo,
    GoToState,
}

impl fmt::Display for BlockedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undo => f.write_str("undo"),
            Self::Redo => f.write_str("redo"),
            Self::GoToState => f.write_str("history navigation"),
        }
    }
}

/// Surfaces user-visible notices about refused history operations.
///
/// An editor shell typically implements this with a modal or a toast.
pub trait Notifier: Send + Sync {
    fn history_locked(&self, operation: BlockedOperation);
}

/// Writes the notice to the log at `warn` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn history_locked(&self, operation: BlockedOperation) {
        log::warn!("{operation} is disabled while the simulation is running");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_flag_is_idle() {
        assert!(!SimulationFlag::new().is_running());
    }

    #[test]
    fn state_changes_toggle_flag() {
        let flag = SimulationFlag::new();
        flag.on_simulation_state_changed(SimulationState::Started);
        assert!(flag.is_running());
        flag.on_simulation_state_changed(SimulationState::Stopped);
        assert!(!flag.is_running());
    }

    #[test]
    fn clones_share_state() {
        let flag = SimulationFlag::new();
        let source: Arc<dyn SimulationStateSource> = Arc::new(flag.clone());
        flag.on_simulation_state_changed(SimulationState::Started);
        assert!(source.is_running());
    }

    #[test]
    fn repeated_notifications_are_idempotent() {
        let flag = SimulationFlag::new();
        flag.on_simulation_state_changed(SimulationState::Started);
        flag.on_simulation_state_changed(SimulationState::Started);
        assert!(flag.is_running());
        flag.on_simulation_state_changed(SimulationState::Stopped);
        flag.on_simulation_state_changed(SimulationState::Stopped);
        assert!(!flag.is_running());
    }

    #[test]
    fn blocked_operation_display() {
        assert_eq!(BlockedOperation::Undo.to_string(), "undo");
        assert_eq!(BlockedOperation::Redo.to_string(), "redo");
        assert_eq!(BlockedOperation::GoToState.to_string(), "history navigation");
    }

    #[test]
    fn debug_impl() {
        let debug = format!("{:?}", SimulationFlag::new());
        assert!(debug.contains("SimulationFlag"));
        assert!(debug.contains("running"));
    }
}

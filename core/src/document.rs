//! An editable target bundled with its history.

use crate::command::{Command, Editable};
use crate::history::{CommandHistory, Execution, HistoryResult, SequenceId};
use crate::queue::{CommandQueue, FlushReport};

/// One open document: the edited value and the history that owns every
/// change made to it.
///
/// Each document has its own independent history; nothing is shared between
/// documents. The target is only reachable mutably through commands, so the
/// history always reflects the document's state.
#[derive(Debug)]
pub struct Document<T: Editable> {
    target: T,
    history: CommandHistory<T>,
}

impl<T: Editable> Document<T> {
    pub fn new(target: T) -> Self {
        Self::with_history(target, CommandHistory::new())
    }

    /// Wraps `target` with a pre-configured history.
    pub fn with_history(target: T, history: CommandHistory<T>) -> Self {
        Self { target, history }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn history(&self) -> &CommandHistory<T> {
        &self.history
    }

    /// Mutable history access for configuration such as observers or save
    /// points.
    pub fn history_mut(&mut self) -> &mut CommandHistory<T> {
        &mut self.history
    }

    pub fn execute(&mut self, command: impl Command<T>) -> HistoryResult<Execution> {
        self.history.execute(Box::new(command), &mut self.target)
    }

    pub fn execute_boxed(&mut self, command: Box<dyn Command<T>>) -> HistoryResult<Execution> {
        self.history.execute(command, &mut self.target)
    }

    pub fn undo(&mut self) -> HistoryResult<Option<&dyn Command<T>>> {
        self.history.undo(&mut self.target)
    }

    pub fn redo(&mut self) -> HistoryResult<Option<&dyn Command<T>>> {
        self.history.redo(&mut self.target)
    }

    pub fn go_to_state(&mut self, id: SequenceId) -> HistoryResult<SequenceId> {
        self.history.go_to_state(id, &mut self.target)
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Executes every queued command against this document, oldest first.
    pub fn flush(&mut self, queue: &CommandQueue<T>) -> FlushReport {
        queue.flush_into(&mut self.history, &mut self.target)
    }

    pub fn into_parts(self) -> (T, CommandHistory<T>) {
        (self.target, self.history)
    }
}

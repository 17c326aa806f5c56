//! Deferred command submission.
//!
//! Inspector panels, asset importers and script callbacks usually hold only
//! shared references. They submit edits to a [`CommandQueue`], and the thread
//! that owns the document replays them into its history with
//! [`CommandQueue::flush_into`], which reports what became of each one.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;

use crate::command::{Command, Editable};
use crate::history::{CommandHistory, Execution, HistoryResult};

/// Outcome of one queued command.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedOutcome {
    /// Description of the command at submission time.
    pub description: String,
    pub result: HistoryResult<Execution>,
}

/// Everything a [`CommandQueue::flush_into`] call did, in submission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushReport {
    outcomes: Vec<QueuedOutcome>,
}

impl FlushReport {
    pub fn outcomes(&self) -> &[QueuedOutcome] {
        &self.outcomes
    }

    /// Commands that were appended or merged.
    pub fn accepted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, Ok(Execution::Appended(_) | Execution::Merged(_))))
            .count()
    }

    pub fn rejected(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.result == Ok(Execution::Rejected))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &QueuedOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Commands waiting to be executed against a document.
///
/// Submission only needs `&self`, so a queue can be shared behind an `Arc`
/// across threads. Execution always happens on the caller of
/// [`flush_into`](Self::flush_into).
///
/// ```ignore
/// // From a panel:
/// queue.submit(Box::new(SetColor { .. }));
///
/// // Once per frame, where the document lives:
/// let report = queue.flush_into(&mut history, &mut scene);
/// ```
pub struct CommandQueue<T: Editable> {
    pending: Mutex<VecDeque<Box<dyn Command<T>>>>,
}

impl<T: Editable> CommandQueue<T> {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
        }
    }

    pub fn submit(&self, command: Box<dyn Command<T>>) {
        self.pending.lock().push_back(command);
    }

    /// Number of commands waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Executes every pending command through `history`, oldest first.
    ///
    /// A failing command does not stop the flush. The lock is released before
    /// the first command runs, so commands submitted while flushing wait for
    /// the next call.
    pub fn flush_into(&self, history: &mut CommandHistory<T>, target: &mut T) -> FlushReport {
        let batch = std::mem::take(&mut *self.pending.lock());
        if batch.is_empty() {
            return FlushReport::default();
        }

        let outcomes: Vec<_> = batch
            .into_iter()
            .map(|command| {
                let description = command.description().to_owned();
                let result = history.execute(command, target);
                if let Err(e) = &result {
                    log::warn!("Queued command {description:?} failed: {e}");
                }
                QueuedOutcome {
                    description,
                    result,
                }
            })
            .collect();

        let report = FlushReport { outcomes };
        log::debug!(
            "Flushed {} queued commands ({} accepted, {} rejected)",
            report.outcomes.len(),
            report.accepted(),
            report.rejected()
        );
        report
    }

    /// Drops every pending command without running it, handing each back
    /// through [`Command::on_rejected`]. Returns how many were dropped.
    pub fn cancel_all(&self) -> usize {
        let batch = std::mem::take(&mut *self.pending.lock());
        let count = batch.len();
        for mut command in batch {
            command.on_rejected();
        }
        count
    }
}

impl<T: Editable> Default for CommandQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Editable> fmt::Debug for CommandQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandQueue")
            .field("pending", &self.pending())
            .finish()
    }
}

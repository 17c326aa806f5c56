//! Undo/redo command history.
//!
//! [`CommandHistory`] manages the linear past/future stacks of one document.
//! Executing a command clears the future (redo) stack; matching commands
//! coalesce into the most recent entry according to the [`CoalescePolicy`].

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::clock::{Clock, SystemClock};
use crate::coalesce::{CoalescePolicy, MergeReason};
use crate::command::{Command, CommandError, CommandResult, Editable};
use crate::config::HistoryConfig;
use crate::gate::{BlockedOperation, LogNotifier, Notifier, SimulationFlag, SimulationStateSource};
use crate::navigator::NavigationPlan;
use crate::observer::{HistoryEvent, NotificationPause, ObserverId, Observers};

/// Stable position identifier of a history entry.
///
/// Assigned on append as the 1-based length of the past stack, and kept by
/// the entry through any number of undos and redos. [`SequenceId::INITIAL`]
/// denotes the empty state before the first entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SequenceId(u64);

impl SequenceId {
    pub const INITIAL: Self = Self(0);

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of [`CommandHistory::execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// The command became a new entry.
    Appended(SequenceId),
    /// The command coalesced into the existing entry.
    Merged(SequenceId),
    /// The command reported itself invalid and was handed back through
    /// [`Command::on_rejected`]. Nothing changed.
    Rejected,
}

impl Execution {
    /// The entry that now holds the command's effect, if any.
    pub fn id(&self) -> Option<SequenceId> {
        match self {
            Self::Appended(id) | Self::Merged(id) => Some(*id),
            Self::Rejected => None,
        }
    }
}

/// Error type for history operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// The operation was refused because a simulation is running. The user
    /// has already been notified.
    #[error("{0} is disabled while the simulation is running")]
    Locked(BlockedOperation),
    /// A command's effect failed.
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Result type for history operations.
pub type HistoryResult<T = ()> = Result<T, HistoryError>;

/// A command owned by the history, with its identifier.
pub struct HistoryEntry<T: Editable> {
    id: SequenceId,
    applied_at: Instant,
    command: Box<dyn Command<T>>,
}

impl<T: Editable> HistoryEntry<T> {
    pub fn id(&self) -> SequenceId {
        self.id
    }

    /// When the entry was last executed or absorbed a merge.
    pub fn applied_at(&self) -> Instant {
        self.applied_at
    }

    pub fn command(&self) -> &dyn Command<T> {
        self.command.as_ref()
    }

    pub fn description(&self) -> &str {
        self.command.description()
    }

    fn dispose(mut self) {
        self.command.dispose();
    }
}

impl<T: Editable> fmt::Debug for HistoryEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryEntry")
            .field("id", &self.id)
            .field("command", &self.command)
            .finish()
    }
}

/// Manages the undo/redo stacks of one document.
///
/// The past stack holds executed entries, oldest first, with strictly
/// increasing identifiers. The future stack holds undone entries, the next
/// one to redo on top. An accepted command lives in exactly one of the two
/// until it is disposed by [`clear`](Self::clear) or by an
/// [`execute`](Self::execute) that discards the future.
///
/// Undo, redo and [`go_to_state`](Self::go_to_state) are refused while the
/// injected [`SimulationStateSource`] reports a running simulation. Executing
/// new commands is still allowed.
///
/// # Example
///
/// ```ignore
/// let mut history = CommandHistory::new();
/// let mut scene = Scene::new();
///
/// history.execute(Box::new(set_color), &mut scene)?;
/// history.undo(&mut scene)?;
/// history.redo(&mut scene)?;
/// history.go_to_state(SequenceId::INITIAL, &mut scene)?;
/// ```
pub struct CommandHistory<T: Editable> {
    past: Vec<HistoryEntry<T>>,
    future: Vec<HistoryEntry<T>>,
    policy: CoalescePolicy,
    clock: Arc<dyn Clock>,
    simulation: Arc<dyn SimulationStateSource>,
    notifier: Arc<dyn Notifier>,
    observers: Observers,
    last_execution: Option<Instant>,
    /// Tracks distance from the saved state.
    ///
    /// - `Some(0)`: the current state matches the last save.
    /// - `Some(n)` where `n > 0`: `n` undos needed to reach the saved state.
    /// - `Some(n)` where `n < 0`: `|n|` redos needed to reach the saved state.
    /// - `None`: the save point is permanently unreachable (a merge changed
    ///   the saved entry, or the redo branch holding it was discarded).
    save_distance: Option<i64>,
    /// Set for the duration of every mutating operation. Still set on entry
    /// only if a previous operation unwound halfway through.
    in_operation: bool,
}

impl<T: Editable> CommandHistory<T> {
    /// Creates an empty history with the default merge window, the system
    /// clock, no simulation, and notices written to the log.
    pub fn new() -> Self {
        Self {
            past: Vec::new(),
            future: Vec::new(),
            policy: CoalescePolicy::default(),
            clock: Arc::new(SystemClock),
            simulation: Arc::new(SimulationFlag::new()),
            notifier: Arc::new(LogNotifier),
            observers: Observers::default(),
            last_execution: None,
            save_distance: Some(0),
            in_operation: false,
        }
    }

    /// Creates an empty history configured by `config`.
    pub fn from_config(config: &HistoryConfig) -> Self {
        Self::new().with_policy(CoalescePolicy::from_config(config))
    }

    pub fn with_policy(mut self, policy: CoalescePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Sets the simulation state the undo/redo gate consults.
    pub fn with_simulation(mut self, simulation: impl SimulationStateSource + 'static) -> Self {
        self.simulation = Arc::new(simulation);
        self
    }

    /// Sets where notices about refused operations go.
    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    /// Executes a command and records it.
    ///
    /// - An invalid command is rejected through [`Command::on_rejected`];
    ///   nothing else happens.
    /// - A command that [coalesces](CoalescePolicy) with the top entry is
    ///   absorbed by it via [`Command::update`] and then disposed, and the
    ///   top entry is executed again. No identifier is allocated.
    /// - Otherwise the command is executed and appended with identifier
    ///   `len(past) + 1`.
    ///
    /// After either success the future stack is discarded, disposing every
    /// entry in it. If a new command fails to execute it is disposed and
    /// the history is unchanged. If the merged top entry fails to execute
    /// it keeps the absorbed value and the future stack is left intact.
    pub fn execute(
        &mut self,
        command: Box<dyn Command<T>>,
        target: &mut T,
    ) -> HistoryResult<Execution> {
        self.enter("execute");
        let result = self.execute_inner(command, target);
        self.leave();

        let execution = result?;
        match execution {
            Execution::Appended(id) => self.observers.emit(HistoryEvent::Executed {
                id,
                merged: false,
            }),
            Execution::Merged(id) => self
                .observers
                .emit(HistoryEvent::Executed { id, merged: true }),
            Execution::Rejected => {}
        }
        Ok(execution)
    }

    fn execute_inner(
        &mut self,
        mut command: Box<dyn Command<T>>,
        target: &mut T,
    ) -> CommandResult<Execution> {
        if !command.is_valid() {
            log::debug!("Rejected invalid command: {}", command.description());
            command.on_rejected();
            return Ok(Execution::Rejected);
        }

        let now = self.clock.now();
        let elapsed = self
            .last_execution
            .map(|last| now.saturating_duration_since(last));
        let merge = self
            .past
            .last()
            .and_then(|last| self.policy.evaluate(last.command(), &*command, elapsed));

        let execution = match merge {
            Some(reason) => self.absorb(command, reason, now, target)?,
            None => self.append(command, now, target)?,
        };
        self.last_execution = Some(now);
        Ok(execution)
    }

    fn append(
        &mut self,
        mut command: Box<dyn Command<T>>,
        now: Instant,
        target: &mut T,
    ) -> CommandResult<Execution> {
        if let Err(e) = command.execute(target) {
            log::warn!("Execute of {:?} failed: {e}", command.description());
            command.dispose();
            return Err(e);
        }
        self.discard_future();

        let id = SequenceId(self.past.len() as u64 + 1);
        log::debug!("Executed {id} {:?}", command.description());
        self.past.push(HistoryEntry {
            id,
            applied_at: now,
            command,
        });
        // One step further from the save point.
        if let Some(d) = &mut self.save_distance {
            *d += 1;
        }
        Ok(Execution::Appended(id))
    }

    fn absorb(
        &mut self,
        mut command: Box<dyn Command<T>>,
        reason: MergeReason,
        now: Instant,
        target: &mut T,
    ) -> CommandResult<Execution> {
        let Some(last) = self.past.last_mut() else {
            return self.append(command, now, target);
        };
        last.command.update(&*command);
        last.applied_at = now;
        let id = last.id;
        log::debug!("Merged {:?} into {id} ({reason:?})", command.description());
        command.dispose();
        last.command.execute(target)?;
        self.discard_future();

        // The saved entry no longer matches what was saved.
        if self.save_distance == Some(0) {
            self.save_distance = None;
        }
        Ok(Execution::Merged(id))
    }

    /// Undoes the most recent entry and returns it.
    ///
    /// Returns `Ok(None)` if there is nothing to undo. If the command's
    /// reverse effect fails the entry stays on the past stack.
    pub fn undo(&mut self, target: &mut T) -> HistoryResult<Option<&dyn Command<T>>> {
        self.ensure_unlocked(BlockedOperation::Undo)?;
        self.enter("undo");
        let result = self.undo_step(target);
        self.leave();

        match result? {
            Some(id) => {
                self.observers.emit(HistoryEvent::Undone { id });
                Ok(self.future.last().map(HistoryEntry::command))
            }
            None => Ok(None),
        }
    }

    /// Redoes the most recently undone entry and returns it.
    ///
    /// Returns `Ok(None)` if there is nothing to redo. The entry keeps its
    /// original identifier. If the command's effect fails the entry stays on
    /// the future stack.
    pub fn redo(&mut self, target: &mut T) -> HistoryResult<Option<&dyn Command<T>>> {
        self.ensure_unlocked(BlockedOperation::Redo)?;
        self.enter("redo");
        let result = self.redo_step(target);
        self.leave();

        match result? {
            Some(id) => {
                self.observers.emit(HistoryEvent::Redone { id });
                Ok(self.past.last().map(HistoryEntry::command))
            }
            None => Ok(None),
        }
    }

    /// Undoes or redoes until the entry `id` is the top of the past stack
    /// ([`SequenceId::INITIAL`] undoes everything), and returns the
    /// identifier reached.
    ///
    /// Observers receive [`HistoryEvent::NavigationStarted`], then nothing
    /// for the individual steps, then one [`HistoryEvent::Navigated`], also
    /// when a step fails.
    pub fn go_to_state(&mut self, id: SequenceId, target: &mut T) -> HistoryResult<SequenceId> {
        self.ensure_unlocked(BlockedOperation::GoToState)?;

        let from = self.current_id();
        let plan = NavigationPlan::compute(
            self.past.iter().map(HistoryEntry::id),
            self.future.iter().map(HistoryEntry::id),
            id,
        );
        if plan == NavigationPlan::Stay {
            return Ok(from);
        }

        log::debug!("Navigating from {from} to {id}: {plan:?}");
        self.observers
            .emit(HistoryEvent::NavigationStarted { from, to: id });

        self.enter("go_to_state");
        let pause = self.observers.pause();
        let result = self.run_plan(plan, target);
        drop(pause);
        self.leave();

        let current = self.current_id();
        self.observers.emit(HistoryEvent::Navigated { current });
        result?;
        Ok(current)
    }

    fn run_plan(&mut self, plan: NavigationPlan, target: &mut T) -> CommandResult {
        match plan {
            NavigationPlan::Stay => {}
            NavigationPlan::Undo(steps) => {
                for _ in 0..steps {
                    if self.undo_step(target)?.is_none() {
                        break;
                    }
                }
            }
            NavigationPlan::Redo(steps) => {
                for _ in 0..steps {
                    if self.redo_step(target)?.is_none() {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn undo_step(&mut self, target: &mut T) -> CommandResult<Option<SequenceId>> {
        let Some(mut entry) = self.past.pop() else {
            return Ok(None);
        };
        if let Err(e) = entry.command.undo(target) {
            log::warn!("Undo of {} {:?} failed: {e}", entry.id, entry.description());
            self.past.push(entry);
            return Err(e);
        }
        let id = entry.id;
        log::trace!("Undid {id} {:?}", entry.description());
        self.future.push(entry);
        if let Some(d) = &mut self.save_distance {
            *d -= 1;
        }
        Ok(Some(id))
    }

    fn redo_step(&mut self, target: &mut T) -> CommandResult<Option<SequenceId>> {
        let Some(mut entry) = self.future.pop() else {
            return Ok(None);
        };
        if let Err(e) = entry.command.redo(target) {
            log::warn!("Redo of {} {:?} failed: {e}", entry.id, entry.description());
            self.future.push(entry);
            return Err(e);
        }
        let id = entry.id;
        log::trace!("Redid {id} {:?}", entry.description());
        self.past.push(entry);
        if let Some(d) = &mut self.save_distance {
            *d += 1;
        }
        Ok(Some(id))
    }

    /// Disposes every entry of both stacks.
    ///
    /// If the current state was the saved state, it remains so. Otherwise the
    /// save point is permanently lost. The merge window keeps running from
    /// the last execution.
    pub fn clear(&mut self) {
        self.enter("clear");
        let disposed = self.past.len() + self.future.len();
        while let Some(entry) = self.past.pop() {
            entry.dispose();
        }
        self.discard_future();
        if self.save_distance != Some(0) {
            self.save_distance = None;
        }
        self.leave();

        log::debug!("Cleared history ({disposed} entries)");
        self.observers.emit(HistoryEvent::Cleared);
    }

    fn discard_future(&mut self) {
        if self.future.is_empty() {
            return;
        }
        log::trace!("Discarding {} redo entries", self.future.len());
        while let Some(entry) = self.future.pop() {
            entry.dispose();
        }
        // The save point can no longer be reached by redoing.
        if let Some(d) = self.save_distance
            && d < 0
        {
            self.save_distance = None;
        }
    }

    fn ensure_unlocked(&self, operation: BlockedOperation) -> HistoryResult {
        if self.simulation.is_running() {
            self.notifier.history_locked(operation);
            return Err(HistoryError::Locked(operation));
        }
        Ok(())
    }

    fn enter(&mut self, operation: &str) {
        assert!(
            !self.in_operation,
            "command history entered for {operation} while poisoned: \
             a previous operation panicked with the stacks half-updated"
        );
        self.in_operation = true;
    }

    fn leave(&mut self) {
        self.in_operation = false;
    }

    /// Entries that can be undone, oldest first.
    pub fn past(&self) -> &[HistoryEntry<T>] {
        &self.past
    }

    /// Entries that can be redone, in stack order: the next one to redo is
    /// last.
    pub fn future(&self) -> &[HistoryEntry<T>] {
        &self.future
    }

    /// Identifier of the top of the past stack, or [`SequenceId::INITIAL`].
    pub fn current_id(&self) -> SequenceId {
        self.past.last().map_or(SequenceId::INITIAL, HistoryEntry::id)
    }

    /// Returns `true` if there are entries that can be undone.
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    /// Returns `true` if there are entries that can be redone.
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Returns an iterator over undo descriptions, most recent first.
    pub fn undo_descriptions(&self) -> impl Iterator<Item = &str> {
        self.past.iter().rev().map(HistoryEntry::description)
    }

    /// Returns an iterator over redo descriptions, next to redo first.
    pub fn redo_descriptions(&self) -> impl Iterator<Item = &str> {
        self.future.iter().rev().map(HistoryEntry::description)
    }

    pub fn undo_count(&self) -> usize {
        self.past.len()
    }

    pub fn redo_count(&self) -> usize {
        self.future.len()
    }

    /// When a command was last executed, if ever.
    pub fn last_execution_time(&self) -> Option<Instant> {
        self.last_execution
    }

    pub fn policy(&self) -> &CoalescePolicy {
        &self.policy
    }

    /// Returns `true` while the simulation gate blocks undo and redo.
    pub fn is_locked(&self) -> bool {
        self.simulation.is_running()
    }

    /// Registers a callback invoked after every change to the history.
    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&HistoryEvent) + Send + 'static,
    ) -> ObserverId {
        self.observers.subscribe(Box::new(callback))
    }

    /// Removes an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Suppresses notifications until the returned pause is dropped.
    pub fn pause_notifications(&self) -> NotificationPause {
        self.observers.pause()
    }

    pub fn notifications_paused(&self) -> bool {
        self.observers.is_paused()
    }

    /// Records the current state as the saved state.
    ///
    /// After calling this, [`has_unsaved_changes`](Self::has_unsaved_changes)
    /// returns `false` until the history is modified by execute, undo, or redo.
    pub fn mark_saved(&mut self) {
        self.save_distance = Some(0);
    }

    /// Returns `true` if the current state differs from the last saved state.
    ///
    /// A fresh history counts as saved. The save point becomes permanently
    /// unreachable when a merge modifies the saved entry, when the redo branch
    /// holding it is discarded, or when the history is cleared away from it.
    pub fn has_unsaved_changes(&self) -> bool {
        self.save_distance != Some(0)
    }
}

impl<T: Editable> Default for CommandHistory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Editable> fmt::Debug for CommandHistory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHistory")
            .field("undo_count", &self.past.len())
            .field("redo_count", &self.future.len())
            .field("current_id", &self.current_id())
            .field("policy", &self.policy)
            .field("observers", &self.observers)
            .field("save_distance", &self.save_distance)
            .finish()
    }
}

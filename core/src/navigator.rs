//! Jumping to an arbitrary point in the history.
//!
//! [`NavigationPlan::compute`] turns a target [`SequenceId`] into the minimal
//! run of undo or redo steps that makes it the top of the past stack.
//! [`CommandHistory::go_to_state`](crate::history::CommandHistory::go_to_state)
//! performs the plan.

use std::cmp::Ordering;

use crate::history::SequenceId;

/// The steps needed to reach a target state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationPlan {
    /// Already there, or the target is unreachable in the redo direction.
    Stay,
    /// Undo this many entries.
    Undo(usize),
    /// Redo this many entries.
    Redo(usize),
}

impl NavigationPlan {
    /// Plans the jump to `target`.
    ///
    /// `past` and `future` list entry identifiers in stack order: oldest
    /// first, with the top of each stack last.
    ///
    /// Moving back stops once the top of `past` is `target` or `past` is
    /// exhausted (`target` is [`SequenceId::INITIAL`]). Moving forward stops
    /// at the first promoted entry whose identifier reaches `target`, or
    /// when `future` runs out.
    pub fn compute<P, F>(past: P, future: F, target: SequenceId) -> Self
    where
        P: IntoIterator<Item = SequenceId>,
        P::IntoIter: DoubleEndedIterator,
        F: IntoIterator<Item = SequenceId>,
        F::IntoIter: DoubleEndedIterator,
    {
        let mut past = past.into_iter().rev().peekable();
        let current = past.peek().copied().unwrap_or(SequenceId::INITIAL);

        match target.cmp(&current) {
            Ordering::Equal => Self::Stay,
            Ordering::Less => Self::Undo(past.take_while(|id| *id > target).count()),
            Ordering::Greater => {
                let mut steps = 0;
                for id in future.into_iter().rev() {
                    steps += 1;
                    if id >= target {
                        break;
                    }
                }
                if steps == 0 {
                    Self::Stay
                } else {
                    Self::Redo(steps)
                }
            }
        }
    }

    /// Number of undo or redo steps in the plan.
    pub fn steps(&self) -> usize {
        match self {
            Self::Stay => 0,
            Self::Undo(n) | Self::Redo(n) => *n,
        }
    }
}

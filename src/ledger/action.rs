//! # Undo Log
//!
//! Ledger mutations are recorded as [`Action`] values and undone by applying
//! their inverse. The log is a bounded LIFO stack: once it holds
//! [`UNDO_CAPACITY`] actions, recording another silently drops the oldest.
//!
//! Undo is single-level per action. A popped action is discarded, there is no
//! redo stack.

use std::collections::VecDeque;
use tracing::debug;

use super::{Ledger, Row};
use crate::error::Result;

/// Maximum number of undoable actions kept
pub const UNDO_CAPACITY: usize = 20;

/// A recorded, invertible ledger mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A row was appended at the tail
    AddRow,
    /// The tail row was removed; holds its values
    DeleteRow(Row),
}

impl Action {
    /// Reverse the mutation this action recorded.
    ///
    /// The inverse of `AddRow` removes the tail row; the inverse of
    /// `DeleteRow` re-appends the captured row at the tail, which is where it
    /// was deleted from.
    pub fn apply_inverse(self, ledger: &mut Ledger) -> Result<()> {
        match self {
            Action::AddRow => {
                ledger.pop_row();
                Ok(())
            }
            Action::DeleteRow(row) => ledger.push_row(row),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::AddRow => "add row",
            Action::DeleteRow(_) => "delete row",
        }
    }
}

/// Bounded undo stack
#[derive(Debug, Clone)]
pub struct ActionLog {
    actions: VecDeque<Action>,
    capacity: usize,
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionLog {
    /// Creates an empty log holding up to [`UNDO_CAPACITY`] actions
    pub fn new() -> Self {
        Self::with_capacity(UNDO_CAPACITY)
    }

    /// Creates an empty log holding up to `capacity` actions
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            actions: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a mutation that has already been applied
    pub fn record(&mut self, action: Action) {
        self.actions.push_back(action);
        while self.actions.len() > self.capacity {
            if let Some(evicted) = self.actions.pop_front() {
                debug!("Undo stack full, dropping oldest {} action", evicted.name());
            }
        }
    }

    /// Undo the most recent action against `ledger`
    ///
    /// The caller is responsible for persisting the ledger afterwards.
    ///
    /// # Returns
    ///
    /// * `Result<bool>` - `false` if there was nothing to undo
    pub fn undo(&mut self, ledger: &mut Ledger) -> Result<bool> {
        match self.actions.pop_back() {
            Some(action) => {
                debug!("Undoing {} action", action.name());
                action.apply_inverse(ledger)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Forget every recorded action
    pub fn clear(&mut self) {
        self.actions.clear();
    }
}

//! Transactions: atomic groups of operations.

use super::op::{EditOp, OpResult};

/// An ordered group of operations moved between the undo and redo stacks
/// as one unit.
///
/// Operations are recorded in performance order. Undoing runs their undo
/// actions in reverse order; redoing runs their perform actions forward.
/// The transaction remembers which direction is currently applied, so the
/// two replays can never be confused even for operations whose perform
/// and undo actions are not symmetric.
#[derive(Debug)]
pub struct Transaction {
    ops: Vec<Box<dyn EditOp>>,
    applied: bool,
}

impl Transaction {
    pub(crate) fn new() -> Self {
        Self {
            ops: Vec::new(),
            applied: true,
        }
    }

    pub(crate) fn push(&mut self, op: Box<dyn EditOp>) {
        self.ops.push(op);
    }

    /// Number of recorded operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` if no operations were recorded.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Returns `true` if the transaction's forward effect is currently
    /// applied (it sits on the undo stack rather than the redo stack).
    pub fn is_applied(&self) -> bool {
        self.applied
    }

    /// Description of the first recorded operation, for menu labels.
    pub fn description(&self) -> &str {
        self.ops.first().map(|op| op.description()).unwrap_or("")
    }

    /// Runs every operation's undo action in reverse recording order.
    pub(crate) fn undo_all(&mut self) -> OpResult {
        debug_assert!(self.applied, "undoing a transaction that is not applied");
        for op in self.ops.iter_mut().rev() {
            op.undo()?;
        }
        self.applied = false;
        Ok(())
    }

    /// Runs every operation's perform action in recording order.
    pub(crate) fn redo_all(&mut self) -> OpResult {
        debug_assert!(!self.applied, "redoing a transaction that is applied");
        for op in self.ops.iter_mut() {
            op.perform()?;
        }
        self.applied = true;
        Ok(())
    }
}

//! Reversible editing: operations, transactions, undo/redo history.
//!
//! Every mutation the editor wants to be reversible goes through this
//! module:
//!
//! - [`EditOp`] — a reversible edit operation (Command pattern)
//! - [`Transaction`] — an atomic group of operations
//! - [`EditHistory`] — the undo/redo stack managing transactions
//! - [`OpQueue`] — queue for submitting operations from read-only contexts
//!
//! # Transactions
//!
//! Operations performed inside [`EditHistory::run_as_transaction`]
//! collapse into a single undo entry; scopes nest arbitrarily and only
//! the outermost one records. Undoing a transaction runs its operations'
//! undo actions newest-first; redoing runs the perform actions in the
//! original order. Operations carry distinct perform and undo actions,
//! and each transaction tracks which direction is currently applied —
//! redo never assumes an undo action is its own inverse.
//!
//! # Suppression
//!
//! [`EditHistory::run_suppressed`] executes operations without recording
//! them, for programmatic changes that must not become undoable. The
//! history applies the same guard internally while replaying an undo or
//! redo, so a replay can never disturb the stacks it is replayed from.

mod history;
mod op;
mod queue;
mod transaction;

pub use history::{DEFAULT_MAX_UNDO, EditHistory};
pub use op::{EditOp, FnOp, OpError, OpResult, UndoFn};
pub use queue::OpQueue;
pub use transaction::Transaction;

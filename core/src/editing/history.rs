//! Undo/redo history of edit transactions.
//!
//! [`EditHistory`] manages a linear undo/redo stack of [`Transaction`]s.
//! When a new transaction is recorded after undoing, the redo stack is
//! cleared (standard editor behavior — branching history is not
//! supported).

use std::collections::VecDeque;
use std::fmt;

use super::op::{EditOp, OpResult, UndoFn};
use super::transaction::Transaction;

/// Default maximum number of undo steps.
pub const DEFAULT_MAX_UNDO: usize = 100;

/// Manages an undo/redo stack of edit transactions.
///
/// The undo stack is a bounded [`VecDeque`] — when it exceeds `max_undo`,
/// the oldest transaction is dropped from the front. The redo stack is an
/// unbounded [`Vec`] (it can never grow larger than the undo stack was).
///
/// Every mutation enters through [`perform`](Self::perform) or
/// [`add_undo`](Self::add_undo). Outside a transaction scope each call
/// records a singleton transaction; inside
/// [`run_as_transaction`](Self::run_as_transaction) the calls accumulate
/// into one transaction that undoes and redoes as a unit. Scopes nest:
/// only the outermost one seals and records the transaction.
///
/// # Example
///
/// ```ignore
/// let mut history = EditHistory::new(50);
///
/// history.run_as_transaction(|history| {
///     history.perform(move_vertex)?;
///     history.perform(update_bounds)?;
///     Ok::<_, OpError>(())
/// })?;
///
/// history.undo()?; // reverts update_bounds, then move_vertex
/// history.redo()?; // reapplies both, forward order
/// ```
pub struct EditHistory {
    undo_stack: VecDeque<Transaction>,
    redo_stack: Vec<Transaction>,
    max_undo: usize,
    /// Transaction currently being recorded, if any scope is open.
    open: Option<Transaction>,
    /// Transaction scope nesting depth.
    depth: usize,
    /// Suppression nesting depth; recording is disabled while positive.
    suppress: usize,
    /// Set while a popped transaction is replaying, so the replay cannot
    /// disturb the stacks it is being replayed from.
    replaying: bool,
    /// Tracks distance from the saved state.
    ///
    /// - `Some(0)` — the current state matches the last save.
    /// - `Some(n)` where `n > 0` — `n` undos needed to reach the saved state.
    /// - `Some(n)` where `n < 0` — `|n|` redos needed to reach the saved state.
    /// - `None` — never saved, or the save point is permanently unreachable
    ///   (dropped by capacity overflow, or the redo branch was discarded).
    save_distance: Option<i64>,
}

impl EditHistory {
    /// Creates a new empty history with the given maximum undo depth.
    pub fn new(max_undo: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_undo,
            open: None,
            depth: 0,
            suppress: 0,
            replaying: false,
            save_distance: Some(0),
        }
    }

    /// Executes `op` and records it.
    ///
    /// Outside a transaction scope the operation becomes a singleton
    /// transaction on the undo stack and the redo stack is cleared. Inside
    /// a scope it is appended to the current transaction. If the operation
    /// fails, nothing is recorded.
    pub fn perform(&mut self, mut op: Box<dyn EditOp>) -> OpResult {
        op.perform()?;
        self.record(op);
        Ok(())
    }

    /// Records `op` without executing its perform action.
    ///
    /// For mutations the caller has already applied. The operation's undo
    /// action must reverse that applied mutation.
    pub fn add_undo(&mut self, op: Box<dyn EditOp>) {
        self.record(op);
    }

    /// Records a bare undo closure for an already-applied mutation.
    ///
    /// The forward direction of such an entry is a no-op; see
    /// [`UndoFn`](super::UndoFn).
    pub fn add_undo_fn(
        &mut self,
        description: impl Into<String>,
        undo: impl FnMut() -> OpResult + 'static,
    ) {
        self.record(Box::new(UndoFn::new(description, undo)));
    }

    /// Runs `body` inside a transaction scope.
    ///
    /// Every operation recorded by `body` — directly or through nested
    /// scopes — collapses into a single undo entry. The scope closes when
    /// `body` returns, whether it succeeded or not.
    pub fn run_as_transaction<R>(&mut self, body: impl FnOnce(&mut Self) -> R) -> R {
        self.begin_transaction();
        let result = body(self);
        self.end_transaction();
        result
    }

    /// Opens a transaction scope. Prefer
    /// [`run_as_transaction`](Self::run_as_transaction); this low-level
    /// pair exists for edits that span multiple callbacks, such as a drag
    /// gesture.
    pub fn begin_transaction(&mut self) {
        if self.depth == 0 {
            self.open = Some(Transaction::new());
        }
        self.depth += 1;
    }

    /// Closes the innermost transaction scope. The outermost close seals
    /// the transaction and records it if it is non-empty and recording is
    /// not suppressed.
    ///
    /// # Panics
    ///
    /// Panics if no scope is open — an unbalanced close is a bug in
    /// calling code.
    pub fn end_transaction(&mut self) {
        assert!(
            self.depth > 0,
            "end_transaction called with no open transaction"
        );
        self.depth -= 1;
        if self.depth > 0 {
            return;
        }
        let tx = self
            .open
            .take()
            .expect("open transaction exists at outermost end");
        if tx.is_empty() || self.recording_suppressed() {
            return;
        }
        log::trace!("sealed transaction \"{}\" ({} ops)", tx.description(), tx.len());
        self.push_undo(tx);
    }

    /// Undoes the most recent transaction, moving it to the redo stack.
    ///
    /// Its operations' undo actions run in reverse recording order.
    /// Returns `Ok(false)` if there was nothing to undo.
    pub fn undo(&mut self) -> OpResult<bool> {
        let Some(mut tx) = self.undo_stack.pop_back() else {
            return Ok(false);
        };
        log::debug!("undo \"{}\"", tx.description());
        self.replaying = true;
        let result = tx.undo_all();
        self.replaying = false;
        result?;
        self.redo_stack.push(tx);
        if let Some(d) = &mut self.save_distance {
            *d -= 1;
        }
        Ok(true)
    }

    /// Redoes the most recently undone transaction, moving it back to the
    /// undo stack.
    ///
    /// Its operations' perform actions run in recording order. Returns
    /// `Ok(false)` if there was nothing to redo.
    pub fn redo(&mut self) -> OpResult<bool> {
        let Some(mut tx) = self.redo_stack.pop() else {
            return Ok(false);
        };
        log::debug!("redo \"{}\"", tx.description());
        self.replaying = true;
        let result = tx.redo_all();
        self.replaying = false;
        result?;
        self.undo_stack.push_back(tx);
        self.trim_overflow();
        if let Some(d) = &mut self.save_distance {
            *d += 1;
        }
        Ok(true)
    }

    /// Empties the redo stack, unless recording is currently suppressed.
    pub fn clear_redo(&mut self) {
        if self.recording_suppressed() || self.redo_stack.is_empty() {
            return;
        }
        // Discarding the redo branch loses a save point that lived in it.
        if let Some(d) = self.save_distance
            && d < 0
        {
            self.save_distance = None;
        }
        self.redo_stack.clear();
    }

    /// Runs `body` with recording disabled.
    ///
    /// Operations still execute, but nothing reaches the undo stack. Used
    /// for programmatic changes that must not become undoable.
    pub fn run_suppressed<R>(&mut self, body: impl FnOnce(&mut Self) -> R) -> R {
        self.suppress += 1;
        let result = body(self);
        self.suppress -= 1;
        result
    }

    /// Returns `true` if a transaction scope is open.
    pub fn in_transaction(&self) -> bool {
        self.depth > 0
    }

    /// Returns `true` if there are transactions that can be undone.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns `true` if there are transactions that can be redone.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Returns an iterator over undo transaction descriptions, most recent
    /// first.
    pub fn undo_descriptions(&self) -> impl Iterator<Item = &str> {
        self.undo_stack.iter().rev().map(|tx| tx.description())
    }

    /// Returns an iterator over redo transaction descriptions, most recent
    /// first.
    pub fn redo_descriptions(&self) -> impl Iterator<Item = &str> {
        self.redo_stack.iter().rev().map(|tx| tx.description())
    }

    /// Returns the number of transactions in the undo stack.
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// Returns the number of transactions in the redo stack.
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Returns the maximum undo depth.
    pub fn max_undo(&self) -> usize {
        self.max_undo
    }

    /// Records the current state as the saved state.
    ///
    /// After calling this, [`has_unsaved_changes`](Self::has_unsaved_changes)
    /// returns `false` until the history records, undoes, or redoes a
    /// transaction.
    pub fn mark_saved(&mut self) {
        self.save_distance = Some(0);
    }

    /// Returns `true` if the current state differs from the last saved
    /// state, or if the save point is permanently unreachable.
    pub fn has_unsaved_changes(&self) -> bool {
        self.save_distance != Some(0)
    }

    /// Clears both stacks.
    ///
    /// If the current state was the saved state it remains so; otherwise
    /// the save point is permanently lost.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        if self.save_distance != Some(0) {
            self.save_distance = None;
        }
    }

    fn recording_suppressed(&self) -> bool {
        self.suppress > 0 || self.replaying
    }

    fn record(&mut self, op: Box<dyn EditOp>) {
        if self.recording_suppressed() {
            return;
        }
        if let Some(tx) = self.open.as_mut() {
            tx.push(op);
        } else {
            let mut tx = Transaction::new();
            tx.push(op);
            self.push_undo(tx);
        }
    }

    fn push_undo(&mut self, tx: Transaction) {
        self.clear_redo();
        if let Some(d) = &mut self.save_distance {
            *d += 1;
        }
        self.undo_stack.push_back(tx);
        self.trim_overflow();
    }

    fn trim_overflow(&mut self) {
        if self.undo_stack.len() > self.max_undo {
            self.undo_stack.pop_front();
            // If the save point was beyond the oldest surviving entry, it's gone.
            if let Some(d) = self.save_distance
                && d > self.undo_stack.len() as i64
            {
                self.save_distance = None;
            }
        }
    }
}

impl Default for EditHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNDO)
    }
}

impl fmt::Debug for EditHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditHistory")
            .field("undo_count", &self.undo_stack.len())
            .field("redo_count", &self.redo_stack.len())
            .field("max_undo", &self.max_undo)
            .field("depth", &self.depth)
            .field("save_distance", &self.save_distance)
            .finish()
    }
}

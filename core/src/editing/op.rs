//! Reversible edit operations.
//!
//! This module defines the command abstraction recorded by
//! [`EditHistory`](super::EditHistory):
//!
//! - [`EditOp`] — a reversible edit operation (Command pattern)
//! - [`FnOp`] / [`UndoFn`] — closure adapters
//! - [`OpError`] / [`OpResult`] — error handling for operations
//!
//! Operations are self-contained: each implementation internally captures
//! whatever it needs (shared domain objects, old/new values, handles).
//! There is no external target parameter — a Windrose edit typically
//! clones an `Rc` to the objects it mutates.

use std::fmt;

use crate::lifecycle::LifecycleError;

/// Error type for operation execution failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OpError {
    /// The target object was not found.
    #[error("target not found: {0}")]
    TargetNotFound(String),
    /// The target is in an invalid state for this operation.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// A lifecycle protocol failure raised by a mutated object.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    /// A custom error with a description.
    #[error("{0}")]
    Custom(String),
}

/// Result type for operation execution.
pub type OpResult<T = ()> = Result<T, OpError>;

/// A reversible edit operation (Command pattern).
///
/// Operations carry **distinct** perform and undo actions. Undoing a
/// recorded transaction runs `undo` in reverse recording order; redoing
/// it runs `perform` again in forward order. Nothing requires the two
/// actions to be symmetric — the history tracks which direction each
/// transaction is currently applied in.
///
/// # Object Safety
///
/// The trait is dyn-compatible so that heterogeneous operations can share
/// one history as `Box<dyn EditOp>`.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use windrose_core::editing::{EditOp, OpResult};
///
/// #[derive(Debug)]
/// struct SetElevation {
///     cell: Rc<Cell<i32>>,
///     old: i32,
///     new: i32,
/// }
///
/// impl EditOp for SetElevation {
///     fn perform(&mut self) -> OpResult {
///         self.cell.set(self.new);
///         Ok(())
///     }
///
///     fn undo(&mut self) -> OpResult {
///         self.cell.set(self.old);
///         Ok(())
///     }
///
///     fn description(&self) -> &str {
///         "Set elevation"
///     }
/// }
/// ```
pub trait EditOp: fmt::Debug {
    /// Applies the operation (forward / redo direction).
    fn perform(&mut self) -> OpResult;

    /// Reverses the operation (undo direction).
    ///
    /// Must restore the state from before [`perform`](Self::perform).
    fn undo(&mut self) -> OpResult;

    /// A short, human-readable description for display in the edit menu.
    fn description(&self) -> &str;
}

/// An [`EditOp`] built from a pair of closures.
///
/// Convenient for one-off edits that don't warrant a named type:
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use windrose_core::editing::FnOp;
///
/// let value = Rc::new(Cell::new(0));
/// let (a, b) = (value.clone(), value.clone());
/// let op = FnOp::new(
///     "Set value",
///     move || {
///         a.set(5);
///         Ok(())
///     },
///     move || {
///         b.set(0);
///         Ok(())
///     },
/// );
/// # let _ = op;
/// ```
pub struct FnOp<P, U>
where
    P: FnMut() -> OpResult + 'static,
    U: FnMut() -> OpResult + 'static,
{
    description: String,
    perform: P,
    undo: U,
}

impl<P, U> FnOp<P, U>
where
    P: FnMut() -> OpResult + 'static,
    U: FnMut() -> OpResult + 'static,
{
    /// Creates an operation from a perform closure and an undo closure.
    pub fn new(description: impl Into<String>, perform: P, undo: U) -> Self {
        Self {
            description: description.into(),
            perform,
            undo,
        }
    }

    /// Boxes the operation for recording.
    pub fn boxed(description: impl Into<String>, perform: P, undo: U) -> Box<dyn EditOp> {
        Box::new(Self::new(description, perform, undo))
    }
}

impl<P, U> EditOp for FnOp<P, U>
where
    P: FnMut() -> OpResult + 'static,
    U: FnMut() -> OpResult + 'static,
{
    fn perform(&mut self) -> OpResult {
        (self.perform)()
    }

    fn undo(&mut self) -> OpResult {
        (self.undo)()
    }

    fn description(&self) -> &str {
        &self.description
    }
}

impl<P, U> fmt::Debug for FnOp<P, U>
where
    P: FnMut() -> OpResult + 'static,
    U: FnMut() -> OpResult + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOp")
            .field("description", &self.description)
            .finish()
    }
}

/// An undo-only operation wrapping a single closure.
///
/// Used by [`EditHistory::add_undo_fn`](super::EditHistory::add_undo_fn)
/// to record a mutation that the caller already applied. Its forward
/// direction is a no-op, so redoing a transaction containing only such
/// operations does not reproduce the original effect — prefer a full
/// [`EditOp`] when redo matters.
pub struct UndoFn<U>
where
    U: FnMut() -> OpResult + 'static,
{
    description: String,
    undo: U,
}

impl<U> UndoFn<U>
where
    U: FnMut() -> OpResult + 'static,
{
    /// Wraps an undo closure.
    pub fn new(description: impl Into<String>, undo: U) -> Self {
        Self {
            description: description.into(),
            undo,
        }
    }
}

impl<U> EditOp for UndoFn<U>
where
    U: FnMut() -> OpResult + 'static,
{
    fn perform(&mut self) -> OpResult {
        Ok(())
    }

    fn undo(&mut self) -> OpResult {
        (self.undo)()
    }

    fn description(&self) -> &str {
        &self.description
    }
}

impl<U> fmt::Debug for UndoFn<U>
where
    U: FnMut() -> OpResult + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoFn")
            .field("description", &self.description)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn fn_op_runs_both_directions() {
        let value = Rc::new(Cell::new(0));
        let (a, b) = (value.clone(), value.clone());
        let mut op = FnOp::new(
            "Set",
            move || {
                a.set(5);
                Ok(())
            },
            move || {
                b.set(0);
                Ok(())
            },
        );

        op.perform().unwrap();
        assert_eq!(value.get(), 5);
        op.undo().unwrap();
        assert_eq!(value.get(), 0);
        assert_eq!(op.description(), "Set");
    }

    #[test]
    fn undo_fn_forward_direction_is_noop() {
        let value = Rc::new(Cell::new(5));
        let cell = value.clone();
        let mut op = UndoFn::new("Reset", move || {
            cell.set(0);
            Ok(())
        });

        op.perform().unwrap();
        assert_eq!(value.get(), 5);
        op.undo().unwrap();
        assert_eq!(value.get(), 0);
    }

    #[test]
    fn op_is_dyn_compatible() {
        let value = Rc::new(Cell::new(0));
        let cell = value.clone();
        let mut boxed: Box<dyn EditOp> = FnOp::boxed(
            "Increment",
            move || {
                cell.set(cell.get() + 1);
                Ok(())
            },
            || Ok(()),
        );
        boxed.perform().unwrap();
        assert_eq!(value.get(), 1);
    }

    #[test]
    fn error_display() {
        assert_eq!(
            OpError::TargetNotFound("vertex 42".into()).to_string(),
            "target not found: vertex 42"
        );
        assert_eq!(
            OpError::InvalidState("locked".into()).to_string(),
            "invalid state: locked"
        );
        assert_eq!(
            OpError::Custom("something went wrong".into()).to_string(),
            "something went wrong"
        );
    }

    #[test]
    fn lifecycle_errors_convert() {
        let err: OpError = LifecycleError::StaleHandle.into();
        assert_eq!(err, OpError::Lifecycle(LifecycleError::StaleHandle));
        assert_eq!(err.to_string(), "stale or foreign handle");
    }

    #[test]
    fn debug_impls() {
        let op = FnOp::new("Move vertex", || Ok(()), || Ok(()));
        assert!(format!("{op:?}").contains("Move vertex"));
        let op = UndoFn::new("Reset", || Ok(()));
        assert!(format!("{op:?}").contains("Reset"));
    }
}

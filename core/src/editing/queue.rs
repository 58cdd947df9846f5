//! Queue for submitting edit operations from read-only contexts.
//!
//! [`OpQueue`] uses interior mutability ([`Mutex`]) so that code with only
//! shared `&self` access — panel callbacks, observers, tool previews — can
//! still submit operations. The editor drains the queue once per tick and
//! executes the operations through
//! [`EditHistory`](super::EditHistory).

use std::fmt;
use std::sync::Mutex;

use super::op::EditOp;

/// A queue of pending [`EditOp`]s, submittable through `&self`.
pub struct OpQueue {
    queue: Mutex<Vec<Box<dyn EditOp>>>,
}

impl OpQueue {
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(Vec::new()),
        }
    }

    /// Enqueues an operation. Callable from `&self` thanks to interior
    /// mutability.
    pub fn push(&self, op: Box<dyn EditOp>) {
        self.queue.lock().unwrap().push(op);
    }

    /// Drains all queued operations, returning them in submission order.
    pub fn drain(&self) -> Vec<Box<dyn EditOp>> {
        std::mem::take(&mut *self.queue.lock().unwrap())
    }

    /// Returns `true` if there are no queued operations.
    pub fn is_empty(&self) -> bool {
        self.queue.lock().unwrap().is_empty()
    }
}

impl Default for OpQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OpQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self.queue.lock().unwrap().len();
        f.debug_struct("OpQueue").field("pending", &len).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::{EditHistory, FnOp};
    use std::cell::Cell;
    use std::rc::Rc;

    fn add(value: &Rc<Cell<i32>>, amount: i32) -> Box<dyn EditOp> {
        let (p, u) = (value.clone(), value.clone());
        FnOp::boxed(
            "Add",
            move || {
                p.set(p.get() + amount);
                Ok(())
            },
            move || {
                u.set(u.get() - amount);
                Ok(())
            },
        )
    }

    #[test]
    fn push_and_drain() {
        let value = Rc::new(Cell::new(0));
        let queue = OpQueue::new();
        queue.push(add(&value, 1));
        queue.push(add(&value, 2));

        let ops = queue.drain();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].description(), "Add");
    }

    #[test]
    fn drain_empties_queue() {
        let value = Rc::new(Cell::new(0));
        let queue = OpQueue::new();
        queue.push(add(&value, 1));
        let _ = queue.drain();
        assert!(queue.is_empty());
        assert_eq!(queue.drain().len(), 0);
    }

    #[test]
    fn drained_operations_feed_the_history() {
        let value = Rc::new(Cell::new(0));
        let queue = OpQueue::new();
        queue.push(add(&value, 10));
        queue.push(add(&value, 20));
        queue.push(add(&value, 30));

        let mut history = EditHistory::default();
        for op in queue.drain() {
            history.perform(op).unwrap();
        }
        assert_eq!(value.get(), 60);
        assert_eq!(history.undo_count(), 3);
    }

    #[test]
    fn debug_impl() {
        let queue = OpQueue::new();
        queue.push(FnOp::boxed("Noop", || Ok(()), || Ok(())));
        let debug = format!("{queue:?}");
        assert!(debug.contains("OpQueue"));
        assert!(debug.contains("pending"));
    }
}

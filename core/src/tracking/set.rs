//! Ordered unique tracking set.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::lifecycle::{
    Handle, HolderId, LifecycleError, LifecycleResult, ReferenceHolder, ReferenceTrackable,
};

use super::list::{ListCore, Place};

/// An insertion-ordered set of trackable objects with O(1) soft delete.
///
/// Same storage and hide semantics as [`TrackedList`](super::TrackedList),
/// plus a membership index keyed by object identity: inserting the same
/// object twice is rejected before the links are touched, and
/// [`contains`](Self::contains) / [`remove_value`](Self::remove_value)
/// resolve in constant time.
///
/// Membership is identity, not visibility: a soft-deleted member is still
/// a member (its registration persists so restore can re-show it), it is
/// merely skipped by iteration.
pub struct TrackedSet<T: ReferenceTrackable> {
    core: RefCell<ListCore<T>>,
    index: RefCell<HashMap<*const T, Handle>>,
}

impl<T: ReferenceTrackable> TrackedSet<T> {
    /// Creates an empty set.
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            core: RefCell::new(ListCore::new()),
            index: RefCell::new(HashMap::new()),
        })
    }

    /// Appends `value` and registers this set with its tracker.
    ///
    /// Fails with [`LifecycleError::AlreadyPresent`] if `value` is already
    /// a member.
    pub fn insert(self: &Rc<Self>, value: Rc<T>) -> LifecycleResult<Handle> {
        if self.index.borrow().contains_key(&Rc::as_ptr(&value)) {
            return Err(LifecycleError::AlreadyPresent);
        }
        let handle = self.core.borrow_mut().insert(value.clone(), Place::Back);
        let weak: Weak<Self> = Rc::downgrade(self);
        let holder: Weak<dyn ReferenceHolder> = weak;
        if let Err(err) = value.added_to(holder, handle) {
            let _ = self.core.borrow_mut().unlink(handle);
            return Err(err);
        }
        self.index.borrow_mut().insert(Rc::as_ptr(&value), handle);
        Ok(handle)
    }

    /// Returns `true` if `value` is a member, hidden or not.
    pub fn contains(&self, value: &Rc<T>) -> bool {
        self.index.borrow().contains_key(&Rc::as_ptr(value))
    }

    /// Returns the handle issued for `value`, if it is a member.
    pub fn handle_of(&self, value: &Rc<T>) -> Option<Handle> {
        self.index.borrow().get(&Rc::as_ptr(value)).copied()
    }

    /// Removes the member named by `handle` and deregisters this set from
    /// the object's tracker.
    pub fn remove(&self, handle: Handle) -> LifecycleResult<Rc<T>> {
        let value = self.core.borrow().node_ref(handle)?.value.clone();
        value.removed_from(HolderId::of(self))?;
        let node = self.core.borrow_mut().unlink(handle)?;
        self.index.borrow_mut().remove(&Rc::as_ptr(&node.value));
        Ok(node.value)
    }

    /// Removes `value` from the set by identity.
    pub fn remove_value(&self, value: &Rc<T>) -> LifecycleResult<Rc<T>> {
        let handle = self.handle_of(value).ok_or(LifecycleError::NotPresent)?;
        self.remove(handle)
    }

    /// Resolves a handle to its value. Hidden and stale slots yield `None`.
    pub fn get(&self, handle: Handle) -> Option<Rc<T>> {
        let core = self.core.borrow();
        match core.node_ref(handle) {
            Ok(node) if !node.hidden => Some(node.value.clone()),
            _ => None,
        }
    }

    /// Iterates over visible members in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Rc<T>> {
        self.core.borrow().visible_values().into_iter()
    }

    /// Number of visible members.
    pub fn len(&self) -> usize {
        self.core.borrow().visible_len()
    }

    /// Returns `true` if the set has no visible members.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of members including hidden ones.
    pub fn total_len(&self) -> usize {
        self.core.borrow().total_len()
    }
}

impl<T: ReferenceTrackable> ReferenceHolder for TrackedSet<T> {
    fn referenced_object_soft_deleted(&self, handle: Handle) -> LifecycleResult {
        self.core.borrow_mut().hide(handle)
    }

    fn restore_soft_deleted_object(&self, handle: Handle) -> LifecycleResult {
        self.core.borrow_mut().show(handle)
    }

    fn referenced_object_deleted(&self, handle: Handle) -> LifecycleResult {
        let node = self.core.borrow_mut().unlink(handle)?;
        self.index.borrow_mut().remove(&Rc::as_ptr(&node.value));
        Ok(())
    }

    fn handle_to_object(&self, handle: Handle) -> Option<Rc<dyn ReferenceTrackable>> {
        let value = self.get(handle)?;
        let object: Rc<dyn ReferenceTrackable> = value;
        Some(object)
    }
}

impl<T: ReferenceTrackable> fmt::Debug for TrackedSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core.borrow();
        f.debug_struct("TrackedSet")
            .field("visible", &core.visible_len())
            .field("total", &core.total_len())
            .finish()
    }
}

//! Ordered tracking list.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::lifecycle::{
    Handle, HolderId, LifecycleError, LifecycleResult, ReferenceHolder, ReferenceTrackable,
};

pub(crate) const NIL: u32 = u32::MAX;

/// One arena slot. The generation counts how many times the slot has been
/// vacated; handles carry the generation they were issued under, so a
/// recycled slot never resolves through an old handle.
struct Slot<T> {
    generation: u32,
    node: Option<Node<T>>,
}

pub(crate) struct Node<T> {
    pub(crate) value: Rc<T>,
    prev: u32,
    next: u32,
    pub(crate) hidden: bool,
}

/// Doubly-linked slot arena shared by the tracking containers.
///
/// Nodes stay linked while hidden, so relative order survives a
/// soft-delete/restore cycle; only physical removal unlinks a node and
/// recycles its slot.
pub(crate) struct ListCore<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    head: u32,
    tail: u32,
    visible: usize,
    total: usize,
}

pub(crate) enum Place {
    Back,
    Front,
    Before(u32),
}

impl<T> ListCore<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            visible: 0,
            total: 0,
        }
    }

    pub(crate) fn visible_len(&self) -> usize {
        self.visible
    }

    pub(crate) fn total_len(&self) -> usize {
        self.total
    }

    /// Validates a handle and returns its slot index.
    pub(crate) fn resolve(&self, handle: Handle) -> LifecycleResult<u32> {
        let slot = self
            .slots
            .get(handle.slot() as usize)
            .ok_or(LifecycleError::StaleHandle)?;
        if slot.generation != handle.generation() || slot.node.is_none() {
            return Err(LifecycleError::StaleHandle);
        }
        Ok(handle.slot())
    }

    pub(crate) fn node_ref(&self, handle: Handle) -> LifecycleResult<&Node<T>> {
        let idx = self.resolve(handle)?;
        Ok(self.occupied(idx))
    }

    fn node_mut(&mut self, handle: Handle) -> LifecycleResult<&mut Node<T>> {
        let idx = self.resolve(handle)?;
        Ok(self.occupied_mut(idx))
    }

    fn occupied(&self, idx: u32) -> &Node<T> {
        self.slots[idx as usize]
            .node
            .as_ref()
            .expect("linked slot is occupied")
    }

    fn occupied_mut(&mut self, idx: u32) -> &mut Node<T> {
        self.slots[idx as usize]
            .node
            .as_mut()
            .expect("linked slot is occupied")
    }

    /// Allocates a slot for `value` and links it at `place`, returning the
    /// handle for the new slot. `Place::Before` anchors must already be
    /// resolved indices.
    pub(crate) fn insert(&mut self, value: Rc<T>, place: Place) -> Handle {
        let node = Node {
            value,
            prev: NIL,
            next: NIL,
            hidden: false,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx as usize].node = Some(node);
                idx
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                (self.slots.len() - 1) as u32
            }
        };
        self.total += 1;
        self.visible += 1;
        match place {
            Place::Back => self.link_back(idx),
            Place::Front => self.link_front(idx),
            Place::Before(anchor) => self.link_before(idx, anchor),
        }
        Handle::new(idx, self.slots[idx as usize].generation)
    }

    fn link_back(&mut self, idx: u32) {
        if self.tail == NIL {
            self.head = idx;
        } else {
            let tail = self.tail;
            self.occupied_mut(tail).next = idx;
            self.occupied_mut(idx).prev = tail;
        }
        self.tail = idx;
    }

    fn link_front(&mut self, idx: u32) {
        if self.head == NIL {
            self.tail = idx;
        } else {
            let head = self.head;
            self.occupied_mut(head).prev = idx;
            self.occupied_mut(idx).next = head;
        }
        self.head = idx;
    }

    fn link_before(&mut self, idx: u32, anchor: u32) {
        let anchor_prev = self.occupied(anchor).prev;
        {
            let node = self.occupied_mut(idx);
            node.prev = anchor_prev;
            node.next = anchor;
        }
        self.occupied_mut(anchor).prev = idx;
        if anchor_prev == NIL {
            self.head = idx;
        } else {
            self.occupied_mut(anchor_prev).next = idx;
        }
    }

    /// Marks the slot hidden. The node stays linked.
    pub(crate) fn hide(&mut self, handle: Handle) -> LifecycleResult {
        let node = self.node_mut(handle)?;
        if node.hidden {
            return Err(LifecycleError::AlreadyHidden);
        }
        node.hidden = true;
        self.visible -= 1;
        Ok(())
    }

    /// Clears the hidden flag.
    pub(crate) fn show(&mut self, handle: Handle) -> LifecycleResult {
        let node = self.node_mut(handle)?;
        if !node.hidden {
            return Err(LifecycleError::NotHidden);
        }
        node.hidden = false;
        self.visible += 1;
        Ok(())
    }

    /// Physically unlinks the slot, bumps its generation, and recycles it.
    pub(crate) fn unlink(&mut self, handle: Handle) -> LifecycleResult<Node<T>> {
        let idx = self.resolve(handle)?;
        let slot = &mut self.slots[idx as usize];
        let node = slot.node.take().expect("resolved slot is occupied");
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(idx);

        if node.prev == NIL {
            self.head = node.next;
        } else {
            self.occupied_mut(node.prev).next = node.next;
        }
        if node.next == NIL {
            self.tail = node.prev;
        } else {
            self.occupied_mut(node.next).prev = node.prev;
        }

        self.total -= 1;
        if !node.hidden {
            self.visible -= 1;
        }
        Ok(node)
    }

    /// Visible values in link order. A fresh walk per call.
    pub(crate) fn visible_values(&self) -> Vec<Rc<T>> {
        let mut out = Vec::with_capacity(self.visible);
        let mut idx = self.head;
        while idx != NIL {
            let node = self.occupied(idx);
            if !node.hidden {
                out.push(node.value.clone());
            }
            idx = node.next;
        }
        out
    }
}

/// An ordered container of trackable objects with O(1) soft delete.
///
/// `TrackedList` stores `Rc<T>` values in insertion order and implements
/// [`ReferenceHolder`]: when an object it holds is soft-deleted, the
/// list marks the object's slot hidden instead of unlinking it, so the
/// object can be restored into exactly the position it occupied. Hidden
/// slots are skipped by iteration and never resolved through
/// [`handle_to_object`](ReferenceHolder::handle_to_object).
///
/// Lists are created behind `Rc` because inserting an object registers
/// the list with the object's tracker, which requires a weak self
/// reference.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use windrose_core::lifecycle::{ReferenceTrackable, ReferenceTracker};
/// use windrose_core::tracking::TrackedList;
///
/// struct Vertex {
///     tracker: ReferenceTracker,
/// }
///
/// impl ReferenceTrackable for Vertex {
///     fn tracker(&self) -> &ReferenceTracker {
///         &self.tracker
///     }
/// }
///
/// let list = TrackedList::new();
/// let v = Rc::new(Vertex { tracker: ReferenceTracker::new() });
/// let handle = list.push_back(v.clone()).unwrap();
///
/// v.soft_delete().unwrap();
/// assert_eq!(list.len(), 0);
/// v.restore().unwrap();
/// assert_eq!(list.len(), 1);
/// # let _ = handle;
/// ```
pub struct TrackedList<T: ReferenceTrackable> {
    core: RefCell<ListCore<T>>,
}

impl<T: ReferenceTrackable> TrackedList<T> {
    /// Creates an empty list.
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            core: RefCell::new(ListCore::new()),
        })
    }

    /// Appends `value` and registers this list with its tracker.
    pub fn push_back(self: &Rc<Self>, value: Rc<T>) -> LifecycleResult<Handle> {
        self.insert_at(value, Place::Back)
    }

    /// Prepends `value` and registers this list with its tracker.
    pub fn push_front(self: &Rc<Self>, value: Rc<T>) -> LifecycleResult<Handle> {
        self.insert_at(value, Place::Front)
    }

    /// Inserts `value` immediately before the slot named by `anchor`.
    pub fn insert_before(self: &Rc<Self>, anchor: Handle, value: Rc<T>) -> LifecycleResult<Handle> {
        let place = {
            let core = self.core.borrow();
            Place::Before(core.resolve(anchor)?)
        };
        self.insert_at(value, place)
    }

    fn insert_at(self: &Rc<Self>, value: Rc<T>, place: Place) -> LifecycleResult<Handle> {
        let handle = self.core.borrow_mut().insert(value.clone(), place);
        let weak: Weak<Self> = Rc::downgrade(self);
        let holder: Weak<dyn ReferenceHolder> = weak;
        if let Err(err) = value.added_to(holder, handle) {
            // Registration failed; take the freshly linked slot back out.
            let _ = self.core.borrow_mut().unlink(handle);
            return Err(err);
        }
        Ok(handle)
    }

    /// Removes the slot named by `handle` and deregisters this list from
    /// the object's tracker. This is the explicit removal path; it is not
    /// used for soft deletes.
    pub fn remove(&self, handle: Handle) -> LifecycleResult<Rc<T>> {
        let value = self.core.borrow().node_ref(handle)?.value.clone();
        // Deregister first: a holder must never forget a handle while the
        // tracker still lists it.
        value.removed_from(HolderId::of(self))?;
        let node = self.core.borrow_mut().unlink(handle)?;
        Ok(node.value)
    }

    /// Resolves a handle to its value. Hidden and stale slots yield `None`.
    pub fn get(&self, handle: Handle) -> Option<Rc<T>> {
        let core = self.core.borrow();
        match core.node_ref(handle) {
            Ok(node) if !node.hidden => Some(node.value.clone()),
            _ => None,
        }
    }

    /// Iterates over visible values in insertion order.
    ///
    /// Each call walks the list afresh; hidden slots are skipped.
    pub fn iter(&self) -> impl Iterator<Item = Rc<T>> {
        self.core.borrow().visible_values().into_iter()
    }

    /// Number of visible values.
    pub fn len(&self) -> usize {
        self.core.borrow().visible_len()
    }

    /// Returns `true` if the list has no visible values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of stored values including hidden ones.
    pub fn total_len(&self) -> usize {
        self.core.borrow().total_len()
    }
}

impl<T: ReferenceTrackable> ReferenceHolder for TrackedList<T> {
    fn referenced_object_soft_deleted(&self, handle: Handle) -> LifecycleResult {
        self.core.borrow_mut().hide(handle)
    }

    fn restore_soft_deleted_object(&self, handle: Handle) -> LifecycleResult {
        self.core.borrow_mut().show(handle)
    }

    fn referenced_object_deleted(&self, handle: Handle) -> LifecycleResult {
        self.core.borrow_mut().unlink(handle).map(drop)
    }

    fn handle_to_object(&self, handle: Handle) -> Option<Rc<dyn ReferenceTrackable>> {
        let value = self.get(handle)?;
        let object: Rc<dyn ReferenceTrackable> = value;
        Some(object)
    }
}

impl<T: ReferenceTrackable> fmt::Debug for TrackedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core.borrow();
        f.debug_struct("TrackedList")
            .field("visible", &core.visible_len())
            .field("total", &core.total_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{LifecycleState, ReferenceTracker};

    struct Item {
        name: &'static str,
        tracker: ReferenceTracker,
    }

    impl Item {
        fn new(name: &'static str) -> Rc<Self> {
            Rc::new(Self {
                name,
                tracker: ReferenceTracker::new(),
            })
        }
    }

    impl ReferenceTrackable for Item {
        fn tracker(&self) -> &ReferenceTracker {
            &self.tracker
        }
    }

    fn names(list: &Rc<TrackedList<Item>>) -> Vec<&'static str> {
        list.iter().map(|item| item.name).collect()
    }

    #[test]
    fn push_back_preserves_insertion_order() {
        let list = TrackedList::new();
        for name in ["a", "b", "c"] {
            list.push_back(Item::new(name)).unwrap();
        }
        assert_eq!(names(&list), vec!["a", "b", "c"]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn push_front_and_insert_before() {
        let list = TrackedList::new();
        let b = list.push_back(Item::new("b")).unwrap();
        list.push_front(Item::new("a")).unwrap();
        list.insert_before(b, Item::new("between")).unwrap();
        assert_eq!(names(&list), vec!["a", "between", "b"]);
    }

    #[test]
    fn soft_delete_hides_and_preserves_order() {
        let list = TrackedList::new();
        let items: Vec<_> = ["t1", "t2", "t3", "t4", "t5"]
            .into_iter()
            .map(Item::new)
            .collect();
        for item in &items {
            list.push_back(item.clone()).unwrap();
        }

        items[2].soft_delete().unwrap();
        assert_eq!(names(&list), vec!["t1", "t2", "t4", "t5"]);
        assert_eq!(list.len(), 4);
        assert_eq!(list.total_len(), 5);

        items[2].restore().unwrap();
        assert_eq!(names(&list), vec!["t1", "t2", "t3", "t4", "t5"]);
        assert_eq!(list.len(), 5);
    }

    #[test]
    fn remove_deregisters_the_list() {
        let list = TrackedList::new();
        let item = Item::new("a");
        let handle = list.push_back(item.clone()).unwrap();
        assert_eq!(item.tracker().holder_count(), 1);

        let removed = list.remove(handle).unwrap();
        assert_eq!(removed.name, "a");
        assert_eq!(item.tracker().holder_count(), 0);
        assert!(list.is_empty());

        // The handle is dead now.
        assert!(matches!(
            list.remove(handle),
            Err(LifecycleError::StaleHandle)
        ));
    }

    #[test]
    fn hard_delete_unlinks_without_deregistering_each_holder() {
        let list = TrackedList::new();
        let item = Item::new("a");
        list.push_back(item.clone()).unwrap();

        item.delete().unwrap();
        assert!(list.is_empty());
        assert_eq!(list.total_len(), 0);
        assert_eq!(item.tracker().state(), LifecycleState::Deleted);
    }

    #[test]
    fn recycled_slot_invalidates_old_handles() {
        let list = TrackedList::new();
        let first = Item::new("first");
        let handle = list.push_back(first.clone()).unwrap();
        first.delete().unwrap();

        // The replacement reuses the vacated slot under a new generation.
        let replacement = list.push_back(Item::new("second")).unwrap();
        assert_ne!(handle, replacement);
        assert!(list.get(handle).is_none());
        assert_eq!(list.get(replacement).unwrap().name, "second");
    }

    #[test]
    fn get_hides_soft_deleted_slots() {
        let list = TrackedList::new();
        let item = Item::new("a");
        let handle = list.push_back(item.clone()).unwrap();

        assert_eq!(list.get(handle).unwrap().name, "a");
        item.soft_delete().unwrap();
        assert!(list.get(handle).is_none());
        assert!(list.handle_to_object(handle).is_none());
        item.restore().unwrap();
        assert_eq!(list.get(handle).unwrap().name, "a");
    }

    #[test]
    fn duplicate_insert_rolls_back_the_slot() {
        let list = TrackedList::new();
        let item = Item::new("a");
        list.push_back(item.clone()).unwrap();

        // Same holder twice is a duplicate registration; the list must not
        // keep the half-inserted slot.
        assert_eq!(
            list.push_back(item.clone()),
            Err(LifecycleError::DuplicateRegistration)
        );
        assert_eq!(list.len(), 1);
        assert_eq!(list.total_len(), 1);
        assert_eq!(item.tracker().holder_count(), 1);
    }

    #[test]
    fn object_shared_between_two_lists() {
        let left = TrackedList::new();
        let right = TrackedList::new();
        let shared = Item::new("shared");
        left.push_back(shared.clone()).unwrap();
        right.push_back(shared.clone()).unwrap();
        right.push_back(Item::new("other")).unwrap();

        shared.soft_delete().unwrap();
        assert!(names(&left).is_empty());
        assert_eq!(names(&right), vec!["other"]);

        shared.restore().unwrap();
        assert_eq!(names(&left), vec!["shared"]);
        assert_eq!(names(&right), vec!["shared", "other"]);
    }

    #[test]
    fn insert_before_stale_anchor_fails() {
        let list = TrackedList::new();
        let item = Item::new("a");
        let handle = list.push_back(item.clone()).unwrap();
        list.remove(handle).unwrap();

        assert_eq!(
            list.insert_before(handle, Item::new("b")),
            Err(LifecycleError::StaleHandle)
        );
    }

    #[test]
    fn debug_impl() {
        let list = TrackedList::<Item>::new();
        let debug = format!("{list:?}");
        assert!(debug.contains("TrackedList"));
        assert!(debug.contains("visible"));
    }
}

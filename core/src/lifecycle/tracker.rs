//! Reference tracking engine for multi-holder objects.
//!
//! [`ReferenceTracker`] lets an object be known to many holders at once and
//! broadcasts its lifecycle transitions to all of them, without any holder
//! knowing about the others. Trackables own one tracker each and delegate
//! the [`ReferenceTrackable`](super::ReferenceTrackable) operations to it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Weak;

use super::capability::{HolderId, LifecycleError, LifecycleResult, ReferenceHolder};
use super::handle::Handle;

/// Lifecycle state of a tracked object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Visible in every holder that references it.
    Live,
    /// Soft-deleted: hidden in every holder, registrations retained.
    Hidden,
    /// Permanently deleted. Terminal.
    Deleted,
}

struct Registration {
    holder: Weak<dyn ReferenceHolder>,
    handle: Handle,
}

struct TrackerCore {
    /// Registrations in registration order. Fan-out follows this order.
    refs: Vec<Registration>,
    /// Holder identity → position in `refs`.
    by_holder: HashMap<HolderId, usize>,
    state: LifecycleState,
}

/// Records which holders reference one object and fans lifecycle events
/// out to them.
///
/// The tracker keeps registrations in the order holders were added and
/// notifies them in exactly that order on every transition. A holder is
/// keyed by identity (its allocation address), not value equality, so
/// removal is a hash lookup rather than a scan.
///
/// All operations take `&self`; the tracker is single-threaded and uses
/// interior mutability so that trackables can be shared behind `Rc`.
pub struct ReferenceTracker {
    core: RefCell<TrackerCore>,
}

impl ReferenceTracker {
    /// Creates a tracker with no registrations, in the live state.
    pub fn new() -> Self {
        Self {
            core: RefCell::new(TrackerCore {
                refs: Vec::new(),
                by_holder: HashMap::new(),
                state: LifecycleState::Live,
            }),
        }
    }

    /// Records a new (holder, handle) registration.
    ///
    /// Fails with [`LifecycleError::DuplicateRegistration`] if the same
    /// holder instance is already registered, and with
    /// [`LifecycleError::Deleted`] / [`LifecycleError::HiddenRegistration`]
    /// if the object is no longer in the live state.
    pub fn added_to(&self, holder: Weak<dyn ReferenceHolder>, handle: Handle) -> LifecycleResult {
        let mut core = self.core.borrow_mut();
        match core.state {
            LifecycleState::Live => {}
            LifecycleState::Hidden => return Err(LifecycleError::HiddenRegistration),
            LifecycleState::Deleted => return Err(LifecycleError::Deleted),
        }
        let id = HolderId::of_weak(&holder);
        if core.by_holder.contains_key(&id) {
            return Err(LifecycleError::DuplicateRegistration);
        }
        let position = core.refs.len();
        core.by_holder.insert(id, position);
        core.refs.push(Registration { holder, handle });
        Ok(())
    }

    /// Forgets the registration for `holder`.
    ///
    /// Fails with [`LifecycleError::UnknownHolder`] if the holder was never
    /// registered. The relative order of the remaining registrations is
    /// preserved.
    pub fn removed_from(&self, holder: HolderId) -> LifecycleResult {
        let mut core = self.core.borrow_mut();
        let position = core
            .by_holder
            .remove(&holder)
            .ok_or(LifecycleError::UnknownHolder)?;
        core.refs.remove(position);
        for index in core.by_holder.values_mut() {
            if *index > position {
                *index -= 1;
            }
        }
        Ok(())
    }

    /// Hides this object in every registered holder, in registration order.
    ///
    /// Registrations are retained; [`restore`](Self::restore) reverses the
    /// transition.
    pub fn soft_delete(&self) -> LifecycleResult {
        self.require_state(LifecycleState::Live, LifecycleError::AlreadyHidden)?;
        for (holder, handle) in self.snapshot() {
            self.upgrade(&holder)?.referenced_object_soft_deleted(handle)?;
        }
        self.core.borrow_mut().state = LifecycleState::Hidden;
        Ok(())
    }

    /// Reverses a prior [`soft_delete`](Self::soft_delete), notifying
    /// holders in the same registration order.
    pub fn restore(&self) -> LifecycleResult {
        self.require_state(LifecycleState::Hidden, LifecycleError::NotHidden)?;
        for (holder, handle) in self.snapshot() {
            self.upgrade(&holder)?.restore_soft_deleted_object(handle)?;
        }
        self.core.borrow_mut().state = LifecycleState::Live;
        Ok(())
    }

    /// Permanently removes this object from every registered holder.
    ///
    /// Terminal: afterwards every lifecycle operation on this tracker fails
    /// with [`LifecycleError::Deleted`]. Holders physically remove their
    /// slots during the fan-out; the tracker clears its own registration
    /// list once the fan-out completes.
    pub fn delete(&self) -> LifecycleResult {
        if self.state() == LifecycleState::Deleted {
            return Err(LifecycleError::Deleted);
        }
        let refs = self.snapshot();
        log::trace!("hard delete fan-out to {} holders", refs.len());
        for (holder, handle) in refs {
            self.upgrade(&holder)?.referenced_object_deleted(handle)?;
        }
        let mut core = self.core.borrow_mut();
        core.refs.clear();
        core.by_holder.clear();
        core.state = LifecycleState::Deleted;
        Ok(())
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.core.borrow().state
    }

    /// Returns the number of holders currently registered.
    pub fn holder_count(&self) -> usize {
        self.core.borrow().refs.len()
    }

    /// Returns the handle issued by `holder`, if it is registered.
    pub fn handle_in(&self, holder: HolderId) -> Option<Handle> {
        let core = self.core.borrow();
        let position = *core.by_holder.get(&holder)?;
        Some(core.refs[position].handle)
    }

    fn require_state(&self, wanted: LifecycleState, mismatch: LifecycleError) -> LifecycleResult {
        match self.state() {
            LifecycleState::Deleted => Err(LifecycleError::Deleted),
            state if state == wanted => Ok(()),
            _ => Err(mismatch),
        }
    }

    /// Copies the registration list out so fan-out runs without holding the
    /// tracker borrow. Holder callbacks touch their own state, never this
    /// tracker's registration list.
    fn snapshot(&self) -> Vec<(Weak<dyn ReferenceHolder>, Handle)> {
        self.core
            .borrow()
            .refs
            .iter()
            .map(|r| (r.holder.clone(), r.handle))
            .collect()
    }

    fn upgrade(
        &self,
        holder: &Weak<dyn ReferenceHolder>,
    ) -> LifecycleResult<std::rc::Rc<dyn ReferenceHolder>> {
        holder.upgrade().ok_or(LifecycleError::HolderDropped)
    }
}

impl Default for ReferenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReferenceTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core.borrow();
        f.debug_struct("ReferenceTracker")
            .field("holders", &core.refs.len())
            .field("state", &core.state)
            .finish()
    }
}

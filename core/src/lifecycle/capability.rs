//! Holder and trackable capabilities of the lifecycle protocol.
//!
//! This module defines the two sides of the object-lifecycle contract:
//!
//! - [`ReferenceHolder`] — a container that stores trackable objects and
//!   reacts to their lifecycle transitions
//! - [`ReferenceTrackable`] — an object that can live inside holders and
//!   broadcasts its lifecycle transitions to all of them
//! - [`LifecycleError`] / [`LifecycleResult`] — error handling for protocol
//!   violations and capability mismatches
//!
//! Trackables implement the protocol by composition: they own a
//! [`ReferenceTracker`](super::ReferenceTracker) and return it from
//! [`ReferenceTrackable::tracker`]; the lifecycle operations are provided
//! methods that delegate to it.

use std::rc::{Rc, Weak};

use super::handle::Handle;
use super::tracker::ReferenceTracker;

/// Error type for lifecycle protocol failures.
///
/// Every variant indicates either a bug in calling code (protocol
/// violation) or a capability mismatch between a trackable and one of its
/// holders. None of these occur under correct usage; they are surfaced
/// immediately rather than silently ignored, because a silent no-op would
/// desynchronize a tracker's bookkeeping from its holders' real state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// The holder is already registered for this object.
    #[error("holder is already registered for this object")]
    DuplicateRegistration,
    /// The holder was never registered for this object.
    #[error("holder is not registered for this object")]
    UnknownHolder,
    /// The object is already soft-deleted.
    #[error("object is already soft-deleted")]
    AlreadyHidden,
    /// The object is not soft-deleted.
    #[error("object is not soft-deleted")]
    NotHidden,
    /// The object has been permanently deleted; no further lifecycle
    /// operations are valid.
    #[error("object has been permanently deleted")]
    Deleted,
    /// A registered holder was dropped without deregistering first.
    #[error("holder was dropped while still registered")]
    HolderDropped,
    /// The handle does not name a live slot in this holder.
    #[error("stale or foreign handle")]
    StaleHandle,
    /// The object cannot be registered while soft-deleted.
    #[error("cannot register a soft-deleted object")]
    HiddenRegistration,
    /// The object is already a member of this set.
    #[error("object is already present in this set")]
    AlreadyPresent,
    /// The object is not a member of this set.
    #[error("object is not present in this set")]
    NotPresent,
    /// The holder does not support this lifecycle operation.
    #[error("holder does not support {0}")]
    Unsupported(&'static str),
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T = ()> = Result<T, LifecycleError>;

/// Identity of a holder, used to key registrations.
///
/// Holders are compared by identity, not by value equality: two distinct
/// lists with identical contents are different holders. The identity is
/// the address of the holder allocation, which is stable for the lifetime
/// of the `Rc` that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HolderId(*const ());

impl HolderId {
    /// Returns the identity of a holder reference.
    pub fn of<H: ReferenceHolder + ?Sized>(holder: &H) -> Self {
        Self(holder as *const H as *const ())
    }

    pub(crate) fn of_weak(holder: &Weak<dyn ReferenceHolder>) -> Self {
        Self(Weak::as_ptr(holder) as *const ())
    }
}

/// A container that stores trackable objects.
///
/// Holders receive lifecycle notifications keyed by the [`Handle`] they
/// issued when the object was added. Soft delete and restore have default
/// implementations that report the capability as unsupported — a holder
/// with no notion of hiding (for example one that stores at most a single
/// reference) gets the correct capability-mismatch failure without writing
/// any code, and a holder that does support hiding opts in by overriding
/// both methods.
///
/// # Contract
///
/// Every handle a holder has issued stays valid until the holder
/// physically removes the underlying slot. A trackable calls
/// [`ReferenceTrackable::removed_from`] *before* its holder forgets a
/// handle, so a holder is never notified about a slot it no longer owns.
pub trait ReferenceHolder {
    /// Hides the slot named by `handle` without removing it.
    fn referenced_object_soft_deleted(&self, _handle: Handle) -> LifecycleResult {
        Err(LifecycleError::Unsupported("soft delete"))
    }

    /// Makes a previously hidden slot visible again.
    fn restore_soft_deleted_object(&self, _handle: Handle) -> LifecycleResult {
        Err(LifecycleError::Unsupported("restore"))
    }

    /// Physically removes the slot named by `handle`.
    ///
    /// This is invoked while the object's tracker is fanning out a hard
    /// delete; the holder must *not* call
    /// [`ReferenceTrackable::removed_from`] back — the tracker clears its
    /// own bookkeeping once the fan-out completes.
    fn referenced_object_deleted(&self, handle: Handle) -> LifecycleResult;

    /// Resolves a handle to the object stored in that slot.
    ///
    /// Returns `None` for stale handles and for hidden slots — a hidden
    /// slot's handle is never exposed as live.
    fn handle_to_object(&self, handle: Handle) -> Option<Rc<dyn ReferenceTrackable>>;
}

/// An object that can be registered into multiple holders simultaneously.
///
/// Implementors store a [`ReferenceTracker`] and return it from
/// [`tracker`](Self::tracker); all five lifecycle operations are provided
/// methods delegating to it. The tracker is the authoritative record of
/// which holders currently reference the object.
///
/// # Example
///
/// ```
/// use windrose_core::lifecycle::{ReferenceTrackable, ReferenceTracker};
///
/// struct Vertex {
///     x: f32,
///     y: f32,
///     tracker: ReferenceTracker,
/// }
///
/// impl ReferenceTrackable for Vertex {
///     fn tracker(&self) -> &ReferenceTracker {
///         &self.tracker
///     }
/// }
/// ```
pub trait ReferenceTrackable: 'static {
    /// Returns the tracker recording who references this object.
    fn tracker(&self) -> &ReferenceTracker;

    /// Records that `holder` now references this object under `handle`.
    ///
    /// Called by the holder during insertion. Registering the same holder
    /// twice is a protocol violation.
    fn added_to(&self, holder: Weak<dyn ReferenceHolder>, handle: Handle) -> LifecycleResult {
        self.tracker().added_to(holder, handle)
    }

    /// Forgets the registration for `holder`.
    ///
    /// Called by the holder during explicit removal, before the holder
    /// forgets the handle it issued.
    fn removed_from(&self, holder: HolderId) -> LifecycleResult {
        self.tracker().removed_from(holder)
    }

    /// Hides this object in every holder that references it.
    ///
    /// Registrations are retained so [`restore`](Self::restore) can bring
    /// the object back exactly as it was.
    fn soft_delete(&self) -> LifecycleResult {
        self.tracker().soft_delete()
    }

    /// Reverses a prior [`soft_delete`](Self::soft_delete) in every holder.
    fn restore(&self) -> LifecycleResult {
        self.tracker().restore()
    }

    /// Permanently removes this object from every holder. Terminal.
    fn delete(&self) -> LifecycleResult {
        self.tracker().delete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare;

    impl ReferenceHolder for Bare {
        fn referenced_object_deleted(&self, _handle: Handle) -> LifecycleResult {
            Ok(())
        }

        fn handle_to_object(&self, _handle: Handle) -> Option<Rc<dyn ReferenceTrackable>> {
            None
        }
    }

    #[test]
    fn soft_delete_unsupported_by_default() {
        let holder = Bare;
        assert_eq!(
            holder.referenced_object_soft_deleted(Handle::new(0, 0)),
            Err(LifecycleError::Unsupported("soft delete"))
        );
        assert_eq!(
            holder.restore_soft_deleted_object(Handle::new(0, 0)),
            Err(LifecycleError::Unsupported("restore"))
        );
    }

    #[test]
    fn holder_id_is_per_instance() {
        let a = Bare;
        let b = Bare;
        assert_eq!(HolderId::of(&a), HolderId::of(&a));
        assert_ne!(HolderId::of(&a), HolderId::of(&b));
    }

    #[test]
    fn holder_id_agrees_between_rc_and_reference() {
        let rc: Rc<Bare> = Rc::new(Bare);
        let via_ref = HolderId::of(&*rc);
        let weak = Rc::downgrade(&rc);
        let weak: Weak<dyn ReferenceHolder> = weak;
        assert_eq!(via_ref, HolderId::of_weak(&weak));
    }

    #[test]
    fn error_display() {
        assert_eq!(
            LifecycleError::DuplicateRegistration.to_string(),
            "holder is already registered for this object"
        );
        assert_eq!(
            LifecycleError::Unsupported("restore").to_string(),
            "holder does not support restore"
        );
        assert_eq!(
            LifecycleError::StaleHandle.to_string(),
            "stale or foreign handle"
        );
    }
}

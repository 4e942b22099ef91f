//! Invalidate-on-destroy handles to externally owned objects.
//!
//! An evaluation may suspend while holding references to objects it does not
//! own (the client connection, an authentication request, the rule set
//! under evaluation, an external-helper entry), and any of those may be
//! destroyed before the evaluation resumes. [`Owned<T>`] registers such an
//! object; [`Handle<T>`] is the token other parties hold. Dropping the
//! `Owned` clears the shared slot, so every outstanding handle observes
//! `None` from that point on instead of a dangling reference.
//!
//! Holders must re-resolve the handle on every use. A borrowed `Ref` must
//! never be cached across a suspension point.
//!
//! Single-threaded by design: slots are `Rc<RefCell<..>>`, not atomics or
//! locks.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

type Slot<T> = Rc<RefCell<Option<T>>>;

/// Registration of an object whose lifetime this crate does not control.
///
/// The registering owner keeps the `Owned` alongside the object's real
/// storage and drops it when the object goes away, invalidating every
/// [`Handle`] minted from it.
pub struct Owned<T> {
    slot: Slot<T>,
}

impl<T> Owned<T> {
    /// Register an object, taking ownership of its storage.
    pub fn new(value: T) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Some(value))),
        }
    }

    /// Mint a handle resolving to the object for as long as it lives.
    pub fn handle(&self) -> Handle<T> {
        Handle {
            slot: Rc::clone(&self.slot),
        }
    }

    /// Destroy the object now, invalidating every outstanding handle.
    ///
    /// Equivalent to dropping the `Owned`; provided for call sites where the
    /// invalidation is the point.
    pub fn invalidate(self) {}
}

impl<T> Drop for Owned<T> {
    fn drop(&mut self) {
        self.slot.borrow_mut().take();
    }
}

impl<T: fmt::Debug> fmt::Debug for Owned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Owned").field(&self.slot.borrow()).finish()
    }
}

/// Token resolving to an externally owned object until its owner drops it.
///
/// Never extends the object's lifetime; a dead handle resolves to `None`.
pub struct Handle<T> {
    slot: Slot<T>,
}

impl<T> Handle<T> {
    /// Resolve the handle, borrowing the object if it is still alive.
    pub fn get(&self) -> Option<Ref<'_, T>> {
        Ref::filter_map(self.slot.borrow(), Option::as_ref).ok()
    }

    /// Resolve the handle for mutation, if the object is still alive.
    pub fn get_mut(&self) -> Option<RefMut<'_, T>> {
        RefMut::filter_map(self.slot.borrow_mut(), Option::as_mut).ok()
    }

    /// Whether the owner has not yet destroyed the object.
    pub fn is_live(&self) -> bool {
        self.slot.borrow().is_some()
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_live() {
            f.write_str("Handle(live)")
        } else {
            f.write_str("Handle(dead)")
        }
    }
}

//! Host-side handle wrapper with early destruction.
//!
//! A [`ManagedHandle`] is what host code holds on to. It shares one
//! [`ExternalSlot`] between clones and lets the host destroy the slot before
//! collection, while making sure nothing is using it at that moment:
//!
//! - [`acquire`](ManagedHandle::acquire) hands out a [`SlotGuard`]; while any
//!   guard is alive a requested destruction is only recorded.
//! - [`destroy`](ManagedHandle::destroy) releases the slot as soon as the last
//!   guard is dropped, then runs the registered callbacks.
//! - [`requires`](ManagedHandle::requires) adds a dependency edge between the
//!   underlying handles.
//!
//! The native resource itself is still governed by the handle graph: a slot
//! destroyed early only gives up its owner.

use std::cell::{Cell, Ref, RefCell};
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::rc::Rc;

use crate::error::{HandleError, Result};
use crate::handle::HandleId;
use crate::slot::ExternalSlot;

/// Callback run after a managed handle has been destroyed.
pub type DestroyCallback = Box<dyn FnOnce(&ManagedHandle)>;

struct State {
    slot: RefCell<Option<ExternalSlot>>,
    name: String,
    id: HandleId,
    use_count: Cell<usize>,
    destroy_requested: Cell<bool>,
    valid: Cell<bool>,
    callbacks: RefCell<Vec<DestroyCallback>>,
}

/// Shared, host-facing owner of an [`ExternalSlot`].
///
/// Clones refer to the same slot; equality and hashing follow that identity.
#[derive(Clone)]
pub struct ManagedHandle {
    state: Rc<State>,
}

impl ManagedHandle {
    pub fn new(slot: ExternalSlot) -> Self {
        let name = slot.name().to_string();
        let id = slot.handle_id();
        let valid = !slot.is_released();

        Self {
            state: Rc::new(State {
                slot: RefCell::new(Some(slot)),
                name,
                id,
                use_count: Cell::new(0),
                destroy_requested: Cell::new(false),
                valid: Cell::new(valid),
                callbacks: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Name of the managed slot.
    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Id of the handle owned by the managed slot.
    pub fn pointer(&self) -> HandleId {
        self.state.id
    }

    /// `false` once the slot has been destroyed.
    pub fn is_valid(&self) -> bool {
        self.state.valid.get()
    }

    /// Number of outstanding [`SlotGuard`]s.
    pub fn use_count(&self) -> usize {
        self.state.use_count.get()
    }

    /// Borrow the slot for the lifetime of the returned guard.
    ///
    /// A destruction requested while the guard is alive is carried out when
    /// the last guard is dropped.
    pub fn acquire(&self) -> Result<SlotGuard<'_>> {
        if !self.is_valid() {
            return Err(HandleError::InvalidHandle(
                "tried to use a handle that has been destroyed",
            ));
        }

        let slot = Ref::filter_map(self.state.slot.borrow(), Option::as_ref).map_err(|_| {
            HandleError::InvalidHandle("tried to use a handle that has been destroyed")
        })?;

        Ok(SlotGuard {
            slot,
            _use: UseToken::new(self),
        })
    }

    /// Destroy the slot as soon as no guard is using it.
    ///
    /// `then` is called after destruction. Callbacks run most recent first.
    pub fn destroy(&self, then: Option<DestroyCallback>) -> Result<()> {
        if !self.is_valid() {
            return Err(HandleError::InvalidHandle(
                "asked to destroy handle, but it was already destroyed",
            ));
        }

        if let Some(callback) = then {
            self.state.callbacks.borrow_mut().push(callback);
        }
        self.state.destroy_requested.set(true);

        if self.use_count() == 0 {
            self.destroy_now();
        } else {
            tracing::trace!(
                "Deferring destruction of `{}` ({} users)",
                self.name(),
                self.use_count()
            );
        }

        Ok(())
    }

    /// Require `other`'s resource to outlive this one.
    ///
    /// If `other` has already been destroyed the dependency can no longer be
    /// honored, so this handle is destroyed instead.
    pub fn requires(&self, other: &ManagedHandle) -> Result<()> {
        if !self.is_valid() {
            return Err(HandleError::InvalidHandle(
                "cannot require a new handle if already destroyed",
            ));
        }

        if !other.is_valid() {
            tracing::debug!(
                "`{}` required destroyed `{}`, destroying it",
                self.name(),
                other.name()
            );
            return self.destroy(None);
        }

        let dependent = self.state.slot.borrow();
        let dependency = other.state.slot.borrow();

        match (dependent.as_ref(), dependency.as_ref()) {
            (Some(dependent), Some(dependency)) => dependent.add_dependency(dependency),
            _ => Err(HandleError::InvalidHandle(
                "cannot require a handle that has been destroyed",
            )),
        }
    }

    fn destroy_now(&self) {
        debug_assert_eq!(self.use_count(), 0);
        debug_assert!(self.state.destroy_requested.get());

        self.state.valid.set(false);

        // Take the slot out before finalizing, so destructors that reach back
        // into this handle see it as destroyed rather than borrowed.
        let slot = self.state.slot.borrow_mut().take();
        drop(slot);
        tracing::trace!("Destroyed managed handle `{}`", self.name());

        loop {
            let callback = self.state.callbacks.borrow_mut().pop();
            match callback {
                Some(callback) => callback(self),
                None => break,
            }
        }
    }

    fn return_slot(&self) {
        let count = self.use_count();
        debug_assert!(count > 0);
        self.state.use_count.set(count.saturating_sub(1));

        if count == 1 && self.state.destroy_requested.get() && self.is_valid() {
            self.destroy_now();
        }
    }
}

impl PartialEq for ManagedHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl Eq for ManagedHandle {}

impl Hash for ManagedHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Rc::as_ptr(&self.state), state);
    }
}

impl std::fmt::Debug for ManagedHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedHandle")
            .field("name", &self.name())
            .field("pointer", &self.pointer())
            .field("valid", &self.is_valid())
            .field("use_count", &self.use_count())
            .finish()
    }
}

/// RAII use of a managed slot.
///
/// Field order matters: the slot borrow is released before the use token
/// runs a pending destruction.
pub struct SlotGuard<'a> {
    slot: Ref<'a, ExternalSlot>,
    _use: UseToken<'a>,
}

impl Deref for SlotGuard<'_> {
    type Target = ExternalSlot;

    fn deref(&self) -> &Self::Target {
        &self.slot
    }
}

impl std::fmt::Debug for SlotGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotGuard")
            .field("slot", &*self.slot)
            .finish()
    }
}

struct UseToken<'a> {
    owner: &'a ManagedHandle,
}

impl<'a> UseToken<'a> {
    fn new(owner: &'a ManagedHandle) -> Self {
        owner.state.use_count.set(owner.use_count() + 1);
        Self { owner }
    }
}

impl Drop for UseToken<'_> {
    fn drop(&mut self) {
        self.owner.return_slot();
    }
}

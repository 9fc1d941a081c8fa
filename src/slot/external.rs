//! Binding a [`Handle`] into a host capsule.

use std::borrow::Cow;

use super::Capsule;
use crate::error::{HandleError, Result};
use crate::handle::{Handle, HandleId};

/// A capsule that owns exactly one [`Handle`].
///
/// The capsule's finalizer is a single release of that handle, so the host
/// dropping the slot gives up one owner. Whether the native resource is
/// destroyed at that point is decided by the handle's dependents.
pub struct ExternalSlot {
    capsule: Capsule,
    id: HandleId,
}

/// Create a handle around `resource` and box it in a slot tagged `name`.
///
/// If the handle cannot be created the error is returned and no slot exists.
pub fn wrap<T: 'static>(
    resource: T,
    name: impl Into<Cow<'static, str>>,
    destructor: impl FnOnce(T) + 'static,
) -> Result<ExternalSlot> {
    let handle = Handle::new(resource, destructor)?;
    Ok(ExternalSlot::from_handle(handle, name))
}

impl ExternalSlot {
    /// Box an existing owner. The slot takes over that owner's release.
    pub fn from_handle(handle: Handle, name: impl Into<Cow<'static, str>>) -> Self {
        let id = handle.id();

        Self {
            capsule: Capsule::new(handle, name, |handle: Handle| {
                tracing::trace!("Slot finalizer releasing {}", handle.id());
                handle.release();
            }),
            id,
        }
    }

    pub fn name(&self) -> &str {
        self.capsule.name()
    }

    /// Id of the handle this slot was created with.
    pub fn handle_id(&self) -> HandleId {
        self.id
    }

    /// Borrow the resource if `expected_name` matches the slot's name.
    ///
    /// Does not change the handle's reference count.
    pub fn unwrap<T: 'static>(&self, expected_name: &str) -> Result<&T> {
        let handle = self.capsule.get_pointer::<Handle>(expected_name)?;

        handle
            .resource::<T>()
            .ok_or_else(|| HandleError::TypeMismatch {
                name: Cow::Owned(self.name().to_string()),
            })
    }

    /// The owned handle, or `None` once the slot has been released.
    pub fn handle(&self) -> Option<&Handle> {
        self.capsule.get::<Handle>()
    }

    /// Make this slot's handle depend on `dependency`'s handle.
    pub fn add_dependency(&self, dependency: &ExternalSlot) -> Result<()> {
        let dependent = self
            .handle()
            .ok_or(HandleError::InvalidHandle("dependent slot has been released"))?;
        let dependency = dependency
            .handle()
            .ok_or(HandleError::InvalidHandle("dependency slot has been released"))?;

        dependent.add_dependency(dependency)
    }

    /// Release the owned handle now instead of at finalization.
    ///
    /// Later finalization becomes a no-op. Returns `false` if the slot had
    /// already been released.
    pub fn release(&mut self) -> bool {
        self.capsule.destroy()
    }

    pub fn is_released(&self) -> bool {
        self.capsule.is_destroyed()
    }
}

impl std::fmt::Debug for ExternalSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalSlot")
            .field("name", &self.name())
            .field("handle", &self.handle())
            .finish()
    }
}

//! The handle node, its dependency edges and the release cascade.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::accounting;
use super::resource::NativeResource;
use crate::error::{HandleError, Result};

/// Identifier assigned to a handle at creation, unique per thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandleId(pub(crate) u64);

impl HandleId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "handle#{}", self.0)
    }
}

struct Node {
    id: HandleId,
    /// `None` once the destructor has run.
    resource: Option<NativeResource>,
    /// Empty vectors never hold storage, so length and storage stay co-null.
    dependencies: RefCell<Vec<Handle>>,
}

impl Node {
    /// Fire the destructor and hand back the dependencies, leaving the node inert.
    fn tear_down(&mut self) -> Vec<Handle> {
        let dependencies = std::mem::take(self.dependencies.get_mut());
        debug_assert!(!dependencies.is_empty() || dependencies.capacity() == 0);

        if let Some(resource) = self.resource.take() {
            tracing::trace!("Destroying {} ({})", self.id, resource.type_name());
            resource.destroy();
            accounting::record_destroyed();
        }

        dependencies
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        // Nodes reached through a cascade were already torn down in place.
        if self.resource.is_none() {
            return;
        }

        let root = self.id;
        let mut pending = self.tear_down();
        if pending.is_empty() {
            return;
        }

        // Depth-first with an explicit stack instead of recursion: push
        // siblings in reverse so they pop in stored order.
        pending.reverse();
        let mut destroyed = 1usize;
        let mut released = 0usize;

        while let Some(dependency) = pending.pop() {
            released += 1;

            // `into_inner` drops this owner and yields the node only if it
            // was the last one.
            let Some(mut node) = Rc::into_inner(dependency.inner) else {
                continue;
            };

            destroyed += 1;
            let mut next = node.tear_down();
            next.reverse();
            pending.append(&mut next);
        }

        tracing::debug!(
            "Released {}: {} dependency edges dropped, {} handles destroyed",
            root,
            released,
            destroyed
        );
    }
}

/// An owning, reference-counted handle to a native resource.
///
/// Each `Handle` value is one owner. Cloning adds an owner, dropping (or
/// [`release`](Handle::release)) removes one. When the last owner goes away:
///
/// 1. the destructor runs with the resource, exactly once;
/// 2. every dependency is released in the order it was added, each
///    cascading the same way before the next sibling is touched;
/// 3. the handle's storage is freed.
///
/// All of this completes before the releasing call returns.
///
/// Handles are `!Send`: the reference count is only ever touched on the
/// thread that created the handle.
pub struct Handle {
    inner: Rc<Node>,
}

impl Handle {
    /// Take ownership of `resource`, to be torn down by `destructor`.
    ///
    /// The new handle has a reference count of 1 and no dependencies.
    ///
    /// Fails with [`HandleError::AllocationFailure`] when the thread's
    /// live-handle limit is reached. In that case no handle exists, the
    /// destructor is never called, and `resource` is dropped as a plain value.
    pub fn new<T: 'static>(resource: T, destructor: impl FnOnce(T) + 'static) -> Result<Self> {
        let id = accounting::reserve_handle()?;
        let resource = NativeResource::new(resource, destructor);
        tracing::trace!("Created {} ({})", id, resource.type_name());

        Ok(Self {
            inner: Rc::new(Node {
                id,
                resource: Some(resource),
                dependencies: RefCell::new(Vec::new()),
            }),
        })
    }

    pub fn id(&self) -> HandleId {
        self.inner.id
    }

    /// Number of live owners (the creator, clones, and dependent handles).
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    /// Record that `self` must not outlive `dependency`.
    ///
    /// `dependency` gains one owner, held by `self` until `self` is
    /// destroyed. Edges are stored in call order and the same dependency
    /// may be added more than once.
    ///
    /// On error nothing changes: the dependency slot is reserved before the
    /// reference count is incremented.
    pub fn add_dependency(&self, dependency: &Handle) -> Result<()> {
        if self.ptr_eq(dependency) {
            return Err(HandleError::InvalidHandle("a handle cannot depend on itself"));
        }

        let mut dependencies = self.inner.dependencies.borrow_mut();
        let limits = accounting::current_limits();

        if !limits.allows_dependency(dependencies.len()) {
            tracing::warn!(
                "{} already holds {} dependencies (max {})",
                self.id(),
                dependencies.len(),
                limits.max_dependencies
            );
            return Err(HandleError::AllocationFailure {
                what: "dependency slot",
            });
        }

        dependencies
            .try_reserve(1)
            .map_err(|_| HandleError::AllocationFailure {
                what: "dependency slot",
            })?;

        dependencies.push(dependency.clone());
        tracing::trace!("{} now depends on {}", self.id(), dependency.id());

        Ok(())
    }

    /// Ids of this handle's dependencies, in stored order.
    pub fn dependencies(&self) -> Vec<HandleId> {
        self.inner
            .dependencies
            .borrow()
            .iter()
            .map(Handle::id)
            .collect()
    }

    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.borrow().len()
    }

    /// Borrow the resource as `T`, or `None` if it has another type.
    pub fn resource<T: 'static>(&self) -> Option<&T> {
        self.inner.resource.as_ref().and_then(|r| r.get::<T>())
    }

    /// Borrow the resource without naming its type.
    pub fn resource_any(&self) -> Option<&dyn Any> {
        self.inner.resource.as_ref().map(|r| r.as_any())
    }

    /// Type name of the resource, as given by `std::any::type_name`.
    pub fn resource_type(&self) -> &'static str {
        self.inner
            .resource
            .as_ref()
            .map_or("<destroyed>", |r| r.type_name())
    }

    /// Give up this owner. Identical to dropping the handle.
    pub fn release(self) {
        drop(self);
    }

    /// Non-owning reference that does not keep the resource alive.
    pub fn downgrade(&self) -> WeakHandle {
        WeakHandle {
            id: self.id(),
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether both values are owners of the same handle.
    pub fn ptr_eq(&self, other: &Handle) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Clone for Handle {
    /// Add an owner. The resource stays alive until every owner is released.
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id())
            .field("ref_count", &self.ref_count())
            .field("resource", &self.resource_type())
            .field("dependencies", &self.dependencies())
            .finish()
    }
}

/// A non-owning reference to a [`Handle`].
#[derive(Clone)]
pub struct WeakHandle {
    id: HandleId,
    inner: Weak<Node>,
}

impl WeakHandle {
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Become an owner again, if the handle has not been destroyed.
    pub fn upgrade(&self) -> Option<Handle> {
        self.inner.upgrade().map(|inner| Handle { inner })
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl std::fmt::Debug for WeakHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakHandle")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Release an optional owner. `None` is a no-op.
pub fn release(handle: Option<Handle>) {
    if let Some(handle) = handle {
        handle.release();
    }
}

/// Borrow the resource of an optional handle. `None` yields `None`.
pub fn get_resource<T: 'static>(handle: Option<&Handle>) -> Option<&T> {
    handle.and_then(Handle::resource::<T>)
}

//! Named host box with a single-shot finalizer.

use std::borrow::Cow;

use crate::error::{HandleError, Result};
use crate::handle::NativeResource;

/// A host-managed box around one native value.
///
/// The box carries a name used to check lookups and a finalizer that
/// receives the value. The finalizer runs at most once: either on
/// [`destroy`](Capsule::destroy) or when the capsule is dropped by its host.
pub struct Capsule {
    name: Cow<'static, str>,
    content: Option<NativeResource>,
}

impl Capsule {
    pub fn new<T: 'static>(
        value: T,
        name: impl Into<Cow<'static, str>>,
        finalizer: impl FnOnce(T) + 'static,
    ) -> Self {
        let name = name.into();
        tracing::trace!("Boxed {} in capsule `{}`", std::any::type_name::<T>(), name);

        Self {
            name,
            content: Some(NativeResource::new(value, finalizer)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the finalizer has already run.
    pub fn is_destroyed(&self) -> bool {
        self.content.is_none()
    }

    /// Borrow the boxed value after checking the capsule's name.
    pub fn get_pointer<T: 'static>(&self, expected_name: &str) -> Result<&T> {
        let content = self
            .content
            .as_ref()
            .ok_or(HandleError::InvalidHandle("capsule has been destroyed"))?;

        if self.name != expected_name {
            return Err(HandleError::NameMismatch {
                expected: expected_name.to_string(),
                found: self.name.clone(),
            });
        }

        content
            .get::<T>()
            .ok_or_else(|| HandleError::TypeMismatch {
                name: self.name.clone(),
            })
    }

    /// Borrow the boxed value using the capsule's own name.
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.content.as_ref().and_then(|c| c.get::<T>())
    }

    /// Run the finalizer now instead of waiting for the host.
    ///
    /// Returns `false` if the capsule was already destroyed.
    pub fn destroy(&mut self) -> bool {
        match self.content.take() {
            Some(content) => {
                tracing::trace!("Finalizing capsule `{}`", self.name);
                content.destroy();
                true
            }
            None => false,
        }
    }
}

impl Drop for Capsule {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for Capsule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capsule")
            .field("name", &self.name)
            .field("content", &self.content)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting_capsule(name: &'static str, count: &Rc<Cell<u32>>) -> Capsule {
        let count = Rc::clone(count);
        Capsule::new(42i64, name, move |_| count.set(count.get() + 1))
    }

    #[test]
    fn test_finalizer_runs_on_drop() {
        let count = Rc::new(Cell::new(0));
        drop(counting_capsule("rcl_node_t", &count));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_destroy_then_drop_finalizes_once() {
        let count = Rc::new(Cell::new(0));
        let mut capsule = counting_capsule("rcl_node_t", &count);

        assert!(capsule.destroy());
        assert!(capsule.is_destroyed());
        assert!(!capsule.destroy());
        drop(capsule);

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_get_pointer_checks_name_and_type() {
        let count = Rc::new(Cell::new(0));
        let capsule = counting_capsule("rcl_node_t", &count);

        assert_eq!(capsule.get_pointer::<i64>("rcl_node_t"), Ok(&42));
        assert_eq!(
            capsule.get_pointer::<i64>("rcl_timer_t"),
            Err(HandleError::NameMismatch {
                expected: "rcl_timer_t".to_string(),
                found: Cow::Borrowed("rcl_node_t"),
            })
        );
        assert_eq!(
            capsule.get_pointer::<u8>("rcl_node_t"),
            Err(HandleError::TypeMismatch {
                name: Cow::Borrowed("rcl_node_t"),
            })
        );
    }

    #[test]
    fn test_get_pointer_after_destroy() {
        let count = Rc::new(Cell::new(0));
        let mut capsule = counting_capsule("rcl_node_t", &count);
        capsule.destroy();

        assert_eq!(
            capsule.get_pointer::<i64>("rcl_node_t"),
            Err(HandleError::InvalidHandle("capsule has been destroyed"))
        );
        assert!(capsule.get::<i64>().is_none());
    }
}

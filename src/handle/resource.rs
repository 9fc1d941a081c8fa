//! Type-erased native resource paired with its destructor.

use std::any::Any;

type Teardown = Box<dyn FnOnce(Box<dyn Any>)>;

/// A native value of any `'static` type and the function that tears it down.
///
/// The destructor is captured with the concrete type when the resource is
/// created, so it can be stored next to resources of other types and still be
/// called with the original value.
pub(crate) struct NativeResource {
    value: Box<dyn Any>,
    teardown: Teardown,
    type_name: &'static str,
}

impl NativeResource {
    pub(crate) fn new<T: 'static>(value: T, destructor: impl FnOnce(T) + 'static) -> Self {
        Self {
            value: Box::new(value),
            teardown: Box::new(move |value: Box<dyn Any>| {
                // The value was boxed from a `T` above, so the downcast cannot fail.
                if let Ok(value) = value.downcast::<T>() {
                    destructor(*value);
                }
            }),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub(crate) fn get<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub(crate) fn as_any(&self) -> &dyn Any {
        &*self.value
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Run the destructor, consuming the value.
    pub(crate) fn destroy(self) {
        (self.teardown)(self.value)
    }
}

impl std::fmt::Debug for NativeResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeResource")
            .field("type", &self.type_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_destroy_passes_original_value() {
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);

        let resource = NativeResource::new(vec![1u8, 2, 3], move |v| {
            *sink.borrow_mut() = Some(v);
        });

        assert_eq!(resource.get::<Vec<u8>>(), Some(&vec![1, 2, 3]));
        assert!(resource.get::<String>().is_none());
        assert!(resource.type_name().contains("Vec<u8>"));

        resource.destroy();
        assert_eq!(seen.borrow().as_deref(), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn test_drop_without_destroy_skips_destructor() {
        let fired = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&fired);

        let resource = NativeResource::new((), move |_| *flag.borrow_mut() = true);
        drop(resource);

        assert!(!*fired.borrow());
    }
}

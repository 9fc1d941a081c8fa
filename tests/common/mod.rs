#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use native_handles::Handle;

/// Installs a fmt subscriber honoring `RUST_LOG`, once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Records destructor calls in the order they happen.
#[derive(Clone, Default)]
pub struct DropLog {
    entries: Rc<RefCell<Vec<String>>>,
}

impl DropLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle whose destructor records `name`.
    pub fn handle(&self, name: &str) -> Handle {
        let entries = Rc::clone(&self.entries);
        Handle::new(name.to_string(), move |name| entries.borrow_mut().push(name))
            .expect("handle creation")
    }

    /// A destructor for `wrap` that records the resource.
    pub fn recorder(&self) -> impl FnOnce(String) + 'static {
        let entries = Rc::clone(&self.entries);
        move |name| entries.borrow_mut().push(name)
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.entries.borrow().iter().filter(|e| *e == name).count()
    }
}

//! Reference-counted ownership handles for native resources.
//!
//! A [`Handle`] owns one native resource together with the destructor that
//! tears it down, plus an ordered list of handles it depends on. The resource
//! is destroyed when the last owner releases the handle, and only then are
//! its dependencies released, so a dependency always outlives every
//! destructor that may still reference it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Handle (Rc<Node>)                                          │
//! │  ├── strong count = number of owners                        │
//! │  ├── NativeResource (type-erased value + destructor)        │
//! │  └── dependencies: Vec<Handle> (each edge = one owner)      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ last owner released
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Cascade (explicit worklist)                                │
//! │  ├── destructor(resource) runs exactly once                 │
//! │  ├── dependencies released in stored order, depth-first     │
//! │  └── storage freed                                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Accounting (thread-local)                                  │
//! │  ├── HandleLimits in force (LimitsGuard restores previous)  │
//! │  └── live / destroyed counters                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```
//! use native_handles::{Handle, release};
//!
//! let clock = Handle::new(String::from("clock"), |name| drop(name))?;
//! let timer = Handle::new(7u32, |_| {})?;
//!
//! // The timer reads the clock during teardown, so the clock must outlive it.
//! timer.add_dependency(&clock)?;
//! assert_eq!(clock.ref_count(), 2);
//!
//! release(Some(clock));
//! release(Some(timer)); // timer destructor, then clock destructor
//! # Ok::<(), native_handles::HandleError>(())
//! ```

mod accounting;
mod node;
mod resource;

pub use accounting::{LimitsGuard, destroyed_handles, live_handles};
pub use node::{Handle, HandleId, WeakHandle, get_resource, release};

pub(crate) use accounting::current_limits;
pub(crate) use resource::NativeResource;

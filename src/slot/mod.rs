//! Host-side slots that own handles.
//!
//! A garbage-collected host cannot see the dependency graph between native
//! resources, so it never owns a resource directly. It owns a [`Capsule`],
//! and the capsule owns one [`Handle`](crate::Handle) owner. When the host
//! collects the capsule, the finalizer releases that owner and the handle
//! decides whether the resource can be destroyed yet.
//!
//! ```text
//!   host object ──owns──▶ ExternalSlot ──owns──▶ Capsule ──owns──▶ Handle
//!                              │                    │
//!                         unwrap(name)        finalize (once)
//!                              │                    │
//!                              ▼                    ▼
//!                          &resource          Handle::release
//! ```

mod capsule;
mod external;

pub use capsule::Capsule;
pub use external::{ExternalSlot, wrap};

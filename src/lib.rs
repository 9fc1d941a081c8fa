pub mod config;
pub mod error;
pub mod handle;
pub mod managed;
pub mod slot;

// Core API
pub use handle::{
    Handle, HandleId, LimitsGuard, WeakHandle, destroyed_handles, get_resource, live_handles,
    release,
};
pub use slot::{Capsule, ExternalSlot, wrap};

// Host-side wrapper
pub use managed::{DestroyCallback, ManagedHandle, SlotGuard};

pub use config::HandleLimits;
pub use error::{HandleError, Result};

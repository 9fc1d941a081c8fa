//! Thread-local handle accounting and limits.
//!
//! Handles are single-threaded, so the counters and the limits in force live
//! in thread-locals. `LimitsGuard` swaps limits in and restores the previous
//! ones on drop, which makes nested installs behave like a stack.

use std::cell::Cell;
use std::marker::PhantomData;

use super::node::HandleId;
use crate::config::HandleLimits;
use crate::error::{HandleError, Result};

thread_local! {
    /// Limits applied by `Handle::new` and `Handle::add_dependency`.
    static LIMITS: Cell<HandleLimits> = const { Cell::new(HandleLimits::unlimited()) };

    /// Handles created and not yet destroyed on this thread.
    static LIVE: Cell<usize> = const { Cell::new(0) };

    /// Handles destroyed on this thread since it started.
    static DESTROYED: Cell<u64> = const { Cell::new(0) };

    static NEXT_ID: Cell<u64> = const { Cell::new(1) };
}

/// RAII guard that keeps a set of [`HandleLimits`] installed on this thread.
///
/// Created by [`HandleLimits::install`]. On drop the limits that were in
/// force before the install are restored.
///
/// # Example
///
/// ```
/// use native_handles::{Handle, HandleError, HandleLimits};
///
/// let _limits = HandleLimits { max_live_handles: 1, ..Default::default() }.install();
///
/// let node = Handle::new((), |_| {})?;
/// assert!(matches!(
///     Handle::new((), |_| {}),
///     Err(HandleError::AllocationFailure { .. })
/// ));
/// # drop(node);
/// # Ok::<(), HandleError>(())
/// ```
pub struct LimitsGuard {
    previous: HandleLimits,
    // Restores a thread-local, so it must stay on the installing thread.
    _not_send: PhantomData<*const ()>,
}

impl LimitsGuard {
    pub(crate) fn new(limits: HandleLimits) -> Self {
        let previous = LIMITS.with(|l| l.replace(limits));
        tracing::debug!("Installed handle limits {:?} (previous: {:?})", limits, previous);

        Self {
            previous,
            _not_send: PhantomData,
        }
    }
}

impl Drop for LimitsGuard {
    fn drop(&mut self) {
        LIMITS.with(|l| l.set(self.previous));
    }
}

impl std::fmt::Debug for LimitsGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimitsGuard")
            .field("previous", &self.previous)
            .finish()
    }
}

/// Number of handles alive on the current thread.
pub fn live_handles() -> usize {
    LIVE.with(|c| c.get())
}

/// Number of handles destroyed on the current thread so far.
pub fn destroyed_handles() -> u64 {
    DESTROYED.with(|c| c.get())
}

pub(crate) fn current_limits() -> HandleLimits {
    LIMITS.with(|l| l.get())
}

/// Account for a new handle, failing if the live-handle limit is reached.
pub(crate) fn reserve_handle() -> Result<HandleId> {
    let live = live_handles();
    let limits = current_limits();

    if !limits.allows_live(live) {
        tracing::warn!(
            "Handle limit reached ({} live, max {})",
            live,
            limits.max_live_handles
        );
        return Err(HandleError::AllocationFailure { what: "handle" });
    }

    LIVE.with(|c| c.set(live + 1));
    let id = NEXT_ID.with(|c| {
        let id = c.get();
        c.set(id + 1);
        id
    });

    Ok(HandleId(id))
}

pub(crate) fn record_destroyed() {
    LIVE.with(|c| c.set(c.get().saturating_sub(1)));
    DESTROYED.with(|c| c.set(c.get() + 1));
}

//! Per-thread limits on handle storage.

use crate::handle::LimitsGuard;

/// Environment variable read by [`HandleLimits::from_env`] for `max_live_handles`.
pub const MAX_LIVE_ENV: &str = "NATIVE_HANDLES_MAX_LIVE";

/// Environment variable read by [`HandleLimits::from_env`] for `max_dependencies`.
pub const MAX_DEPENDENCIES_ENV: &str = "NATIVE_HANDLES_MAX_DEPENDENCIES";

/// Handle storage limits configuration
///
/// Exceeding a limit makes the offending operation fail with
/// [`HandleError::AllocationFailure`](crate::HandleError::AllocationFailure),
/// the same way an exhausted allocator would.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleLimits {
    /// Maximum number of handles alive at once on this thread (default: 0 = unlimited)
    pub max_live_handles: usize,
    /// Maximum number of dependency edges stored by a single handle (default: 0 = unlimited)
    pub max_dependencies: usize,
}

impl Default for HandleLimits {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl HandleLimits {
    pub const fn unlimited() -> Self {
        Self {
            max_live_handles: 0,
            max_dependencies: 0,
        }
    }

    /// Read limits from `NATIVE_HANDLES_MAX_LIVE` and
    /// `NATIVE_HANDLES_MAX_DEPENDENCIES`.
    ///
    /// Missing variables keep the default. Unparsable values are ignored
    /// with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build limits from an arbitrary key lookup (used by `from_env`).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut limits = Self::default();

        if let Some(value) = parse_limit(&lookup, MAX_LIVE_ENV) {
            limits.max_live_handles = value;
        }

        if let Some(value) = parse_limit(&lookup, MAX_DEPENDENCIES_ENV) {
            limits.max_dependencies = value;
        }

        limits
    }

    /// Install these limits on the current thread.
    ///
    /// The previous limits are restored when the returned guard is dropped,
    /// so installs can be nested.
    pub fn install(self) -> LimitsGuard {
        LimitsGuard::new(self)
    }

    /// Limits currently in force on this thread.
    pub fn current() -> Self {
        crate::handle::current_limits()
    }

    pub(crate) fn allows_live(&self, live: usize) -> bool {
        self.max_live_handles == 0 || live < self.max_live_handles
    }

    pub(crate) fn allows_dependency(&self, stored: usize) -> bool {
        self.max_dependencies == 0 || stored < self.max_dependencies
    }
}

fn parse_limit<F>(lookup: &F, key: &str) -> Option<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;

    match raw.trim().parse::<usize>() {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!("Ignoring {}={:?}: {}", key, raw, err);
            None
        }
    }
}

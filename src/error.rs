//! Error type shared by handles, capsules and managed handles.

use std::borrow::Cow;

/// Errors reported by handle operations.
///
/// Destructors have no error channel; everything here is raised before a
/// native resource is touched, so a failed call never leaves a live handle in
/// a modified state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandleError {
    /// Storage for a handle or a dependency slot could not be obtained.
    #[error("failed to allocate {what}")]
    AllocationFailure { what: &'static str },

    /// A destroyed handle was used, or an operation was given an argument
    /// that can never form a valid edge (a handle depending on itself).
    #[error("invalid handle: {0}")]
    InvalidHandle(&'static str),

    /// A capsule was looked up with a name other than the one it carries.
    #[error("capsule name mismatch: expected `{expected}`, found `{found}`")]
    NameMismatch {
        expected: String,
        found: Cow<'static, str>,
    },

    /// The capsule name matched but the stored value has another type.
    #[error("capsule `{name}` does not hold a value of the requested type")]
    TypeMismatch { name: Cow<'static, str> },
}

pub type Result<T> = std::result::Result<T, HandleError>;

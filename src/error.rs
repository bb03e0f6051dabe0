//! Arena error types.

use thiserror::Error;

/// Errors reported by arena allocation and by the containers built on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ArenaError {
    /// The request does not fit in the arena's remaining capacity.
    ///
    /// The arena is left exactly as it was before the call.
    #[error(
        "arena exhausted: requested {requested} bytes at offset {offset}, capacity {capacity} bytes"
    )]
    Exhausted {
        /// Number of bytes requested (saturated on overflow).
        requested: usize,
        /// Offset the allocation would have started at.
        offset: usize,
        /// Total capacity of the arena in bytes.
        capacity: usize,
    },

    /// Two handles bound to different arenas were treated as interchangeable.
    #[error("handles are bound to different arenas")]
    IdentityMismatch,

    /// A packed placement would hand out a pointer misaligned for its type.
    #[error("packed placement at offset {offset} is not {align}-byte aligned")]
    Misaligned {
        /// Offset the allocation would have started at.
        offset: usize,
        /// Alignment required by the element type.
        align: usize,
    },
}

/// Result type for arena operations.
pub type Result<T> = std::result::Result<T, ArenaError>;

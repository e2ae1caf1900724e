//! Error types for the requirement algebra.

use thiserror::Error;

use crate::reason::ResultReason;

/// Result type alias for algebra operations.
pub type SpaceResult<T> = Result<T, SpaceError>;

/// Errors raised when a requirement cannot be realized.
///
/// Plain mismatches are reported through [`ResultReason`]; these errors
/// only surface when a caller asks to realize a requirement against a
/// capability that does not satisfy it, or builds a malformed value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpaceError {
    #[error("invalid range: min {min} is greater than max {max}")]
    InvalidRange { min: u64, max: u64 },

    #[error("capability doesn't support requirement: {0}")]
    NotMeetRequirement(ResultReason),

    #[error("node_count realized to zero, nothing to expand")]
    ZeroNodeCount,

    #[error("node_count {count} exceeds the limit of {max} nodes per entry")]
    TooManyNodes { count: u64, max: u64 },
}

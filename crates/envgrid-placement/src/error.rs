//! Placement error types.

use thiserror::Error;

use envgrid_space::{ResultReason, SpaceError};

/// Errors that can occur while binding an environment to a catalog.
#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("pinned pool keys conflict: '{first}' and '{second}'")]
    Conflict { first: String, second: String },

    #[error("pinned entries [{}] not found in any pool: {reason}", .entries.join(", "))]
    UnresolvedPin {
        entries: Vec<String>,
        reason: ResultReason,
    },

    #[error("no satisfying environment found: {reason}")]
    NoCapacity { reason: ResultReason },

    #[error("malformed catalog entry '{entry}' in pool '{pool_key}': {missing} shouldn't be zero")]
    MalformedCapability {
        pool_key: String,
        entry: String,
        missing: String,
    },

    #[error("invalid tier pattern '{pattern}': {source}")]
    InvalidTier {
        pattern: String,
        source: regex::Error,
    },

    #[error("inventory error: {0}")]
    Inventory(String),

    #[error(transparent)]
    Space(#[from] SpaceError),
}

impl PlacementError {
    /// Only a capacity shortfall may clear up on its own once catalogs refresh.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlacementError::NoCapacity { .. })
    }

    /// Mismatch diagnostics, when the failure carries any.
    pub fn reason(&self) -> Option<&ResultReason> {
        match self {
            PlacementError::UnresolvedPin { reason, .. } | PlacementError::NoCapacity { reason } => {
                Some(reason)
            }
            _ => None,
        }
    }
}

pub type PlacementResult<T> = Result<T, PlacementError>;

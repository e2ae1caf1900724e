//! Environment pool error types.

use thiserror::Error;

use envgrid_placement::PlacementError;
use envgrid_space::SpaceError;

/// Errors that can occur while managing or preparing environments.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("environment not found: {0}")]
    EnvironmentNotFound(String),

    #[error("environment already exists: {0}")]
    AlreadyExists(String),

    #[error("environment {name} cannot be prepared in status {status}")]
    InvalidStatus { name: String, status: String },

    #[error("placement failed for environment {name}: {source}")]
    Placement {
        name: String,
        source: PlacementError,
    },

    #[error("requirement error: {0}")]
    Space(#[from] SpaceError),

    #[error("worker error: {0}")]
    Worker(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PoolError {
    /// Only capacity shortfalls are worth another attempt later.
    pub fn is_retryable(&self) -> bool {
        match self {
            PoolError::Placement { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

pub type PoolResult<T> = Result<T, PoolError>;

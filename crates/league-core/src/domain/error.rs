//! Domain-level error taxonomy for Prompt League.

use league_state::{BountyStatus, StorageError};

use crate::inference::InferenceError;

/// League domain errors.
///
/// Only `ValidationSetNotFound` is raised by the referee pipeline itself;
/// per-question inference and scoring failures are recorded in the run
/// result instead of being returned.
#[derive(Debug, thiserror::Error)]
pub enum LeagueError {
    #[error("no validation set found for skill '{0}'")]
    ValidationSetNotFound(String),

    #[error("bounty {id} is {status}")]
    BountyInactive { id: String, status: BountyStatus },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl LeagueError {
    /// Whether this error means a referenced record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ValidationSetNotFound(_)
                | Self::Storage(StorageError::BountyNotFound { .. })
                | Self::Storage(StorageError::SubmissionNotFound { .. })
        )
    }
}

/// Result type for league domain operations.
pub type Result<T> = std::result::Result<T, LeagueError>;

//! Error types for league-state

use thiserror::Error;

/// Errors that can occur in the persistence layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// Bounty not found
    #[error("bounty not found: {id}")]
    BountyNotFound { id: String },

    /// Submission not found
    #[error("submission not found: {id}")]
    SubmissionNotFound { id: String },

    /// A validation set file exists but could not be parsed
    #[error("invalid validation set at {path}: {reason}")]
    InvalidValidationSet { path: String, reason: String },

    /// Filesystem error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_errors_name_the_id() {
        let err = StorageError::BountyNotFound {
            id: "bounty-7".to_string(),
        };
        assert!(err.to_string().contains("bounty-7"));

        let err = StorageError::SubmissionNotFound {
            id: "sub-3".to_string(),
        };
        assert!(err.to_string().contains("submission not found"));
    }

    #[test]
    fn invalid_validation_set_reports_path() {
        let err = StorageError::InvalidValidationSet {
            path: "skills/sql/validation.json".to_string(),
            reason: "expected value at line 1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("skills/sql/validation.json"));
        assert!(msg.contains("expected value"));
    }
}

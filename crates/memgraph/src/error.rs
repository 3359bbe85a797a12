//! Error types for MemGraph

use thiserror::Error;

use crate::provider::ProviderError;

/// Main error type for MemGraph operations
#[derive(Error, Debug)]
pub enum MemGraphError {
    /// Rejected input (empty content, malformed identifiers). Raised before
    /// any tier or index mutation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An embedding, similarity, summarization or generation call failed
    #[error("Collaborator failure: {0}")]
    Collaborator(#[from] ProviderError),

    /// An index references an id that no tier holds, or a record's tier
    /// field disagrees with the collection holding it
    #[error("State corruption: {0}")]
    StateCorruption(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for MemGraphError {
    fn from(e: serde_json::Error) -> Self {
        MemGraphError::Serialization(e.to_string())
    }
}

/// Result type alias for MemGraph operations
pub type Result<T> = std::result::Result<T, MemGraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MemGraphError::InvalidInput("content is empty".to_string());
        assert_eq!(err.to_string(), "Invalid input: content is empty");

        let err = MemGraphError::StateCorruption("dangling id".to_string());
        assert_eq!(err.to_string(), "State corruption: dangling id");
    }

    #[test]
    fn test_provider_error_converts() {
        let err: MemGraphError = ProviderError::Summarization("boom".to_string()).into();
        assert!(matches!(err, MemGraphError::Collaborator(_)));
        assert_eq!(err.to_string(), "Collaborator failure: Summarization failed: boom");
    }
}

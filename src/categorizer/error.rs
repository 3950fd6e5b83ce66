//! Categorizer error types
//!
//! Only persistence can fail. Prediction and training express their
//! insufficient-data cases as `None`.

use thiserror::Error;

/// Errors that can occur while reading or writing the learned model
#[derive(Error, Debug)]
pub enum ModelStoreError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Model could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ModelStoreError {
    fn from(err: serde_json::Error) -> Self {
        ModelStoreError::Serialization(err.to_string())
    }
}

/// Result type alias for model persistence
pub type ModelStoreResult<T> = Result<T, ModelStoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ModelStoreError::Serialization("unexpected end of input".to_string());
        assert_eq!(err.to_string(), "Serialization error: unexpected end of input");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: ModelStoreError = json_err.into();
        assert!(matches!(err, ModelStoreError::Serialization(_)));
    }
}

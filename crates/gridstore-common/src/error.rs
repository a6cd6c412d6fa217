//! Error types for gridstore

use thiserror::Error;

/// Result type alias for gridstore operations
pub type Result<T> = std::result::Result<T, GridStoreError>;

/// Unified error type for all gridstore operations
#[derive(Error, Debug, Clone)]
pub enum GridStoreError {
    /// A sheet selector (or other lookup) did not resolve
    #[error("Not found: {0}")]
    NotFound(String),

    /// The caller passed something the operation refuses to run with
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The underlying remote call was rejected or could not be made
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The service answered with a shape we could not read
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GridStoreError {
    /// Returns true if a sheet or resource lookup failed
    pub fn is_not_found(&self) -> bool {
        matches!(self, GridStoreError::NotFound(_))
    }

    /// Returns true if the error came from the transport layer
    pub fn is_transport(&self) -> bool {
        matches!(self, GridStoreError::Transport(_))
    }
}

impl From<serde_json::Error> for GridStoreError {
    fn from(err: serde_json::Error) -> Self {
        GridStoreError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = GridStoreError::NotFound("sheet 'Orders'".to_string());
        assert_eq!(err.to_string(), "Not found: sheet 'Orders'");
    }

    #[test]
    fn test_error_display_invalid_argument() {
        let err = GridStoreError::InvalidArgument("query required".to_string());
        assert_eq!(err.to_string(), "Invalid argument: query required");
    }

    #[test]
    fn test_error_display_transport() {
        let err = GridStoreError::Transport("503 Service Unavailable".to_string());
        assert_eq!(err.to_string(), "Transport error: 503 Service Unavailable");
    }

    #[test]
    fn test_error_display_deserialization() {
        let err = GridStoreError::Deserialization("missing sheets".to_string());
        assert_eq!(err.to_string(), "Deserialization error: missing sheets");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: GridStoreError = json_err.into();
        assert!(matches!(err, GridStoreError::Serialization(_)));
    }

    #[test]
    fn test_predicates() {
        assert!(GridStoreError::NotFound("x".to_string()).is_not_found());
        assert!(!GridStoreError::Transport("x".to_string()).is_not_found());
        assert!(GridStoreError::Transport("x".to_string()).is_transport());
        assert!(!GridStoreError::InvalidArgument("x".to_string()).is_transport());
    }

    #[test]
    fn test_result_type_err() {
        let result: Result<i32> = Err(GridStoreError::Internal("failed".to_string()));
        assert!(result.is_err());
    }
}

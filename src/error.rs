//! Error types for Cadence
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in Cadence
#[derive(Debug, Error)]
pub enum CadenceError {
    /// Content item not found in storage
    #[error("Post not found: {0}")]
    PostNotFound(String),

    /// Attempted a status edge the lifecycle does not allow
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Oracle exhausted its retry budget on rate-limit errors
    #[error("Oracle unavailable after {attempts} attempts: {message}")]
    OracleUnavailable { attempts: u32, message: String },

    /// Oracle call failed for a non-transient reason
    #[error("Oracle error: {0}")]
    Oracle(String),

    /// Publishing credential lacks the required scope
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Social platform call failed (generic, non-permission)
    #[error("Platform error: {0}")]
    Platform(String),

    /// Could not extract or validate JSON from an Oracle response
    #[error("Parse error: {0}")]
    Parse(String),

    /// Bad payload on a control operation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Cadence operations
pub type Result<T> = std::result::Result<T, CadenceError>;

/// Platform failures keep their permission classification when they cross
/// into the core error type.
impl From<crate::platform::PlatformError> for CadenceError {
    fn from(err: crate::platform::PlatformError) -> Self {
        if err.is_permission() {
            CadenceError::PermissionDenied(err.to_string())
        } else {
            CadenceError::Platform(err.to_string())
        }
    }
}

impl CadenceError {
    /// True for errors a per-item loop should swallow (log and continue
    /// with the next item) rather than abort the whole batch.
    pub fn is_per_item(&self) -> bool {
        !matches!(
            self,
            CadenceError::Storage(_) | CadenceError::Io(_) | CadenceError::PermissionDenied(_)
        )
    }
}

use std::path::PathBuf;
use thiserror::Error;

use crate::messages::Messages;

/// Storage-specific error types for the Gatehouse user directory.
///
/// These errors cover caller input problems, uniqueness and credential
/// failures, and snapshot I/O. Platform I/O and parse errors never leave the
/// record store unwrapped: they arrive here as [`StorageError::Persistence`]
/// or [`StorageError::CorruptStore`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// One or more required input fields were absent or empty
    #[error("Missing required fields: {}", .fields.join(", "))]
    MissingFields { fields: Vec<&'static str> },

    /// Caller input was malformed
    #[error("Validation error: {0}")]
    Validation(String),

    /// A unique field already holds the requested value
    #[error("{field} '{value}' is already in use")]
    Conflict { field: &'static str, value: String },

    /// Entity not found in the store
    #[error("Entity not found: {entity_type} with {field}={value}")]
    NotFound {
        entity_type: String,
        field: String,
        value: String,
    },

    /// Credentials did not match. The message never says which part failed.
    #[error("{}", Messages::INVALID_CREDENTIALS)]
    Authentication,

    /// The snapshot exists but is not a well-formed user document
    #[error("Corrupt snapshot at {}: {source}", .path.display())]
    CorruptStore {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Reading or writing the snapshot failed
    #[error("Persistence error at {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Records could not be encoded for persistence
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Password hashing or hash parsing failed
    #[error("Credential error: {0}")]
    Credential(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Build the not-found error for a user id.
    pub fn user_not_found(id: impl ToString) -> Self {
        StorageError::NotFound {
            entity_type: "User".to_string(),
            field: "id".to_string(),
            value: id.to_string(),
        }
    }

    /// Classify the error for a transport layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::MissingFields { .. } | StorageError::Validation(_) => {
                ErrorKind::Validation
            }
            StorageError::Conflict { .. } => ErrorKind::Conflict,
            StorageError::NotFound { .. } => ErrorKind::NotFound,
            StorageError::Authentication => ErrorKind::Auth,
            StorageError::CorruptStore { .. }
            | StorageError::Persistence { .. }
            | StorageError::Serialization(_) => ErrorKind::Store,
            StorageError::Credential(_) | StorageError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<gatehouse_core::Error> for StorageError {
    fn from(err: gatehouse_core::Error) -> Self {
        StorageError::Validation(err.to_string())
    }
}

/// Coarse error classes a transport maps onto its own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing caller input
    Validation,
    /// Uniqueness violation
    Conflict,
    /// Referenced record absent
    NotFound,
    /// Credential mismatch
    Auth,
    /// Snapshot unreadable or unwritable
    Store,
    /// Anything else that is not the caller's fault
    Internal,
}

impl ErrorKind {
    /// Returns `true` when the caller can fix the request and retry.
    #[must_use]
    pub fn is_caller_error(self) -> bool {
        !matches!(self, ErrorKind::Store | ErrorKind::Internal)
    }

    /// HTTP status a web transport answers with for this class.
    #[must_use]
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::Validation | ErrorKind::Conflict => 400,
            ErrorKind::Auth => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::Store | ErrorKind::Internal => 500,
        }
    }
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

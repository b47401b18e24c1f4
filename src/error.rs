//! Error types for audit-trail
//!
//! A single error enum covers the whole capture cycle, from the pre-commit
//! scan to the follow-up audit flush.

use thiserror::Error;

/// The main error type for audit-trail operations
#[derive(Error, Debug)]
pub enum AuditError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Validation errors for entities and schemas
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity type was never registered with the schema registry
    #[error("Unknown entity type: {0}")]
    UnknownEntity(String),

    /// Row or record not found
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Change tracker was asked about an entry it does not hold
    #[error("Change tracker error: {0}")]
    Tracker(String),

    /// A store-generated field still has no value after a successful commit
    #[error("Field '{field}' of table '{table}' was not assigned by the store")]
    UnresolvedField { table: String, field: String },

    /// A deleted row still carries a field waiting for a store-generated value
    #[error("Deleted row in table '{table}' has unassigned generated field '{field}'")]
    PendingOnDelete { table: String, field: String },

    /// The underlying commit failed
    #[error("Commit failed: {0}")]
    Commit(String),

    /// The backend returned an error from the commit step; nothing was committed
    #[error("Commit failed: {0}")]
    CommitRejected(#[source] Box<AuditError>),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Export errors
    #[error("Export error: {0}")]
    Export(String),
}

impl AuditError {
    /// Create a "not found" error for tracked entries
    pub fn entry_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Tracked entry",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for table rows
    pub fn row_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Row",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for audit records
    pub fn record_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Audit record",
            identifier: identifier.into(),
        }
    }

    /// Mark an error returned by a backend's commit step
    pub fn into_commit_failure(self) -> Self {
        match self {
            Self::Commit(_) | Self::CommitRejected(_) => self,
            other => Self::CommitRejected(Box::new(other)),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::CommitRejected(inner) => inner.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error came from the commit step, so nothing was committed
    pub fn is_commit_failure(&self) -> bool {
        matches!(self, Self::Commit(_) | Self::CommitRejected(_))
    }

    /// Check if this is a tracker contract violation
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedField { .. } | Self::PendingOnDelete { .. } | Self::Tracker(_)
        )
    }
}

impl From<std::io::Error> for AuditError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for audit-trail operations
pub type AuditResult<T> = Result<T, AuditError>;

//! Error types for DocVault operations

use crate::{DocumentId, StoreKind, StoreOp};
use std::fmt;
use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Record not found in {store} store: {id}")]
    NotFound { store: StoreKind, id: DocumentId },

    #[error("Record already exists in {store} store: {id}")]
    AlreadyExists { store: StoreKind, id: DocumentId },

    #[error("{op} failed for document {id}: {reason}")]
    OperationFailed {
        op: StoreOp,
        id: DocumentId,
        reason: String,
    },

    #[error("{op} failed: {reason}")]
    QueryFailed { op: StoreOp, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    /// Build an `OperationFailed` error for `op` on `id`.
    pub fn failed(op: StoreOp, id: DocumentId, reason: impl Into<String>) -> Self {
        StorageError::OperationFailed {
            op,
            id,
            reason: reason.into(),
        }
    }
}

/// Cache layer errors. These never reach a caller of the saga or the router.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache serialization error: {0}")]
    Serialization(String),

    #[error("Cache deserialization error: {0}")]
    Deserialization(String),
}

/// Validation errors for input handed to the engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Saga state machine errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SagaError {
    #[error("Invalid saga transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },

    #[error("Saga stopped in {state} without a recorded error")]
    Unfinished { state: String },
}

/// Master error type for all DocVault errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocVaultError {
    #[error("Document not found: {id}")]
    DocumentNotFound { id: DocumentId },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Saga error: {0}")]
    Saga(#[from] SagaError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DocVaultError {
    /// True for any flavour of "the thing is not there".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DocVaultError::DocumentNotFound { .. }
                | DocVaultError::Storage(StorageError::NotFound { .. })
        )
    }

    /// Whether an outer executor may retry the operation that produced this
    /// error. Only transient store failures qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DocVaultError::Storage(
                StorageError::OperationFailed { .. }
                    | StorageError::QueryFailed { .. }
                    | StorageError::LockPoisoned
            )
        )
    }

    /// Map a metadata-store `NotFound` into the caller-facing
    /// `DocumentNotFound`; every other error passes through.
    pub fn into_document_not_found(self) -> Self {
        match self {
            DocVaultError::Storage(StorageError::NotFound {
                store: StoreKind::Metadata,
                id,
            }) => DocVaultError::DocumentNotFound { id },
            other => other,
        }
    }
}

impl From<serde_json::Error> for DocVaultError {
    fn from(e: serde_json::Error) -> Self {
        DocVaultError::Serialization(e.to_string())
    }
}

/// Result type alias for DocVault operations.
pub type DocVaultResult<T> = Result<T, DocVaultError>;

/// Which saga a compensation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SagaKind {
    Save,
    Delete,
}

impl SagaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaKind::Save => "save",
            SagaKind::Delete => "delete",
        }
    }
}

impl fmt::Display for SagaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A secondary error raised while undoing a prior saga step.
///
/// Never returned as the primary error of a saga and never retried. It is
/// logged with both errors and surfaced only through saga reports and
/// metrics, so that orphaned records can be found and repaired out of band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationFailure {
    pub saga: SagaKind,
    pub id: DocumentId,
    /// The error that triggered the compensation.
    pub original: DocVaultError,
    /// The error raised by the compensating call itself.
    pub compensation: DocVaultError,
}

impl fmt::Display for CompensationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} saga compensation failed for document {}: {} (original error: {})",
            self.saga, self.id, self.compensation, self.original
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================

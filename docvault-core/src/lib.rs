//! DocVault Core - Document Types
//!
//! Data model, identity, response envelope, error taxonomy and configuration
//! shared by every other crate. No I/O happens here.

pub mod config;
pub mod document;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod store;

pub use config::{CacheWriteMode, DocVaultConfig, RetryConfig};
pub use document::{
    list_order, with_content_id, DocumentMeta, FieldPredicate, JsonMap, ListFilter, ListQuery,
    NewDocument, Payload, CONTENT_ID_FIELD, DEFAULT_MIME_TYPE,
};
pub use envelope::{ApiError, ApiResponse};
pub use error::{
    CacheError, CompensationFailure, ConfigError, DocVaultError, DocVaultResult, SagaError,
    SagaKind, StorageError, ValidationError,
};
pub use identity::{DocumentId, Timestamp};
pub use store::{StoreKind, StoreOp};

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

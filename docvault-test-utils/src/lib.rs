//! DocVault Test Utilities
//!
//! Shared test infrastructure for the DocVault workspace:
//! - Proptest generators for documents, payloads and list filters
//! - Fixtures wiring in-memory stores and cache together
//! - Custom assertions for DocVault error shapes

pub use docvault_core::{
    DocVaultError, DocVaultResult, DocumentId, DocumentMeta, JsonMap, ListFilter, NewDocument,
    Payload, StorageError, StoreKind, StoreOp, ValidationError, DEFAULT_MIME_TYPE,
};
pub use docvault_storage::{
    InMemoryBlobStore, InMemoryCacheBackend, InMemoryContentStore, InMemoryMetadataStore,
};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for DocVault types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a valid UUIDv7 DocumentId.
    pub fn arb_document_id() -> impl Strategy<Value = DocumentId> {
        Just(()).prop_map(|_| DocumentId::now_v7())
    }

    /// Generate a principal login.
    pub fn arb_login() -> impl Strategy<Value = String> {
        "[a-z]{3,10}"
    }

    /// Generate a non-empty display name.
    pub fn arb_name() -> impl Strategy<Value = String> {
        "[A-Za-z0-9 _.-]{1,24}".prop_filter("name must not be blank", |s| !s.trim().is_empty())
    }

    /// Generate a mime type.
    pub fn arb_mime() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("text/plain".to_string()),
            Just("application/pdf".to_string()),
            Just("image/png".to_string()),
            Just("application/octet-stream".to_string()),
        ]
    }

    /// Generate a scalar JSON value.
    pub fn arb_json_scalar() -> impl Strategy<Value = serde_json::Value> {
        prop_oneof![
            any::<i64>().prop_map(serde_json::Value::from),
            any::<bool>().prop_map(serde_json::Value::from),
            "[ -~]{0,16}".prop_map(serde_json::Value::from),
            Just(serde_json::Value::Null),
        ]
    }

    /// Generate a JSON object without the reserved `_id` field.
    pub fn arb_json_map() -> impl Strategy<Value = JsonMap> {
        proptest::collection::btree_map("[a-z]{1,8}", arb_json_scalar(), 0..8)
            .prop_map(|fields| fields.into_iter().collect())
    }

    /// Generate binary content, including empty.
    pub fn arb_blob_bytes() -> impl Strategy<Value = Vec<u8>> {
        proptest::collection::vec(any::<u8>(), 0..512)
    }

    /// Generate either payload kind.
    pub fn arb_payload() -> impl Strategy<Value = Payload> {
        prop_oneof![
            arb_blob_bytes().prop_map(Payload::Blob),
            arb_json_map().prop_map(Payload::Json),
        ]
    }

    /// Generate a valid new document granted to `login`.
    pub fn arb_new_document_for(login: String) -> impl Strategy<Value = NewDocument> {
        (arb_name(), arb_mime(), any::<bool>(), arb_payload()).prop_map(
            move |(name, mime, public, payload)| {
                let mime = match payload {
                    Payload::Json(_) => DEFAULT_MIME_TYPE.to_string(),
                    Payload::Blob(_) => mime,
                };
                NewDocument::new(name, mime, payload)
                    .with_public(public)
                    .with_grant(login.clone())
            },
        )
    }

    /// Generate a valid new document with a random grant.
    pub fn arb_new_document() -> impl Strategy<Value = NewDocument> {
        arb_login().prop_flat_map(arb_new_document_for)
    }

    /// Generate a payload-store write that can be made to fail.
    pub fn arb_payload_write_op() -> impl Strategy<Value = StoreOp> {
        prop_oneof![Just(StoreOp::BlobUpload), Just(StoreOp::ContentSave)]
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;
    use std::sync::Arc;

    /// In-memory stores and cache backend, kept as concrete types so tests
    /// can arm faults and read call counters.
    #[derive(Clone, Default)]
    pub struct TestStores {
        pub metadata: Arc<InMemoryMetadataStore>,
        pub content: Arc<InMemoryContentStore>,
        pub blobs: Arc<InMemoryBlobStore>,
        pub cache: Arc<InMemoryCacheBackend>,
    }

    impl TestStores {
        pub fn new() -> Self {
            Self::default()
        }

        /// Calls of any kind against the three backing stores.
        pub fn total_store_calls(&self) -> u64 {
            self.metadata.calls().total() + self.content.calls().total() + self.blobs.calls().total()
        }

        /// Mutating calls against the three backing stores.
        pub fn total_mutations(&self) -> u64 {
            self.metadata.calls().mutations()
                + self.content.calls().mutations()
                + self.blobs.calls().mutations()
        }

        pub fn reset_calls(&self) {
            self.metadata.calls().reset();
            self.content.calls().reset();
            self.blobs.calls().reset();
        }

        /// Whether `id` has a payload in exactly the store `is_blob` selects.
        pub fn payload_location_is_exclusive(&self, id: DocumentId, is_blob: bool) -> bool {
            let in_blobs = self.blobs.contains(id);
            let in_content = self.content.contains(id);
            if is_blob {
                in_blobs && !in_content
            } else {
                in_content && !in_blobs
            }
        }

        /// Whether no store holds anything for `id`.
        pub fn holds_nothing_for(&self, id: DocumentId) -> bool {
            !self.metadata.contains(id) && !self.content.contains(id) && !self.blobs.contains(id)
        }
    }

    /// Build a JSON map from a `json!` object literal.
    pub fn json_map(value: serde_json::Value) -> JsonMap {
        match value {
            serde_json::Value::Object(map) => map,
            _ => JsonMap::new(),
        }
    }

    /// `{"a": 1}` as `application/json`, granted to `alice`.
    pub fn json_document() -> NewDocument {
        NewDocument::json("doc.json", json_map(serde_json::json!({"a": 1}))).with_grant("alice")
    }

    /// `hello` as `text/plain`, granted to `alice`.
    pub fn blob_document() -> NewDocument {
        NewDocument::blob("hello.txt", "text/plain", b"hello".to_vec()).with_grant("alice")
    }

    /// A blob document with the given name, granted to `login`.
    pub fn named_blob(name: &str, login: &str) -> NewDocument {
        NewDocument::blob(name, "text/plain", name.as_bytes().to_vec()).with_grant(login)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion helpers for DocVault results.

    use super::*;

    /// Assert that a DocVaultResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &DocVaultResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a DocVaultResult is Err.
    #[track_caller]
    pub fn assert_err<T: std::fmt::Debug>(result: &DocVaultResult<T>) {
        assert!(result.is_err(), "Expected Err, got Ok: {:?}", result);
    }

    /// Assert that a DocVaultResult is DocumentNotFound for `id`.
    #[track_caller]
    pub fn assert_document_not_found<T: std::fmt::Debug>(
        result: &DocVaultResult<T>,
        id: DocumentId,
    ) {
        match result {
            Err(DocVaultError::DocumentNotFound { id: got }) => {
                assert_eq!(*got, id, "Wrong id in DocumentNotFound");
            }
            other => panic!("Expected DocumentNotFound({}), got: {:?}", id, other),
        }
    }

    /// Assert that a DocVaultResult is a store failure of operation `op`.
    #[track_caller]
    pub fn assert_operation_failed<T: std::fmt::Debug>(result: &DocVaultResult<T>, op: StoreOp) {
        match result {
            Err(DocVaultError::Storage(StorageError::OperationFailed { op: got, .. })) => {
                assert_eq!(*got, op, "Wrong operation in OperationFailed");
            }
            other => panic!("Expected OperationFailed({}), got: {:?}", op, other),
        }
    }

    /// Assert that a DocVaultResult is a NotFound from `store`.
    #[track_caller]
    pub fn assert_not_found_in<T: std::fmt::Debug>(result: &DocVaultResult<T>, store: StoreKind) {
        match result {
            Err(DocVaultError::Storage(StorageError::NotFound { store: got, .. })) => {
                assert_eq!(*got, store, "Wrong store in NotFound");
            }
            other => panic!("Expected NotFound in {} store, got: {:?}", store, other),
        }
    }

    /// Assert that a DocVaultResult is a Validation error.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &DocVaultResult<T>) {
        match result {
            Err(DocVaultError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }
}

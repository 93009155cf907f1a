//! Property tests for the save and delete sagas.
//!
//! **Property 1: Exclusive payload location**
//! After a successful save the payload lives in exactly the store selected
//! by `is_blob`, and a read serves it in that store's shape.
//!
//! **Property 2: Failed save leaves nothing behind**
//! When the payload write fails, the metadata record is removed and the
//! document reads as not found.
//!
//! **Property 3: Failed delete restores the record**
//! When the payload delete fails, the metadata record is re-created exactly
//! as it was before the delete.
//!
//! **Property 4: Warm cache short-circuits stores**
//!
//! **Property 5: Cold cache falls back to the stores**
//!
//! **Property 6: Deleting twice is a not-found without mutations**

#[path = "support/engine.rs"]
mod engine_support;

use docvault_core::{
    with_content_id, ApiResponse, DocVaultError, DocumentId, NewDocument, Payload, SagaKind,
    StorageError, StoreKind, StoreOp,
};
use docvault_storage::BlobStore;
use docvault_saga::{ReadSource, SagaState};
use docvault_test_utils::assertions::*;
use docvault_test_utils::fixtures::*;
use docvault_test_utils::generators::*;
use engine_support::{expire_cache, is_cached, test_engine};
use proptest::prelude::*;
use serde_json::json;
use tokio::runtime::Runtime;

fn test_runtime() -> Result<Runtime, TestCaseError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

/// Bytes a store-backed read serves for `payload` saved under `id`.
fn expected_bytes(payload: &Payload, id: DocumentId) -> Vec<u8> {
    match payload {
        Payload::Blob(bytes) => bytes.clone(),
        Payload::Json(map) => ApiResponse::data(with_content_id(map.clone(), id))
            .to_bytes()
            .expect("envelope serializes"),
    }
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[tokio::test]
async fn scenario_json_save_is_served_enveloped() {
    let (engine, stores) = test_engine();

    let meta = engine
        .coordinator()
        .save(json_document())
        .await
        .expect("save should commit");

    assert!(!meta.is_blob);
    assert_eq!(meta.mime, "application/json");
    assert!(stores.metadata.contains(meta.id));
    assert_eq!(
        stores.content.peek(meta.id),
        Some(json_map(json!({"_id": meta.id.to_string(), "a": 1})))
    );
    assert!(!stores.blobs.contains(meta.id));

    let served = engine.router().get_by_id(meta.id).await.expect("readable");
    assert_eq!(served.mime, "application/json");
    assert_eq!(
        String::from_utf8(served.bytes).expect("utf-8"),
        format!(r#"{{"data":{{"_id":"{}","a":1}}}}"#, meta.id)
    );
}

#[tokio::test]
async fn scenario_blob_upload_failure_is_not_found() {
    let (engine, stores) = test_engine();
    stores.blobs.faults().fail_once(StoreOp::BlobUpload);

    let report = engine
        .coordinator()
        .save_with_report(blob_document())
        .await;

    assert_operation_failed(&report.outcome, StoreOp::BlobUpload);
    assert_eq!(report.final_state, SagaState::Compensated);
    assert!(report.compensation_failure.is_none());

    let read = engine.router().get_by_id(report.id).await;
    assert_document_not_found(&read, report.id);
    assert!(stores.holds_nothing_for(report.id));
    assert!(!is_cached(&stores, report.id));
    assert_eq!(engine.metrics().snapshot().saves_compensated, 1);
}

// ============================================================================
// SAVE
// ============================================================================

#[tokio::test]
async fn test_blob_save_populates_only_blob_store() {
    let (engine, stores) = test_engine();

    let meta = engine.coordinator().save(blob_document()).await.unwrap();

    assert!(meta.is_blob);
    assert!(stores.payload_location_is_exclusive(meta.id, true));
    assert_eq!(stores.blobs.peek(meta.id), Some(b"hello".to_vec()));

    let served = engine.router().get_by_id(meta.id).await.unwrap();
    assert_eq!(served.bytes, b"hello");
    assert_eq!(served.mime, "text/plain");
}

#[tokio::test]
async fn test_content_failure_compensates_json_save() {
    let (engine, stores) = test_engine();
    stores.content.faults().fail_once(StoreOp::ContentSave);

    let report = engine.coordinator().save_with_report(json_document()).await;

    assert_operation_failed(&report.outcome, StoreOp::ContentSave);
    assert_eq!(
        report.history,
        vec![
            SagaState::Started,
            SagaState::MetadataWritten,
            SagaState::Compensating,
            SagaState::Compensated,
        ]
    );
    assert!(stores.holds_nothing_for(report.id));
    assert_eq!(stores.metadata.calls().count(StoreOp::MetadataDelete), 1);
}

#[tokio::test]
async fn test_failed_save_compensation_reports_orphan() {
    let (engine, stores) = test_engine();
    stores.blobs.faults().fail_once(StoreOp::BlobUpload);
    stores.metadata.faults().fail_once(StoreOp::MetadataDelete);

    let report = engine.coordinator().save_with_report(blob_document()).await;

    assert_eq!(report.final_state, SagaState::CompensationFailed);
    assert_operation_failed(&report.outcome, StoreOp::BlobUpload);

    let failure = report
        .compensation_failure
        .clone()
        .expect("orphan should be reported");
    assert_eq!(failure.saga, SagaKind::Save);
    assert_eq!(failure.id, report.id);
    assert_eq!(Err(failure.original.clone()), report.outcome);
    assert!(matches!(
        failure.compensation,
        DocVaultError::Storage(StorageError::OperationFailed {
            op: StoreOp::MetadataDelete,
            ..
        })
    ));

    // The orphaned record is still there; nothing was uploaded or cached.
    assert!(stores.metadata.contains(report.id));
    assert!(!stores.blobs.contains(report.id));
    assert!(!is_cached(&stores, report.id));

    let metrics = engine.metrics().snapshot();
    assert_eq!(metrics.compensation_failures, 1);
    assert_eq!(metrics.saves_compensated, 1);
}

#[tokio::test]
async fn test_invalid_document_is_rejected_before_any_store() {
    let (engine, stores) = test_engine();
    let doc = NewDocument::json("  ", json_map(json!({"a": 1})));

    let result = engine.coordinator().save(doc).await;

    assert_validation_error(&result);
    assert_eq!(stores.total_store_calls(), 0);
    assert_eq!(engine.metrics().snapshot().saves_aborted, 1);
}

#[tokio::test]
async fn test_client_supplied_id_field_is_replaced() {
    let (engine, stores) = test_engine();
    let doc = NewDocument::json("d", json_map(json!({"_id": "client-supplied", "a": 1})));

    let meta = engine.coordinator().save(doc).await.unwrap();

    let stored = stores.content.peek(meta.id).expect("content saved");
    assert_eq!(stored.get("_id"), Some(&json!(meta.id.to_string())));
    assert_eq!(stored.get("a"), Some(&json!(1)));
    assert_eq!(stores.metadata.len(), 1);

    expire_cache(&stores, meta.id).await;
    let served = engine.router().get_by_id(meta.id).await.unwrap();
    assert_eq!(served.source, ReadSource::Store);
    let expected = format!(r#"{{"data":{{"_id":"{}","a":1}}}}"#, meta.id);
    assert_eq!(served.bytes, expected.into_bytes());
}

// ============================================================================
// DELETE
// ============================================================================

#[tokio::test]
async fn test_delete_removes_every_copy() {
    let (engine, stores) = test_engine();
    let meta = engine.coordinator().save(json_document()).await.unwrap();
    assert!(is_cached(&stores, meta.id));

    engine.coordinator().delete(meta.id).await.unwrap();

    assert!(stores.holds_nothing_for(meta.id));
    assert!(!is_cached(&stores, meta.id));
    assert_document_not_found(&engine.router().get_by_id(meta.id).await, meta.id);
    assert_eq!(engine.metrics().snapshot().deletes_committed, 1);
}

#[tokio::test]
async fn test_failed_payload_delete_restores_identical_record() {
    let (engine, stores) = test_engine();
    let meta = engine.coordinator().save(blob_document()).await.unwrap();
    let before = stores.metadata.peek(meta.id).expect("saved");
    stores.blobs.faults().fail_once(StoreOp::BlobDelete);

    let result = engine.coordinator().delete(meta.id).await;

    assert_operation_failed(&result, StoreOp::BlobDelete);
    assert_eq!(stores.metadata.peek(meta.id), Some(before));
    assert!(stores.blobs.contains(meta.id));

    let served = engine.router().get_by_id(meta.id).await.unwrap();
    assert_eq!(served.bytes, b"hello");
    assert_eq!(engine.metrics().snapshot().deletes_compensated, 1);
}

#[tokio::test]
async fn test_failed_delete_compensation_reports_orphan() {
    let (engine, stores) = test_engine();
    let meta = engine.coordinator().save(json_document()).await.unwrap();
    stores.content.faults().fail_once(StoreOp::ContentDelete);
    stores.metadata.faults().fail_once(StoreOp::MetadataSave);

    let report = engine.coordinator().delete_with_report(meta.id).await;

    assert_eq!(report.final_state, SagaState::CompensationFailed);
    assert_operation_failed(&report.outcome, StoreOp::ContentDelete);
    let failure = report.compensation_failure.expect("orphan should be reported");
    assert_eq!(failure.saga, SagaKind::Delete);
    assert!(failure.to_string().contains("delete saga compensation failed"));

    // Content is orphaned: the record is gone but the payload stayed.
    assert!(!stores.metadata.contains(meta.id));
    assert!(stores.content.contains(meta.id));
    assert_eq!(engine.metrics().snapshot().compensation_failures, 1);
}

#[tokio::test]
async fn test_delete_twice_is_not_found_without_mutations() {
    let (engine, stores) = test_engine();
    let meta = engine.coordinator().save(blob_document()).await.unwrap();
    engine.coordinator().delete(meta.id).await.unwrap();
    stores.reset_calls();

    let second = engine.coordinator().delete(meta.id).await;

    assert_document_not_found(&second, meta.id);
    assert_eq!(stores.total_mutations(), 0);
    assert_eq!(engine.metrics().snapshot().deletes_aborted, 1);
}

// ============================================================================
// CACHE INTERPLAY
// ============================================================================

#[tokio::test]
async fn test_warm_cache_makes_no_store_calls() {
    let (engine, stores) = test_engine();
    let meta = engine.coordinator().save(json_document()).await.unwrap();
    stores.reset_calls();

    let served = engine.router().get_by_id(meta.id).await.unwrap();

    assert_eq!(served.source, ReadSource::Cache);
    assert_eq!(stores.total_store_calls(), 0);
    assert_eq!(engine.metrics().snapshot().cache_hits, 1);
}

#[tokio::test]
async fn test_cold_cache_serves_same_bytes_from_stores() {
    let (engine, stores) = test_engine();
    let meta = engine.coordinator().save(json_document()).await.unwrap();
    let cached = engine.router().get_by_id(meta.id).await.unwrap();

    expire_cache(&stores, meta.id).await;
    let fresh = engine.router().get_by_id(meta.id).await.unwrap();

    assert_eq!(fresh.source, ReadSource::Store);
    assert_eq!(fresh.bytes, cached.bytes);
    assert_eq!(fresh.mime, cached.mime);
    assert_eq!(stores.metadata.calls().count(StoreOp::MetadataGet), 1);
    assert_eq!(stores.content.calls().count(StoreOp::ContentGet), 1);
}

#[tokio::test]
async fn test_missing_payload_surfaces_store_not_found() {
    let (engine, stores) = test_engine();
    let meta = engine.coordinator().save(blob_document()).await.unwrap();
    expire_cache(&stores, meta.id).await;
    stores.blobs.faults().fail_always(StoreOp::BlobDownload);

    let result = engine.router().get_by_id(meta.id).await;
    assert_operation_failed(&result, StoreOp::BlobDownload);

    stores.blobs.faults().clear_all();
    stores.blobs.delete(meta.id).await.unwrap();
    let result = engine.router().get_by_id(meta.id).await;
    assert_not_found_in(&result, StoreKind::Blob);
}

// ============================================================================
// PROPERTY TESTS
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// **Property 1 and 5**: a committed save is served from either path
    /// in the shape its payload kind dictates.
    #[test]
    fn prop_saved_document_is_served_by_kind(doc in arb_new_document()) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let (engine, stores) = test_engine();
            let is_blob = doc.is_blob();
            let payload = doc.payload.clone();

            let meta = engine.coordinator().save(doc).await?;
            prop_assert_eq!(meta.is_blob, is_blob);
            prop_assert!(stores.payload_location_is_exclusive(meta.id, is_blob));

            let expected = expected_bytes(&payload, meta.id);
            let cached = engine.router().get_by_id(meta.id).await?;
            prop_assert_eq!(cached.source, ReadSource::Cache);
            prop_assert_eq!(&cached.bytes, &expected);

            expire_cache(&stores, meta.id).await;
            let fresh = engine.router().get_by_id(meta.id).await?;
            prop_assert_eq!(fresh.source, ReadSource::Store);
            prop_assert_eq!(&fresh.bytes, &expected);
            prop_assert_eq!(&fresh.mime, &meta.mime);
            Ok(())
        })?;
    }

    /// **Property 2**: a payload failure on the document's own store leaves
    /// no trace; a failure armed on the other store is never reached.
    #[test]
    fn prop_payload_failure_never_leaves_orphans(
        doc in arb_new_document(),
        op in arb_payload_write_op(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let (engine, stores) = test_engine();
            match op {
                StoreOp::BlobUpload => stores.blobs.faults().fail_once(op),
                _ => stores.content.faults().fail_once(op),
            }
            let hits_own_store = (op == StoreOp::BlobUpload) == doc.is_blob();
            let is_blob = doc.is_blob();

            let report = engine.coordinator().save_with_report(doc).await;

            if hits_own_store {
                prop_assert_eq!(report.final_state, SagaState::Compensated);
                prop_assert!(stores.holds_nothing_for(report.id));
                prop_assert!(!is_cached(&stores, report.id));
                let read = engine.router().get_by_id(report.id).await;
                prop_assert_eq!(read, Err(DocVaultError::DocumentNotFound { id: report.id }));
            } else {
                prop_assert!(report.is_committed());
                prop_assert!(stores.payload_location_is_exclusive(report.id, is_blob));
            }
            Ok(())
        })?;
    }

    /// **Property 3 and 6**: a failed delete restores the record, and a
    /// completed delete cannot be repeated.
    #[test]
    fn prop_delete_restores_or_removes(doc in arb_new_document(), fail_payload in any::<bool>()) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let (engine, stores) = test_engine();
            let meta = engine.coordinator().save(doc).await?;
            let before = stores.metadata.peek(meta.id);
            if fail_payload {
                stores.blobs.faults().fail_once(StoreOp::BlobDelete);
                stores.content.faults().fail_once(StoreOp::ContentDelete);
            }

            let result = engine.coordinator().delete(meta.id).await;

            if fail_payload {
                prop_assert!(result.is_err());
                prop_assert_eq!(stores.metadata.peek(meta.id), before);
                prop_assert!(stores.payload_location_is_exclusive(meta.id, meta.is_blob));
            } else {
                prop_assert!(result.is_ok());
                prop_assert!(stores.holds_nothing_for(meta.id));
                stores.reset_calls();
                let again = engine.coordinator().delete(meta.id).await;
                prop_assert_eq!(again, Err(DocVaultError::DocumentNotFound { id: meta.id }));
                prop_assert_eq!(stores.total_mutations(), 0);
            }
            Ok(())
        })?;
    }
}

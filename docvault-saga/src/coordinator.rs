//! Save and delete sagas.
//!
//! A save writes the metadata record first (it is the existence witness),
//! then the payload to the blob or content store. A delete removes the
//! metadata record first, then the payload. If the payload step fails the
//! metadata step is undone: the record is deleted after a failed save and
//! re-created after a failed delete.
//!
//! Each external call is attempted exactly once per invocation. A failed
//! compensation is logged with both errors and counted, but the caller
//! always gets the error of the step that failed.

use crate::executor::DurableExecutor;
use crate::metrics::SagaMetrics;
use crate::state::{SagaEvent, SagaReport, SagaRun, SagaState};
use crate::stores::{run_cache_task, DocumentStores};
use chrono::Utc;
use docvault_core::{
    with_content_id, CacheWriteMode, CompensationFailure, DocVaultConfig, DocVaultError,
    DocVaultResult, DocumentId, DocumentMeta, NewDocument, Payload, SagaError, SagaKind,
};
use docvault_storage::DocumentCache;
use std::sync::Arc;

/// Errors collected while driving one saga run.
#[derive(Debug, Default)]
struct StepLog {
    primary: Option<DocVaultError>,
    compensation_failure: Option<CompensationFailure>,
}

impl StepLog {
    fn fail(&mut self, error: DocVaultError, event: SagaEvent) -> SagaEvent {
        self.primary = Some(error);
        event
    }

    fn compensated(&mut self, run: &SagaRun, result: DocVaultResult<()>) -> SagaEvent {
        let compensation = match result {
            Ok(()) => return SagaEvent::CompensationSucceeded,
            Err(e) => e,
        };
        let original = self.primary.clone().unwrap_or_else(|| {
            SagaError::Unfinished {
                state: run.state().to_string(),
            }
            .into()
        });

        tracing::error!(
            target: "docvault::compensation",
            saga = %run.kind(),
            document_id = %run.id(),
            original_error = %original,
            compensation_error = %compensation,
            "Compensation failed, stores left inconsistent"
        );

        self.compensation_failure = Some(CompensationFailure {
            saga: run.kind(),
            id: run.id(),
            original,
            compensation,
        });
        SagaEvent::CompensationFailed
    }
}

/// Orchestrates save and delete across the metadata, content and blob stores.
#[derive(Clone)]
pub struct SagaCoordinator {
    stores: DocumentStores,
    cache: DocumentCache,
    metrics: Arc<SagaMetrics>,
    cache_write_mode: CacheWriteMode,
}

impl SagaCoordinator {
    pub fn new(
        stores: DocumentStores,
        cache: DocumentCache,
        metrics: Arc<SagaMetrics>,
        config: &DocVaultConfig,
    ) -> Self {
        Self {
            stores,
            cache,
            metrics,
            cache_write_mode: config.cache_write_mode,
        }
    }

    pub fn metrics(&self) -> &Arc<SagaMetrics> {
        &self.metrics
    }

    // ========================================================================
    // SAVE
    // ========================================================================

    /// Persist a new document and return its metadata record.
    pub async fn save(&self, doc: NewDocument) -> DocVaultResult<DocumentMeta> {
        self.save_with_report(doc).await.into_outcome()
    }

    /// Run the save saga through `executor`.
    pub async fn save_with<E: DurableExecutor>(
        &self,
        executor: &E,
        doc: NewDocument,
    ) -> DocVaultResult<DocumentMeta> {
        executor
            .execute(SagaKind::Save, || self.save(doc.clone()))
            .await
    }

    /// Persist a new document and report how the saga went.
    pub async fn save_with_report(&self, doc: NewDocument) -> SagaReport<DocumentMeta> {
        let id = DocumentId::now_v7();
        let mut run = SagaRun::new(SagaKind::Save, id);
        let mut log = StepLog::default();

        if let Err(e) = doc.validate() {
            log.primary = Some(e.into());
            let driven = run.apply(SagaEvent::MetadataStepFailed).map(|_| ());
            return self.finish(run, log, driven, None);
        }

        let meta = doc.to_meta(id, Utc::now());
        let driven = self
            .drive_save(&mut run, &mut log, &meta, &doc.payload)
            .await;

        if run.state() != SagaState::Committed {
            return self.finish(run, log, driven, None);
        }

        let cached = match doc.payload {
            Payload::Blob(bytes) => Payload::Blob(bytes),
            Payload::Json(map) => Payload::Json(with_content_id(map, id)),
        };
        let cache = self.cache.clone();
        let mime = meta.mime.clone();
        run_cache_task(self.cache_write_mode, async move {
            cache.set(id, &mime, &cached).await;
        })
        .await;

        self.finish(run, log, driven, Some(meta))
    }

    async fn drive_save(
        &self,
        run: &mut SagaRun,
        log: &mut StepLog,
        meta: &DocumentMeta,
        payload: &Payload,
    ) -> Result<(), SagaError> {
        while !run.state().is_terminal() {
            let event = match run.state() {
                SagaState::Started => match self.stores.metadata.save(meta).await {
                    Ok(()) => SagaEvent::MetadataStepSucceeded,
                    Err(e) => log.fail(e, SagaEvent::MetadataStepFailed),
                },
                SagaState::MetadataWritten => match self.write_payload(meta.id, payload).await {
                    Ok(()) => SagaEvent::PayloadStepSucceeded,
                    Err(e) => {
                        tracing::warn!(
                            target: "docvault::saga",
                            saga = %run.kind(),
                            document_id = %meta.id,
                            is_blob = meta.is_blob,
                            error = %e,
                            "Payload write failed, removing metadata"
                        );
                        log.fail(e, SagaEvent::PayloadStepFailed)
                    }
                },
                SagaState::Compensating => {
                    let result = self.stores.metadata.delete_by_id(meta.id).await;
                    log.compensated(run, result)
                }
                SagaState::PayloadWritten => SagaEvent::Commit,
                _ => break,
            };
            run.apply(event)?;
        }
        Ok(())
    }

    async fn write_payload(&self, id: DocumentId, payload: &Payload) -> DocVaultResult<()> {
        match payload {
            Payload::Blob(bytes) => self.stores.blobs.upload(id, bytes).await,
            Payload::Json(map) => {
                let stamped = with_content_id(map.clone(), id);
                self.stores.content.save(id, stamped).await
            }
        }
    }

    // ========================================================================
    // DELETE
    // ========================================================================

    /// Remove a document from every store.
    pub async fn delete(&self, id: DocumentId) -> DocVaultResult<()> {
        self.delete_with_report(id).await.into_outcome()
    }

    /// Run the delete saga through `executor`.
    pub async fn delete_with<E: DurableExecutor>(
        &self,
        executor: &E,
        id: DocumentId,
    ) -> DocVaultResult<()> {
        executor
            .execute(SagaKind::Delete, || self.delete(id))
            .await
    }

    /// Remove a document and report how the saga went.
    pub async fn delete_with_report(&self, id: DocumentId) -> SagaReport<()> {
        let mut run = SagaRun::new(SagaKind::Delete, id);
        let mut log = StepLog::default();

        let meta = match self.stores.metadata.get_by_id(id).await {
            Ok(meta) => meta,
            Err(e) => {
                log.primary = Some(e.into_document_not_found());
                let driven = run.apply(SagaEvent::MetadataStepFailed).map(|_| ());
                return self.finish(run, log, driven, None);
            }
        };

        let driven = self.drive_delete(&mut run, &mut log, &meta).await;

        if run.state() != SagaState::Committed {
            return self.finish(run, log, driven, None);
        }

        let cache = self.cache.clone();
        run_cache_task(self.cache_write_mode, async move {
            cache.delete(id).await;
        })
        .await;

        self.finish(run, log, driven, Some(()))
    }

    async fn drive_delete(
        &self,
        run: &mut SagaRun,
        log: &mut StepLog,
        meta: &DocumentMeta,
    ) -> Result<(), SagaError> {
        while !run.state().is_terminal() {
            let event = match run.state() {
                SagaState::Started => match self.stores.metadata.delete_by_id(meta.id).await {
                    Ok(()) => SagaEvent::MetadataStepSucceeded,
                    Err(e) => log.fail(e.into_document_not_found(), SagaEvent::MetadataStepFailed),
                },
                SagaState::MetadataWritten => match self.remove_payload(meta).await {
                    Ok(()) => SagaEvent::PayloadStepSucceeded,
                    Err(e) => {
                        tracing::warn!(
                            target: "docvault::saga",
                            saga = %run.kind(),
                            document_id = %meta.id,
                            is_blob = meta.is_blob,
                            error = %e,
                            "Payload delete failed, restoring metadata"
                        );
                        log.fail(e, SagaEvent::PayloadStepFailed)
                    }
                },
                SagaState::Compensating => {
                    let result = self.stores.metadata.save(meta).await;
                    log.compensated(run, result)
                }
                SagaState::PayloadWritten => SagaEvent::Commit,
                _ => break,
            };
            run.apply(event)?;
        }
        Ok(())
    }

    async fn remove_payload(&self, meta: &DocumentMeta) -> DocVaultResult<()> {
        if meta.is_blob {
            self.stores.blobs.delete(meta.id).await
        } else {
            self.stores.content.delete_by_id(meta.id).await
        }
    }

    // ========================================================================
    // REPORTING
    // ========================================================================

    fn finish<T>(
        &self,
        run: SagaRun,
        log: StepLog,
        driven: Result<(), SagaError>,
        value: Option<T>,
    ) -> SagaReport<T> {
        let final_state = run.state();
        let outcome = match (driven, value, log.primary) {
            (Err(e), _, _) => Err(DocVaultError::from(e)),
            (Ok(()), Some(value), _) => Ok(value),
            (Ok(()), None, Some(e)) => Err(e),
            (Ok(()), None, None) => Err(SagaError::Unfinished {
                state: final_state.to_string(),
            }
            .into()),
        };

        self.metrics.record_outcome(run.kind(), final_state);

        match &outcome {
            Ok(_) => tracing::info!(
                target: "docvault::saga",
                saga = %run.kind(),
                document_id = %run.id(),
                "Saga committed"
            ),
            Err(e) => tracing::info!(
                target: "docvault::saga",
                saga = %run.kind(),
                document_id = %run.id(),
                final_state = %final_state,
                error = %e,
                "Saga did not commit"
            ),
        }

        SagaReport {
            kind: run.kind(),
            id: run.id(),
            outcome,
            history: run.history().to_vec(),
            final_state,
            compensation_failure: log.compensation_failure,
        }
    }
}

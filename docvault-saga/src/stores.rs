//! The store handles shared by the coordinator and the router.

use docvault_core::CacheWriteMode;
use docvault_storage::{BlobStore, ContentStore, MetadataStore};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;

/// One handle per backing store, shared across concurrent sagas and reads.
#[derive(Clone)]
pub struct DocumentStores {
    pub metadata: Arc<dyn MetadataStore>,
    pub content: Arc<dyn ContentStore>,
    pub blobs: Arc<dyn BlobStore>,
}

impl DocumentStores {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        content: Arc<dyn ContentStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            metadata,
            content,
            blobs,
        }
    }
}

/// Run cache work per `mode`: spawned on the runtime, or awaited here.
///
/// Background work runs inline when the caller is not inside a Tokio runtime.
pub(crate) async fn run_cache_task<F>(mode: CacheWriteMode, task: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    match (mode, Handle::try_current()) {
        (CacheWriteMode::Background, Ok(handle)) => {
            handle.spawn(task);
        }
        (CacheWriteMode::Background, Err(_)) => {
            tracing::debug!("no tokio runtime, running cache work inline");
            task.await
        }
        (CacheWriteMode::Inline, _) => task.await,
    }
}

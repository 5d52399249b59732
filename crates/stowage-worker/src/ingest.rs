//! Ingestion coordinator
//!
//! Per message: decode `FileData`, persist its metadata, check the storage quota, then
//! encrypt and store the content when it fits. Metadata is kept even when the content is
//! rejected.
//!
//! The quota is charged for the sealed object (nonce and tag included), sized from the
//! declared size or the carried bytes, whichever is larger.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use stowage_core::models::FileData;
use stowage_core::{sealed_len, AppResult};
use stowage_db::Catalog;
use stowage_storage::{validate_file_name, ObjectStore, VolumeAccountant};
use uuid::Uuid;

use crate::channel::Delivery;
use crate::handler::{log_dropped, MessageHandler};

/// Result of ingesting one upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Content encrypted and written to `path`
    Stored { record_id: Uuid, path: PathBuf },
    /// Storing the content would exceed the quota; nothing was written
    Rejected {
        record_id: Uuid,
        current: u64,
        limit: u64,
    },
}

impl IngestOutcome {
    pub fn record_id(&self) -> Uuid {
        match self {
            IngestOutcome::Stored { record_id, .. } | IngestOutcome::Rejected { record_id, .. } => {
                *record_id
            }
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, IngestOutcome::Stored { .. })
    }
}

pub struct IngestCoordinator {
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn ObjectStore>,
    accountant: Arc<VolumeAccountant>,
    file_limit_bytes: u64,
}

impl IngestCoordinator {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        store: Arc<dyn ObjectStore>,
        accountant: Arc<VolumeAccountant>,
        file_limit_bytes: u64,
    ) -> Self {
        Self {
            catalog,
            store,
            accountant,
            file_limit_bytes,
        }
    }

    /// Decode a raw payload and ingest it
    pub async fn ingest_payload(&self, payload: &[u8]) -> AppResult<IngestOutcome> {
        let data: FileData = serde_json::from_slice(payload)?;
        self.ingest(&data).await
    }

    #[tracing::instrument(skip(self, data), fields(
        file_name = %data.file_name,
        declared_size = data.file_size,
        content_bytes = data.file_bytes.len()
    ))]
    pub async fn ingest(&self, data: &FileData) -> AppResult<IngestOutcome> {
        validate_file_name(&data.file_name)?;

        let record = self.catalog.save_file_data(data).await?;

        let root = self.store.root().to_path_buf();
        let _guard = self.accountant.reserve(&root).await;

        let plaintext_len = data.declared_size().max(data.file_bytes.len() as u64);
        let check = self
            .accountant
            .check(&root, sealed_len(plaintext_len), self.file_limit_bytes)
            .await?;

        if !check.is_within_limit() {
            tracing::warn!(
                record_id = %record.id,
                current_bytes = check.current,
                incoming_bytes = check.incoming,
                limit_bytes = check.limit,
                "Storage limit reached, file content not stored"
            );
            return Ok(IngestOutcome::Rejected {
                record_id: record.id,
                current: check.current,
                limit: check.limit,
            });
        }

        let path = self.store.put(&data.file_name, &data.file_bytes).await?;

        tracing::info!(
            record_id = %record.id,
            path = %path.display(),
            tags = record.tags.len(),
            "File ingested"
        );

        Ok(IngestOutcome::Stored {
            record_id: record.id,
            path,
        })
    }
}

#[async_trait]
impl MessageHandler for IngestCoordinator {
    fn name(&self) -> &'static str {
        "ingest"
    }

    async fn handle(&self, delivery: Delivery) {
        if let Err(err) = self.ingest_payload(&delivery.payload).await {
            log_dropped(self.name(), &err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage_core::AppError;
    use stowage_db::MemoryCatalog;
    use stowage_storage::EncryptedObjectStore;
    use tempfile::TempDir;

    const KEY: [u8; 32] = [7u8; 32];

    async fn coordinator(limit: u64) -> (IngestCoordinator, Arc<MemoryCatalog>, TempDir) {
        let dir = TempDir::new().unwrap();
        let catalog = Arc::new(MemoryCatalog::new());
        let store = EncryptedObjectStore::new(dir.path(), &KEY).await.unwrap();
        let coordinator = IngestCoordinator::new(
            catalog.clone(),
            Arc::new(store),
            Arc::new(VolumeAccountant::new()),
            limit,
        );
        (coordinator, catalog, dir)
    }

    fn upload(name: &str, size: usize) -> FileData {
        FileData::new(name, "application/octet-stream", vec!["t".into()], vec![1u8; size])
    }

    #[tokio::test]
    async fn stores_encrypted_content_and_metadata() {
        let (coordinator, catalog, dir) = coordinator(10_000).await;

        let outcome = coordinator.ingest(&upload("a.bin", 100)).await.unwrap();
        let IngestOutcome::Stored { record_id, path } = outcome else {
            panic!("expected stored outcome");
        };
        assert_eq!(path, dir.path().join("a.bin.encrypted"));
        assert!(catalog.get_file(record_id).await.unwrap().is_some());

        let plaintext = stowage_storage::decrypt(&path, &KEY).await.unwrap();
        assert_eq!(plaintext, vec![1u8; 100]);
    }

    #[tokio::test]
    async fn second_upload_over_limit_is_rejected_but_recorded() {
        let (coordinator, catalog, dir) = coordinator(1000).await;

        let first = coordinator.ingest(&upload("first.bin", 900)).await.unwrap();
        assert!(first.is_stored());

        let second = coordinator.ingest(&upload("second.bin", 200)).await.unwrap();
        match second {
            IngestOutcome::Rejected { current, limit, .. } => {
                assert!(current >= 900);
                assert_eq!(limit, 1000);
            }
            other => panic!("expected rejection, got {:?}", other),
        }

        assert!(!dir.path().join("second.bin.encrypted").exists());
        assert_eq!(catalog.file_count(), 2);
    }

    #[tokio::test]
    async fn upload_of_exactly_the_limit_does_not_overshoot() {
        let (coordinator, _catalog, dir) = coordinator(1000).await;

        let outcome = coordinator.ingest(&upload("full.bin", 1000)).await.unwrap();
        assert!(!outcome.is_stored());

        let usage = VolumeAccountant::new().current_usage(dir.path()).await.unwrap();
        assert!(usage <= 1000);
    }

    #[tokio::test]
    async fn sealed_size_is_charged_against_the_limit() {
        let limit = sealed_len(500) + sealed_len(400);
        let (coordinator, _catalog, dir) = coordinator(limit).await;

        assert!(coordinator.ingest(&upload("a.bin", 500)).await.unwrap().is_stored());
        assert!(coordinator.ingest(&upload("b.bin", 400)).await.unwrap().is_stored());
        assert!(!coordinator.ingest(&upload("c.bin", 1)).await.unwrap().is_stored());

        let usage = VolumeAccountant::new().current_usage(dir.path()).await.unwrap();
        assert_eq!(usage, limit);
    }

    #[tokio::test]
    async fn understated_declared_size_is_charged_for_carried_bytes() {
        let (coordinator, _catalog, dir) = coordinator(100).await;

        let mut data = upload("liar.bin", 500);
        data.file_size = 10;
        assert!(!coordinator.ingest(&data).await.unwrap().is_stored());
        assert!(!dir.path().join("liar.bin.encrypted").exists());
    }

    #[tokio::test]
    async fn malformed_payload_is_rejected_without_side_effects() {
        let (coordinator, catalog, _dir) = coordinator(1000).await;
        let err = coordinator.ingest_payload(b"{not json").await.unwrap_err();
        assert!(matches!(err, AppError::MalformedMessage(_)));
        assert_eq!(catalog.file_count(), 0);
    }

    #[tokio::test]
    async fn traversal_name_is_rejected_before_any_write() {
        let (coordinator, catalog, dir) = coordinator(1000).await;
        let err = coordinator.ingest(&upload("../escape", 1)).await.unwrap_err();
        assert!(matches!(err, AppError::Filesystem(_)));
        assert_eq!(catalog.file_count(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn catalog_failure_skips_storage() {
        let (coordinator, catalog, dir) = coordinator(1000).await;
        catalog.set_unavailable(true);
        let err = coordinator.ingest(&upload("a.bin", 10)).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert!(!dir.path().join("a.bin.encrypted").exists());
    }

    #[tokio::test]
    async fn concurrent_uploads_never_overshoot() {
        let (coordinator, catalog, dir) = coordinator(1000).await;
        let coordinator = Arc::new(coordinator);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move {
                    coordinator
                        .ingest(&upload(&format!("c{}.bin", i), 600))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut stored = 0;
        for handle in handles {
            if handle.await.unwrap().is_stored() {
                stored += 1;
            }
        }

        assert_eq!(stored, 1);
        assert_eq!(catalog.file_count(), 4);
        let usage = VolumeAccountant::new().current_usage(dir.path()).await.unwrap();
        assert!(usage <= 1000);
    }
}

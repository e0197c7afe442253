//! File lifecycle service.
//!
//! Sits between the HTTP handlers and the collaborators: the metadata store
//! behind [`FileRecords`] and the content stores behind [`StorageRegistry`].
//! Error mapping follows the route contracts: list/delete surface failures
//! as 400-class persistence errors, upload and download failures collapse to
//! their fixed terminal responses in the handlers.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    api::models::files::DeleteFileItem,
    errors::{Error, Result},
    files::{
        id::{self, IdClass},
        records::FileRecords,
        staged::StagedFile,
        storage::{FetchedContent, StorageRegistry},
    },
    types::{FileRecord, UserId},
};

/// Endpoint key for the provider passthrough strategy
pub const OPENAI_ENDPOINT: &str = "openAI";

/// Decide whether a delete request entry is actionable.
///
/// Both identifying fields must be present and the id must belong to one of
/// the two namespaces. Entries failing this are silently dropped, which also
/// makes a repeated delete of the same set converge on the empty case.
pub fn should_delete(item: &DeleteFileItem) -> bool {
    if item.file_id.is_empty() || item.filepath.is_empty() {
        return false;
    }
    id::classify(&item.file_id) != IdClass::Invalid
}

/// Outcome of a batch delete.
#[derive(Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Nothing survived the filter; no collaborator was called
    NothingToDelete,
    /// The filtered batch was processed
    Deleted { count: u64 },
}

/// A validated upload, ready for dispatch.
pub struct UploadRequest {
    pub endpoint: String,
    /// Client-supplied optimistic id
    pub client_file_id: String,
    /// Server-generated id, minted at request entry
    pub server_file_id: Uuid,
    pub staged: StagedFile,
}

pub struct FileService {
    records: Arc<dyn FileRecords>,
    storage: StorageRegistry,
}

impl FileService {
    pub fn new(records: Arc<dyn FileRecords>, storage: StorageRegistry) -> Self {
        Self { records, storage }
    }

    /// All records owned by the caller, in persistence order.
    pub async fn list(&self, user: UserId) -> Result<Vec<FileRecord>> {
        self.records.list_for_user(user).await.map_err(Error::Persistence)
    }

    /// Filter and process a batch delete.
    ///
    /// Every entry surviving the filter is resolved against the caller's own
    /// records before anything is touched; entries without a matching owned
    /// record are skipped. Content removal then runs per resolved record,
    /// using the persisted endpoint and locator rather than the
    /// request-supplied ones, before the single metadata removal call. Any
    /// surfaced failure aborts the batch as a request error.
    pub async fn delete(&self, user: UserId, files: Vec<DeleteFileItem>) -> Result<DeleteOutcome> {
        let files: Vec<DeleteFileItem> = files.into_iter().filter(should_delete).collect();

        if files.is_empty() {
            debug!("Delete request for {} filtered down to nothing", user);
            return Ok(DeleteOutcome::NothingToDelete);
        }

        let mut owned: Vec<FileRecord> = Vec::with_capacity(files.len());
        for item in &files {
            match self.records.get(user, &item.file_id).await.map_err(Error::Persistence)? {
                Some(record) => owned.push(record),
                None => debug!("Skipping delete of {} with no record owned by {}", item.file_id, user),
            }
        }

        for record in &owned {
            let strategy = self
                .storage
                .get(&record.endpoint)
                .ok_or_else(|| Error::DeleteContent(anyhow::anyhow!("no storage strategy for endpoint '{}'", record.endpoint)))?;
            strategy.delete(record).await.map_err(Error::DeleteContent)?;
        }

        let ids: Vec<String> = owned.iter().map(|r| r.file_id.clone()).collect();
        let count = self.records.delete_batch(user, &ids).await.map_err(Error::Persistence)?;

        info!("Deleted {} of {} requested files for {}", count, files.len(), user);
        Ok(DeleteOutcome::Deleted { count })
    }

    /// Store an upload and persist its record.
    ///
    /// The client id must be a canonical UUID; it survives only as the
    /// `temp_file_id` echoed to the client. The staged file travels into the
    /// strategy, so any failure before or inside the store drops it and
    /// removes the staged copy.
    pub async fn upload(&self, user: UserId, request: UploadRequest) -> Result<FileRecord> {
        if id::classify(&request.client_file_id) != IdClass::Internal {
            return Err(Error::BadRequest {
                message: format!("file_id is not a valid UUID: {}", request.client_file_id),
            });
        }

        let canonical = id::assign_canonical_id(&request.client_file_id, request.server_file_id);

        let strategy = self.storage.get(&request.endpoint).ok_or_else(|| Error::BadRequest {
            message: format!("no storage strategy for endpoint '{}'", request.endpoint),
        })?;

        let filename = request.staged.filename().to_string();
        let content_type = request.staged.content_type().to_string();

        let stored = strategy
            .store(user, &canonical.file_id, request.staged)
            .await
            .map_err(|source| Error::Storage {
                operation: "store file".to_string(),
                source,
            })?;

        let record = FileRecord {
            file_id: canonical.file_id,
            filepath: stored.filepath,
            user,
            endpoint: request.endpoint,
            filename,
            bytes: stored.bytes,
            content_type,
            created_at: Utc::now(),
        };

        let record = self.records.create(record).await.map_err(Error::Persistence)?;
        info!("Stored file {} for {} via {}", record.file_id, user, record.endpoint);
        Ok(record)
    }

    /// Relay a foreign file from the provider.
    pub async fn download(&self, file_id: &str) -> Result<FetchedContent> {
        let strategy = self.storage.get(OPENAI_ENDPOINT).ok_or_else(|| Error::Internal {
            operation: "resolve provider storage strategy".to_string(),
        })?;

        strategy.fetch(file_id).await.map_err(|source| Error::Upstream {
            provider: OPENAI_ENDPOINT.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::records::InMemoryFileRecords;
    use crate::files::storage::{StorageStrategy, StoredFile};
    use async_trait::async_trait;
    use axum::body::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn item(file_id: &str, filepath: &str) -> DeleteFileItem {
        DeleteFileItem {
            file_id: file_id.to_string(),
            filepath: filepath.to_string(),
            endpoint: "local".to_string(),
        }
    }

    #[test]
    fn test_filter_requires_both_fields() {
        let valid_uuid = Uuid::new_v4().to_string();

        assert!(should_delete(&item(&valid_uuid, "/files/a")));
        assert!(should_delete(&item("file-abc", "/files/a")));
        assert!(!should_delete(&item("", "/files/a")));
        assert!(!should_delete(&item(&valid_uuid, "")));
        assert!(!should_delete(&item("not-a-uuid", "/files/a")));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let items = vec![
            item(&Uuid::new_v4().to_string(), "/files/a"),
            item("junk", "/files/b"),
            item("file-xyz", ""),
        ];

        let once: Vec<DeleteFileItem> = items.into_iter().filter(should_delete).collect();
        let twice: Vec<DeleteFileItem> = once.clone().into_iter().filter(should_delete).collect();
        assert_eq!(once.len(), twice.len());
    }

    /// Counts calls instead of storing anything.
    #[derive(Default)]
    struct CountingStrategy {
        stores: AtomicUsize,
        deletes: AtomicUsize,
    }

    #[async_trait]
    impl StorageStrategy for CountingStrategy {
        async fn store(&self, _user: UserId, file_id: &str, staged: StagedFile) -> anyhow::Result<StoredFile> {
            self.stores.fetch_add(1, Ordering::SeqCst);
            let bytes = staged.size();
            staged.claim();
            Ok(StoredFile {
                filepath: format!("/stored/{file_id}"),
                bytes,
            })
        }

        async fn delete(&self, _record: &FileRecord) -> anyhow::Result<()> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn fetch(&self, _file_id: &str) -> anyhow::Result<FetchedContent> {
            anyhow::bail!("not used")
        }
    }

    /// Always fails to store.
    struct FailingStrategy;

    #[async_trait]
    impl StorageStrategy for FailingStrategy {
        async fn store(&self, _user: UserId, _file_id: &str, _staged: StagedFile) -> anyhow::Result<StoredFile> {
            anyhow::bail!("backing store unavailable")
        }

        async fn delete(&self, _record: &FileRecord) -> anyhow::Result<()> {
            anyhow::bail!("backing store unavailable")
        }

        async fn fetch(&self, _file_id: &str) -> anyhow::Result<FetchedContent> {
            anyhow::bail!("backing store unavailable")
        }
    }

    fn service_with(strategy: Arc<dyn StorageStrategy>) -> FileService {
        FileService::new(
            Arc::new(InMemoryFileRecords::new()),
            StorageRegistry::new().register("local", strategy),
        )
    }

    async fn staged_file(dir: &std::path::Path) -> StagedFile {
        StagedFile::create(dir, "doc.txt", "text/plain", Bytes::from_static(b"hello"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_delete_empty_after_filter_skips_collaborators() {
        let strategy = Arc::new(CountingStrategy::default());
        let service = service_with(strategy.clone());

        let outcome = service
            .delete(Uuid::new_v4(), vec![item("junk", "/a"), item("", "/b")])
            .await
            .unwrap();

        assert_eq!(outcome, DeleteOutcome::NothingToDelete);
        assert_eq!(strategy.deletes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_delete_dispatches_per_entry() {
        let strategy = Arc::new(CountingStrategy::default());
        let records = Arc::new(InMemoryFileRecords::new());
        let service = FileService::new(records.clone(), StorageRegistry::new().register("local", strategy.clone()));
        let user = Uuid::new_v4();

        let a = Uuid::new_v4().to_string();
        let b = Uuid::new_v4().to_string();
        for file_id in [&a, &b] {
            records
                .create(FileRecord {
                    file_id: file_id.clone(),
                    filepath: format!("/stored/{file_id}"),
                    user,
                    endpoint: "local".to_string(),
                    filename: "doc.txt".to_string(),
                    bytes: 5,
                    content_type: "text/plain".to_string(),
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        let outcome = service
            .delete(user, vec![item(&a, "/stored/a"), item(&b, "/stored/b"), item("junk", "/x")])
            .await
            .unwrap();

        assert_eq!(outcome, DeleteOutcome::Deleted { count: 2 });
        assert_eq!(strategy.deletes.load(Ordering::SeqCst), 2);
        assert!(records.list_for_user(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_endpoint_is_a_request_error() {
        let records = Arc::new(InMemoryFileRecords::new());
        let service = FileService::new(
            records.clone(),
            StorageRegistry::new().register("local", Arc::new(CountingStrategy::default())),
        );
        let user = Uuid::new_v4();

        let file_id = Uuid::new_v4().to_string();
        records
            .create(FileRecord {
                file_id: file_id.clone(),
                filepath: "/stored/a".to_string(),
                user,
                endpoint: "unknown".to_string(),
                filename: "doc.txt".to_string(),
                bytes: 5,
                content_type: "text/plain".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let err = service.delete(user, vec![item(&file_id, "/stored/a")]).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_skips_entries_the_caller_does_not_own() {
        let strategy = Arc::new(CountingStrategy::default());
        let records = Arc::new(InMemoryFileRecords::new());
        let service = FileService::new(records.clone(), StorageRegistry::new().register("local", strategy.clone()));
        let owner = Uuid::new_v4();
        let caller = Uuid::new_v4();

        let file_id = Uuid::new_v4().to_string();
        records
            .create(FileRecord {
                file_id: file_id.clone(),
                filepath: "/stored/a".to_string(),
                user: owner,
                endpoint: "local".to_string(),
                filename: "doc.txt".to_string(),
                bytes: 5,
                content_type: "text/plain".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let outcome = service.delete(caller, vec![item(&file_id, "/stored/a")]).await.unwrap();

        // No content was touched and the owner's record survives
        assert_eq!(outcome, DeleteOutcome::Deleted { count: 0 });
        assert_eq!(strategy.deletes.load(Ordering::SeqCst), 0);
        assert!(records.get(owner, &file_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_upload_substitutes_server_id() {
        let service = service_with(Arc::new(CountingStrategy::default()));
        let staging = tempfile::tempdir().unwrap();

        let client_id = Uuid::new_v4().to_string();
        let server_id = Uuid::new_v4();

        let record = service
            .upload(
                Uuid::new_v4(),
                UploadRequest {
                    endpoint: "local".to_string(),
                    client_file_id: client_id.clone(),
                    server_file_id: server_id,
                    staged: staged_file(staging.path()).await,
                },
            )
            .await
            .unwrap();

        assert_eq!(record.file_id, server_id.to_string());
        assert_ne!(record.file_id, client_id);
        assert_eq!(record.bytes, 5);
        assert_eq!(record.filename, "doc.txt");
    }

    #[tokio::test]
    async fn test_upload_rejects_non_uuid_client_id() {
        let service = service_with(Arc::new(CountingStrategy::default()));
        let staging = tempfile::tempdir().unwrap();
        let staged = staged_file(staging.path()).await;
        let staged_path = staged.path().to_path_buf();

        let err = service
            .upload(
                Uuid::new_v4(),
                UploadRequest {
                    endpoint: "local".to_string(),
                    // foreign-style ids are not acceptable as client upload ids
                    client_file_id: "file-abc".to_string(),
                    server_file_id: Uuid::new_v4(),
                    staged,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::BadRequest { .. }));
        // The staged copy was cleaned up when the request was dropped
        assert!(!staged_path.exists());
    }

    #[tokio::test]
    async fn test_upload_storage_failure_cleans_staged_copy() {
        let service = service_with(Arc::new(FailingStrategy));
        let staging = tempfile::tempdir().unwrap();
        let staged = staged_file(staging.path()).await;
        let staged_path = staged.path().to_path_buf();

        let err = service
            .upload(
                Uuid::new_v4(),
                UploadRequest {
                    endpoint: "local".to_string(),
                    client_file_id: Uuid::new_v4().to_string(),
                    server_file_id: Uuid::new_v4(),
                    staged,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Storage { .. }));
        assert!(!staged_path.exists());
    }

    #[tokio::test]
    async fn test_upload_record_is_listed_afterwards() {
        let records = Arc::new(InMemoryFileRecords::new());
        let service = FileService::new(
            records.clone(),
            StorageRegistry::new().register("local", Arc::new(CountingStrategy::default())),
        );
        let staging = tempfile::tempdir().unwrap();
        let user = Uuid::new_v4();

        service
            .upload(
                user,
                UploadRequest {
                    endpoint: "local".to_string(),
                    client_file_id: Uuid::new_v4().to_string(),
                    server_file_id: Uuid::new_v4(),
                    staged: staged_file(staging.path()).await,
                },
            )
            .await
            .unwrap();

        let listed = service.list(user).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].endpoint, "local");
    }
}

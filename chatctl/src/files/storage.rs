//! Storage strategies.
//!
//! Each upload endpoint maps to a [`StorageStrategy`] that decides where
//! file content lives. Strategies are registered under the endpoint string
//! sent by the client and resolved per request; the object-storage driver
//! itself stays behind this trait.

use async_trait::async_trait;
use axum::body::Body;
use std::{collections::HashMap, path::PathBuf, sync::Arc};

use crate::{
    files::staged::StagedFile,
    types::{FileRecord, UserId},
};

/// Result of persisting a staged upload.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    /// Strategy-specific locator: a local path or a provider reference
    pub filepath: String,
    pub bytes: u64,
}

/// Content fetched back from a strategy.
pub struct FetchedContent {
    /// Filename as known to the strategy, when it has one
    pub filename: Option<String>,
    pub body: Body,
}

#[async_trait]
pub trait StorageStrategy: Send + Sync {
    /// Persist a staged upload under `file_id` for `user`.
    ///
    /// The strategy owns the staged file: it claims it when the staged copy
    /// becomes (or remains) durable, and drops it otherwise, in which case
    /// the staged copy is removed.
    async fn store(&self, user: UserId, file_id: &str, staged: StagedFile) -> anyhow::Result<StoredFile>;

    /// Remove the content referenced by `record.filepath`.
    async fn delete(&self, record: &FileRecord) -> anyhow::Result<()>;

    /// Fetch content by file id.
    async fn fetch(&self, file_id: &str) -> anyhow::Result<FetchedContent>;
}

/// Strategies keyed by the endpoint string sent with the request.
#[derive(Clone, Default)]
pub struct StorageRegistry {
    strategies: HashMap<String, Arc<dyn StorageStrategy>>,
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, endpoint: impl Into<String>, strategy: Arc<dyn StorageStrategy>) -> Self {
        self.strategies.insert(endpoint.into(), strategy);
        self
    }

    pub fn get(&self, endpoint: &str) -> Option<Arc<dyn StorageStrategy>> {
        self.strategies.get(endpoint).cloned()
    }
}

/// Filesystem-backed strategy. Files live flat under the storage root, named
/// by their canonical id.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn path_for(&self, file_id: &str) -> PathBuf {
        self.root.join(file_id)
    }
}

#[async_trait]
impl StorageStrategy for LocalStorage {
    async fn store(&self, _user: UserId, file_id: &str, staged: StagedFile) -> anyhow::Result<StoredFile> {
        tokio::fs::create_dir_all(&self.root).await?;

        let bytes = staged.size();
        let dest = self.path_for(file_id);
        let source = staged.claim();

        // Rename when staging and storage share a filesystem, copy otherwise
        if let Err(rename_err) = tokio::fs::rename(&source, &dest).await {
            tokio::fs::copy(&source, &dest)
                .await
                .map_err(|copy_err| anyhow::anyhow!("rename failed ({rename_err}), copy failed: {copy_err}"))?;
            if let Err(e) = tokio::fs::remove_file(&source).await {
                tracing::warn!("Failed to remove staged file {} after copy: {}", source.display(), e);
            }
        }

        Ok(StoredFile {
            filepath: dest.to_string_lossy().into_owned(),
            bytes,
        })
    }

    async fn delete(&self, record: &FileRecord) -> anyhow::Result<()> {
        // Content lives flat under the root, named by the canonical id. The
        // path is derived from the id alone; the request-supplied filepath is
        // never trusted here. The id must stay a single path component so it
        // cannot address anything outside the root.
        let file_id = record.file_id.as_str();
        if file_id.is_empty() || file_id.contains(['/', '\\']) || file_id == "." || file_id == ".." {
            anyhow::bail!("refusing to delete invalid file id '{file_id}'");
        }
        tokio::fs::remove_file(self.path_for(file_id)).await?;
        Ok(())
    }

    async fn fetch(&self, file_id: &str) -> anyhow::Result<FetchedContent> {
        let content = tokio::fs::read(self.path_for(file_id)).await?;
        Ok(FetchedContent {
            filename: None,
            body: Body::from(content),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use chrono::Utc;
    use uuid::Uuid;

    async fn staged(dir: &std::path::Path, data: &'static [u8]) -> StagedFile {
        StagedFile::create(dir, "doc.txt", "text/plain", Bytes::from_static(data))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_store_moves_staged_file() {
        let staging = tempfile::tempdir().unwrap();
        let storage = tempfile::tempdir().unwrap();
        let strategy = LocalStorage::new(storage.path().to_path_buf());

        let file = staged(staging.path(), b"content").await;
        let staged_path = file.path().to_path_buf();

        let stored = strategy.store(Uuid::new_v4(), "abc-123", file).await.unwrap();

        assert_eq!(stored.bytes, 7);
        assert!(!staged_path.exists());
        assert_eq!(tokio::fs::read(&stored.filepath).await.unwrap(), b"content");
    }

    fn record_with(file_id: &str, filepath: &str) -> FileRecord {
        FileRecord {
            file_id: file_id.to_string(),
            filepath: filepath.to_string(),
            user: Uuid::new_v4(),
            endpoint: "local".to_string(),
            filename: "doc.txt".to_string(),
            bytes: 0,
            content_type: "text/plain".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_delete_rejects_traversal_ids() {
        let base = tempfile::tempdir().unwrap();
        let root = base.path().join("root");
        tokio::fs::create_dir_all(&root).await.unwrap();
        let victim = base.path().join("victim.txt");
        tokio::fs::write(&victim, b"keep me").await.unwrap();

        let strategy = LocalStorage::new(root);

        let record = record_with("../victim.txt", victim.to_str().unwrap());
        assert!(strategy.delete(&record).await.is_err());
        assert!(victim.exists());

        assert!(strategy.delete(&record_with("..", "/x")).await.is_err());
        assert!(strategy.delete(&record_with("", "/x")).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_ignores_request_supplied_filepath() {
        let base = tempfile::tempdir().unwrap();
        let root = base.path().join("root");
        let victim = base.path().join("victim.txt");
        tokio::fs::write(&victim, b"keep me").await.unwrap();

        let staging = tempfile::tempdir().unwrap();
        let strategy = LocalStorage::new(root.clone());
        let file = staged(staging.path(), b"content").await;
        strategy.store(Uuid::new_v4(), "abc-123", file).await.unwrap();

        // filepath points outside the root, as an attacker would send it
        let crafted = format!("{}/../victim.txt", root.display());
        strategy.delete(&record_with("abc-123", &crafted)).await.unwrap();

        // Only the id-derived path was removed
        assert!(!root.join("abc-123").exists());
        assert!(victim.exists());
    }

    #[tokio::test]
    async fn test_store_then_fetch_roundtrip() {
        let staging = tempfile::tempdir().unwrap();
        let storage = tempfile::tempdir().unwrap();
        let strategy = LocalStorage::new(storage.path().to_path_buf());

        let file = staged(staging.path(), b"payload").await;
        strategy.store(Uuid::new_v4(), "f1", file).await.unwrap();

        let fetched = strategy.fetch("f1").await.unwrap();
        assert!(fetched.filename.is_none());
        let bytes = axum::body::to_bytes(fetched.body, usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"payload");
    }

    #[tokio::test]
    async fn test_registry_lookup() {
        let storage = tempfile::tempdir().unwrap();
        let registry = StorageRegistry::new().register("local", Arc::new(LocalStorage::new(storage.path().to_path_buf())));

        assert!(registry.get("local").is_some());
        assert!(registry.get("openAI").is_none());
    }
}

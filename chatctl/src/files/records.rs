//! File metadata store.
//!
//! Persistence is a collaborator behind the [`FileRecords`] trait. The
//! service ships an in-memory implementation for development and tests;
//! production deployments plug in their own store.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::types::{FileRecord, UserId};

/// Metadata store for file records.
///
/// Implementations report failures as `anyhow::Error`; the service layer
/// maps them onto the request-level error contract.
#[async_trait]
pub trait FileRecords: Send + Sync {
    /// All records owned by `user`, in persistence order.
    async fn list_for_user(&self, user: UserId) -> anyhow::Result<Vec<FileRecord>>;

    /// Persist a new record.
    async fn create(&self, record: FileRecord) -> anyhow::Result<FileRecord>;

    /// Look up one record owned by `user`.
    async fn get(&self, user: UserId, file_id: &str) -> anyhow::Result<Option<FileRecord>>;

    /// Remove the given records owned by `user`, returning how many were
    /// removed. Ids with no matching record are skipped, not errors.
    async fn delete_batch(&self, user: UserId, file_ids: &[String]) -> anyhow::Result<u64>;
}

/// In-memory metadata store. Insertion order is the persistence order.
#[derive(Debug, Default)]
pub struct InMemoryFileRecords {
    records: Mutex<Vec<FileRecord>>,
}

impl InMemoryFileRecords {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileRecords for InMemoryFileRecords {
    async fn list_for_user(&self, user: UserId) -> anyhow::Result<Vec<FileRecord>> {
        let records = self.records.lock().map_err(|_| anyhow::anyhow!("records lock poisoned"))?;
        Ok(records.iter().filter(|r| r.user == user).cloned().collect())
    }

    async fn create(&self, record: FileRecord) -> anyhow::Result<FileRecord> {
        let mut records = self.records.lock().map_err(|_| anyhow::anyhow!("records lock poisoned"))?;
        records.push(record.clone());
        Ok(record)
    }

    async fn get(&self, user: UserId, file_id: &str) -> anyhow::Result<Option<FileRecord>> {
        let records = self.records.lock().map_err(|_| anyhow::anyhow!("records lock poisoned"))?;
        Ok(records.iter().find(|r| r.user == user && r.file_id == file_id).cloned())
    }

    async fn delete_batch(&self, user: UserId, file_ids: &[String]) -> anyhow::Result<u64> {
        let mut records = self.records.lock().map_err(|_| anyhow::anyhow!("records lock poisoned"))?;
        let before = records.len();
        records.retain(|r| !(r.user == user && file_ids.iter().any(|id| *id == r.file_id)));
        Ok((before - records.len()) as u64)
    }
}

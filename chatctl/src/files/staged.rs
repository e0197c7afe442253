//! Staged upload files with scoped cleanup.
//!
//! Multipart uploads are written to a staging directory before a storage
//! strategy takes them over. A [`StagedFile`] removes its path on drop
//! unless a strategy claims it, so every failure path gets exactly one
//! best-effort cleanup without bookkeeping in the handlers.

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

/// An upload staged on local disk, pending a storage strategy decision.
///
/// Dropping a `StagedFile` removes the file. Removal failures are logged and
/// never escalated; the staging directory is periodically cleanable anyway.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    filename: String,
    content_type: String,
    size: u64,
    claimed: bool,
}

impl StagedFile {
    /// Write multipart bytes to a fresh file under `staging_dir`.
    pub async fn create(staging_dir: &Path, filename: &str, content_type: &str, data: Bytes) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(staging_dir).await?;

        let path = staging_dir.join(Uuid::new_v4().to_string());
        let size = data.len() as u64;

        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        Ok(Self {
            path,
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            size,
            claimed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Take ownership of the staged path, suppressing cleanup.
    ///
    /// A strategy claims the file when the staged copy becomes (or remains)
    /// the durable one.
    pub fn claim(mut self) -> PathBuf {
        self.claimed = true;
        std::mem::take(&mut self.path)
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.claimed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            // Best effort. The file may already be gone if a strategy moved it.
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove staged file {}: {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedFile::create(dir.path(), "notes.txt", "text/plain", Bytes::from_static(b"hello"))
            .await
            .unwrap();

        assert_eq!(staged.size(), 5);
        assert_eq!(staged.filename(), "notes.txt");
        assert_eq!(tokio::fs::read(staged.path()).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedFile::create(dir.path(), "a.bin", "application/octet-stream", Bytes::from_static(b"x"))
            .await
            .unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());

        drop(staged);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_claim_suppresses_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedFile::create(dir.path(), "a.bin", "application/octet-stream", Bytes::from_static(b"x"))
            .await
            .unwrap();

        let path = staged.claim();
        assert!(path.exists());

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_drop_after_external_removal_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedFile::create(dir.path(), "a.bin", "application/octet-stream", Bytes::from_static(b"x"))
            .await
            .unwrap();

        tokio::fs::remove_file(staged.path()).await.unwrap();
        // Drop must not panic when the file is already gone
        drop(staged);
    }
}

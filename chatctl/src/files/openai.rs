//! OpenAI-compatible file API client and storage strategy.
//!
//! The client wraps the provider's `/files` endpoints. The strategy layers
//! the [`StorageStrategy`] contract on top so `openAI` uploads and deletes
//! dispatch like any other endpoint, and the download passthrough can relay
//! provider content without buffering it.

use async_trait::async_trait;
use axum::body::Body;
use serde::Deserialize;
use tracing::debug;

use crate::{
    config::ProviderEndpointConfig,
    files::{
        staged::StagedFile,
        storage::{FetchedContent, StorageStrategy, StoredFile},
    },
    types::{FileRecord, UserId},
};

/// File metadata as returned by the provider's `GET /files/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderFileMetadata {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub bytes: u64,
}

/// Client for an OpenAI-compatible `/files` API.
#[derive(Clone)]
pub struct OpenAiFiles {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiFiles {
    pub fn new(config: &ProviderEndpointConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn files_url(&self, suffix: &str) -> String {
        format!("{}/files{}", self.base_url, suffix)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    /// Fetch file metadata, primarily for the provider-held filename.
    pub async fn metadata(&self, file_id: &str) -> anyhow::Result<ProviderFileMetadata> {
        let response = self
            .authorize(self.client.get(self.files_url(&format!("/{file_id}"))))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// Open a streaming GET on the file content.
    pub async fn content(&self, file_id: &str) -> anyhow::Result<reqwest::Response> {
        let response = self
            .authorize(self.client.get(self.files_url(&format!("/{file_id}/content"))))
            .send()
            .await?
            .error_for_status()?;
        Ok(response)
    }

    /// Upload file bytes under the given filename.
    pub async fn upload(&self, filename: &str, content_type: &str, data: Vec<u8>) -> anyhow::Result<ProviderFileMetadata> {
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(filename.to_string())
            .mime_str(content_type)?;
        let form = reqwest::multipart::Form::new().text("purpose", "assistants").part("file", part);

        let response = self
            .authorize(self.client.post(self.files_url("")))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// Delete a file on the provider.
    pub async fn delete(&self, file_id: &str) -> anyhow::Result<()> {
        self.authorize(self.client.delete(self.files_url(&format!("/{file_id}"))))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Strategy persisting uploads to the provider's file store.
pub struct OpenAiStorage {
    client: OpenAiFiles,
    /// Keep the staged copy around after a successful remote store
    retain_staged: bool,
}

impl OpenAiStorage {
    pub fn new(client: OpenAiFiles, retain_staged: bool) -> Self {
        Self { client, retain_staged }
    }
}

#[async_trait]
impl StorageStrategy for OpenAiStorage {
    async fn store(&self, _user: UserId, file_id: &str, staged: StagedFile) -> anyhow::Result<StoredFile> {
        let data = tokio::fs::read(staged.path()).await?;
        let bytes = staged.size();

        let uploaded = self.client.upload(staged.filename(), staged.content_type(), data).await?;
        debug!("Stored {} with provider as {}", file_id, uploaded.id);

        if self.retain_staged {
            staged.claim();
        }
        // Otherwise the staged copy is removed when `staged` drops here

        Ok(StoredFile {
            filepath: uploaded.id,
            bytes,
        })
    }

    async fn delete(&self, record: &FileRecord) -> anyhow::Result<()> {
        // filepath holds the provider-issued id for this strategy
        self.client.delete(&record.filepath).await
    }

    async fn fetch(&self, file_id: &str) -> anyhow::Result<FetchedContent> {
        let metadata = self.client.metadata(file_id).await?;
        let response = self.client.content(file_id).await?;

        Ok(FetchedContent {
            filename: Some(metadata.filename),
            body: Body::from_stream(response.bytes_stream()),
        })
    }
}

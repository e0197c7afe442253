//! Request and response models for the file routes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::{FileRecord, Timestamp, UserId};

/// One file in a batch delete request. Clients send back the record fields
/// they hold; only `file_id` and `filepath` gate the filter.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteFileItem {
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub filepath: String,
    #[serde(default)]
    pub endpoint: String,
}

/// Body of `DELETE /files`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteFilesRequest {
    pub files: Vec<DeleteFileItem>,
}

/// Generic message payload used by the delete route.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Response to a successful upload: the persisted record plus the client's
/// optimistic id so it can reconcile its local state.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileUploadResponse {
    pub file_id: String,
    pub temp_file_id: String,
    pub filepath: String,
    pub endpoint: String,
    pub filename: String,
    pub bytes: u64,
    #[serde(rename = "type")]
    pub content_type: String,
    #[schema(value_type = String, format = "uuid")]
    pub user: UserId,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: Timestamp,
}

impl FileUploadResponse {
    pub fn from_record(record: FileRecord, temp_file_id: String) -> Self {
        Self {
            file_id: record.file_id,
            temp_file_id,
            filepath: record.filepath,
            endpoint: record.endpoint,
            filename: record.filename,
            bytes: record.bytes,
            content_type: record.content_type,
            user: record.user,
            created_at: record.created_at,
        }
    }
}

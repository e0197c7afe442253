//! Shared domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Owner identity for file records, taken from the verified session.
pub type UserId = Uuid;

/// Timestamp alias used across records
pub type Timestamp = DateTime<Utc>;

/// Metadata record for a stored attachment.
///
/// `file_id` is either a server-generated UUID (internally stored files) or
/// a provider-issued identifier starting with `file-` (foreign files).
/// `filepath` is the strategy-specific locator: a path under the local
/// storage root, or a provider URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct FileRecord {
    pub file_id: String,
    pub filepath: String,
    #[schema(value_type = String, format = "uuid")]
    pub user: UserId,
    pub endpoint: String,
    pub filename: String,
    pub bytes: u64,
    #[serde(rename = "type")]
    pub content_type: String,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: Timestamp,
}

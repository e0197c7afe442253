use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Metadata store unreachable or inconsistent. Surfaces as a request
    /// failure (400-class) on the list/delete paths, matching the file
    /// routes' contract.
    #[error("metadata store failure")]
    Persistence(#[source] anyhow::Error),

    /// Content removal failed during a batch delete. Surfaces as a request
    /// failure (400-class) per the delete route's contract, unlike the other
    /// storage failures.
    #[error("failed to remove file content")]
    DeleteContent(#[source] anyhow::Error),

    /// Storage strategy failed to store, fetch or delete file content
    #[error("storage failure while trying to {operation}")]
    Storage {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    /// Foreign provider network/auth/not-found error
    #[error("upstream failure from {provider}")]
    Upstream {
        provider: String,
        #[source]
        source: anyhow::Error,
    },

    /// Terminal outcome of a failed upload. The internal cause has already
    /// been logged and cleanup has run by the time this is constructed.
    #[error("Error processing file")]
    UploadProcessing,

    /// Terminal outcome of a failed passthrough download
    #[error("Error downloading file")]
    Download,

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Persistence(_) => StatusCode::BAD_REQUEST,
            Error::DeleteContent(_) => StatusCode::BAD_REQUEST,
            Error::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::UploadProcessing => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Download => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::BadRequest { message } => message.clone(),
            Error::NotFound { resource, id } => format!("{resource} with ID {id} not found"),
            Error::Persistence(source) => format!("Error in request: {source}"),
            Error::DeleteContent(source) => format!("Error in request: {source}"),
            Error::Storage { .. } => "Internal server error".to_string(),
            Error::Upstream { .. } => "Internal server error".to_string(),
            Error::UploadProcessing => "Error processing file".to_string(),
            Error::Download => "Error downloading file".to_string(),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Storage { .. } | Error::Upstream { .. } | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Persistence(_) => {
                tracing::warn!("Metadata store error: {:#}", self);
            }
            Error::DeleteContent(_) => {
                tracing::warn!("Content removal error: {:#}", self);
            }
            Error::Unauthenticated { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
            Error::UploadProcessing | Error::Download => {
                // Cause already logged at the failure site
                tracing::debug!("Request failed: {}", self);
            }
        }

        let status = self.status_code();
        let body = json!({ "message": self.user_message() });

        (status, axum::response::Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

use crate::AppState;
use crate::api::models::files::{DeleteFilesRequest, FileUploadResponse, MessageResponse};
use crate::auth::CurrentUser;
use crate::errors::{Error, Result};
use crate::files::service::{DeleteOutcome, UploadRequest};
use crate::files::staged::StagedFile;
use crate::types::FileRecord;
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/files",
    tag = "files",
    summary = "List files",
    description = "List all file records owned by the authenticated user, in persistence order.",
    responses(
        (status = 200, description = "File records", body = Vec<FileRecord>),
        (status = 400, description = "Metadata store failure"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_files(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<Vec<FileRecord>>> {
    let files = state.files.list(current_user.id).await?;
    Ok(Json(files))
}

#[utoipa::path(
    delete,
    path = "/files",
    tag = "files",
    summary = "Delete files",
    description = "Delete a batch of files. Entries without both a file_id and a filepath, or with an \
                   id outside the known namespaces, are silently dropped before processing.",
    request_body = DeleteFilesRequest,
    responses(
        (status = 200, description = "Files deleted successfully", body = MessageResponse),
        (status = 204, description = "Nothing provided to delete"),
        (status = 400, description = "Delete failed"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn delete_files(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<DeleteFilesRequest>,
) -> Result<Response> {
    match state.files.delete(current_user.id, request.files).await? {
        DeleteOutcome::NothingToDelete => Ok(StatusCode::NO_CONTENT.into_response()),
        DeleteOutcome::Deleted { .. } => Ok(Json(MessageResponse {
            message: "Files deleted successfully".to_string(),
        })
        .into_response()),
    }
}

#[utoipa::path(
    get,
    path = "/files/download/{file_id}",
    tag = "files",
    summary = "Download a provider-held file",
    description = "Relay a foreign file from the provider as an attachment, streaming the content \
                   without buffering it.",
    params(("file_id" = String, Path, description = "Provider-issued file identifier")),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Error downloading file")
    )
)]
pub async fn download_file(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(file_id): Path<String>,
) -> Result<Response> {
    let fetched = match state.files.download(&file_id).await {
        Ok(fetched) => fetched,
        Err(e) => {
            tracing::error!("Error downloading file {}: {:#}", file_id, e);
            return Err(Error::Download);
        }
    };

    let filename = fetched.filename.unwrap_or_else(|| file_id.clone());
    let disposition =
        header::HeaderValue::from_str(&format!("attachment; filename=\"{filename}\"")).map_err(|e| {
            tracing::error!("Error downloading file {}: invalid filename header: {}", file_id, e);
            Error::Download
        })?;

    let mut response = fetched.body.into_response();
    response.headers_mut().insert(header::CONTENT_DISPOSITION, disposition);
    Ok(response)
}

#[utoipa::path(
    post,
    path = "/files",
    tag = "files",
    summary = "Upload file",
    description = "Upload a file via multipart form data. Requires `file`, `endpoint` and `file_id` \
                   parts; the client's file_id is replaced with a server-generated id and echoed \
                   back as temp_file_id.",
    request_body(
        content_type = "multipart/form-data",
        description = "File upload with endpoint and client file_id"
    ),
    responses(
        (status = 200, description = "File stored", body = FileUploadResponse),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Error processing file")
    )
)]
pub async fn upload_file(
    State(state): State<AppState>,
    current_user: CurrentUser,
    multipart: Multipart,
) -> Result<Json<FileUploadResponse>> {
    // Generate the canonical id upfront, before any service logic runs
    let server_file_id = Uuid::new_v4();

    match process_upload(&state, &current_user, server_file_id, multipart).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            // Staged-file cleanup already ran when the staged handle dropped
            tracing::error!("Error processing file upload: {:#}", e);
            Err(Error::UploadProcessing)
        }
    }
}

async fn process_upload(
    state: &AppState,
    current_user: &CurrentUser,
    server_file_id: Uuid,
    mut multipart: Multipart,
) -> Result<FileUploadResponse> {
    let mut staged: Option<StagedFile> = None;
    let mut endpoint: Option<String> = None;
    let mut client_file_id: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| Error::BadRequest {
        message: format!("Failed to parse multipart data: {}", e),
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("file").to_string();
                let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();

                let data = field.bytes().await.map_err(|e| Error::BadRequest {
                    message: format!("Failed to read file data: {}", e),
                })?;

                let max_file_size = state.config.files.max_file_size;
                if max_file_size > 0 && data.len() as u64 > max_file_size {
                    return Err(Error::BadRequest {
                        message: format!("File size exceeds maximum allowed size of {} bytes", max_file_size),
                    });
                }

                staged = Some(
                    StagedFile::create(&state.config.files.staging_dir, &filename, &content_type, data)
                        .await
                        .map_err(|source| Error::Storage {
                            operation: "stage upload".to_string(),
                            source,
                        })?,
                );
            }
            "endpoint" => {
                endpoint = Some(field.text().await.map_err(|e| Error::BadRequest {
                    message: format!("Failed to read endpoint field: {}", e),
                })?);
            }
            "file_id" => {
                client_file_id = Some(field.text().await.map_err(|e| Error::BadRequest {
                    message: format!("Failed to read file_id field: {}", e),
                })?);
            }
            // Free-form extras are accepted and ignored
            _ => {}
        }
    }

    // Preconditions, checked in order
    let staged = staged.ok_or_else(|| Error::BadRequest {
        message: "No file provided".to_string(),
    })?;
    let endpoint = endpoint.ok_or_else(|| Error::BadRequest {
        message: "No endpoint provided".to_string(),
    })?;
    let client_file_id = client_file_id.ok_or_else(|| Error::BadRequest {
        message: "No file_id provided".to_string(),
    })?;

    let record = state
        .files
        .upload(
            current_user.id,
            UploadRequest {
                endpoint,
                client_file_id: client_file_id.clone(),
                server_file_id,
                staged,
            },
        )
        .await?;

    Ok(FileUploadResponse::from_record(record, client_file_id))
}

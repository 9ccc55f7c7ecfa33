use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, body::Body};
use chrono::Utc;
use common::storage::{BlobHandle, BlobStore, BoxReader, StoredBlob};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::files::{FileListQuery, FileRecord, FileUpdate};
use crate::models::file::{
    DEFAULT_PAGE_SIZE, FileListQueryParams, FileListResponse, FileResponse, UpdateFileRequest,
};
use crate::models::shared::Pagination;
use crate::persona::CallerContext;
use crate::state::AppState;
use crate::utils::filename::{base_name, content_disposition_value, validate_flat_filename};

/// Body limit for uploads: the blob limit plus room for multipart framing.
pub fn upload_body_limit(max_blob_size: u64) -> DefaultBodyLimit {
    let limit = max_blob_size.saturating_add(64 * 1024);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "Files",
    operation_id = "uploadFile",
    summary = "Upload a file",
    description = "Stores the `file` multipart field and records it in the caller's partition. \
        Callers without a persona upload under their anonymous id.",
    params(("X-Client-ID" = String, Header, description = "Persona or anonymous client id")),
    request_body(content_type = "multipart/form-data", description = "File upload"),
    responses(
        (status = 201, description = "File stored", body = FileResponse),
        (status = 400, description = "Missing client id, file or name; file too large (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(caller, state, multipart), fields(client_id))]
pub async fn upload_file(
    caller: CallerContext,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let owner_id = caller.require_id()?.to_string();
    tracing::Span::current().record("client_id", owner_id.as_str());

    let mut upload: Option<(StoredBlob, String)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let raw_name = field
            .file_name()
            .ok_or_else(|| AppError::Validation("File field must have a filename".into()))?;
        let original_name = validate_flat_filename(base_name(raw_name))
            .map_err(|e| AppError::Validation(e.message().into()))?
            .to_string();

        let stored = stream_field_to_store(
            field,
            &*state.blob_store,
            state.config.storage.max_blob_size,
        )
        .await?;
        upload = Some((stored, original_name));
        break;
    }

    let (stored, original_name) =
        upload.ok_or_else(|| AppError::Validation("No file is received".into()))?;

    let record = FileRecord {
        id: Uuid::new_v4().to_string(),
        original_name,
        stored_location: stored.handle.to_string(),
        size: i64::try_from(stored.size).unwrap_or(i64::MAX),
        upload_time: Utc::now().timestamp(),
        owner_id,
        download_link: Uuid::new_v4().to_string(),
        is_public: false,
    };

    let record = match state.files.create(record).await {
        Ok(record) => record,
        Err(e) => {
            if let Err(cleanup) = state.blob_store.delete(&stored.handle).await {
                warn!(handle = %stored.handle, error = %cleanup, "Failed to discard orphaned blob");
            }
            return Err(e);
        }
    };

    let file = state.files.get(&record.id).await?;
    Ok((StatusCode::CREATED, Json(FileResponse::from(file))))
}

#[utoipa::path(
    get,
    path = "/files",
    tag = "Files",
    operation_id = "listFiles",
    summary = "List files",
    description = "Administrators see every partition; everyone else sees only their own files. \
        Newest first, `page` is 1-based and `limit` defaults to 8.",
    params(
        FileListQueryParams,
        ("X-Client-ID" = String, Header, description = "Persona or anonymous client id"),
    ),
    responses(
        (status = 200, description = "One page of files", body = FileListResponse),
        (status = 400, description = "Missing client id (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(caller, state, params), fields(client_id, is_admin))]
pub async fn list_files(
    caller: CallerContext,
    State(state): State<AppState>,
    Query(params): Query<FileListQueryParams>,
) -> Result<Json<FileListResponse>, AppError> {
    let is_admin = caller.is_admin();
    let owner_id = if is_admin {
        None
    } else {
        Some(caller.require_id()?.to_string())
    };

    let span = tracing::Span::current();
    span.record("is_admin", is_admin);
    if let Some(id) = caller.id.as_deref() {
        span.record("client_id", id);
    }

    let page = params.page.filter(|&p| p >= 1).unwrap_or(1);
    let limit = params.limit.filter(|&l| l >= 1).unwrap_or(DEFAULT_PAGE_SIZE);
    let search = params.search.unwrap_or_default();
    debug!(search = %search, page, limit, "Listing files");

    let result = state
        .files
        .list(&FileListQuery {
            search,
            owner_id,
            limit,
            offset: (page - 1).saturating_mul(limit),
        })
        .await?;

    let total = result.total as u64;
    debug!(returned = result.files.len(), total, "Listed files");

    Ok(Json(FileListResponse {
        files: result.files.into_iter().map(FileResponse::from).collect(),
        total,
        pagination: Pagination::new(page.unsigned_abs(), limit.unsigned_abs(), total),
    }))
}

#[utoipa::path(
    get,
    path = "/files/{id}",
    tag = "Files",
    operation_id = "getFile",
    summary = "Get file metadata",
    description = "Visible to the owner, administrators, and anyone for public files.",
    params(
        ("id" = String, Path, description = "File id"),
        ("X-Client-ID" = Option<String>, Header, description = "Persona id"),
    ),
    responses(
        (status = 200, description = "File metadata", body = FileResponse),
        (status = 404, description = "File not found or not visible (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(caller, state))]
pub async fn get_file(
    caller: CallerContext,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FileResponse>, AppError> {
    let file = state.files.get(&id).await?;
    if !caller.can_view(&file.record) {
        return Err(AppError::NotFound("File not found".into()));
    }
    Ok(Json(file.into()))
}

#[utoipa::path(
    put,
    path = "/files/{id}",
    tag = "Files",
    operation_id = "updateFile",
    summary = "Rename or re-own a file",
    description = "Admin only. Changing `owner_id` moves the record into the new owner's \
        partition in the same step that rewrites it.",
    params(
        ("id" = String, Path, description = "File id"),
        ("X-Client-ID" = String, Header, description = "Administrator persona id"),
    ),
    request_body = UpdateFileRequest,
    responses(
        (status = 200, description = "Updated file", body = FileResponse),
        (status = 400, description = "Invalid name (VALIDATION_ERROR)", body = ErrorBody),
        (status = 403, description = "Not an administrator (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "File not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(caller, state, body))]
pub async fn update_file(
    caller: CallerContext,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(body): AppJson<UpdateFileRequest>,
) -> Result<Json<FileResponse>, AppError> {
    caller.require_admin()?;

    let file = state
        .files
        .update(
            &id,
            FileUpdate {
                original_name: body.original_name,
                owner_id: body.owner_id,
                is_public: body.is_public,
            },
        )
        .await?;

    Ok(Json(file.into()))
}

#[utoipa::path(
    delete,
    path = "/files/{id}",
    tag = "Files",
    operation_id = "deleteFile",
    summary = "Delete a file",
    description = "Owner or administrator. Removes the record, its public link and its bytes.",
    params(
        ("id" = String, Path, description = "File id"),
        ("X-Client-ID" = String, Header, description = "Persona id"),
    ),
    responses(
        (status = 204, description = "File deleted"),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "File not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(caller, state))]
pub async fn delete_file(
    caller: CallerContext,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let record = state.files.get_record(&id).await?;
    if !caller.can_modify(&record) {
        return Err(AppError::PermissionDenied(
            "You don't have permission to delete this file".into(),
        ));
    }

    state.files.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/download/{id}",
    tag = "Files",
    operation_id = "downloadFile",
    summary = "Download file content",
    description = "`id` is either a file id (owner, administrator, or public file) or a \
        public download link, which works for anyone. Supports ETag-based caching via \
        If-None-Match.",
    params(
        ("id" = String, Path, description = "File id or public download link"),
        ("X-Client-ID" = Option<String>, Header, description = "Persona id"),
    ),
    responses(
        (status = 200, description = "File content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 404, description = "File not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(caller, state, headers))]
pub async fn download_file(
    caller: CallerContext,
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let record = match state.files.get_record(&id).await {
        Ok(record) if caller.can_view(&record) => record,
        Ok(_) | Err(AppError::NotFound(_)) => state.files.find_by_public_link(&id).await?,
        Err(e) => return Err(e),
    };

    build_download_response(&record, &headers, &*state.blob_store).await
}

/// Stream a record's blob back to the client.
async fn build_download_response(
    record: &FileRecord,
    headers: &HeaderMap,
    blob_store: &dyn BlobStore,
) -> Result<Response, AppError> {
    let handle = BlobHandle::parse(&record.stored_location)?;

    let etag_value = format!("\"{handle}\"");
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && let Ok(val) = if_none_match.to_str()
        && (val == etag_value || val == "*")
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let reader = blob_store.get_stream(&handle).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    let content_type = mime_guess::from_path(&record.original_name)
        .first_or_octet_stream()
        .to_string();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, record.size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&record.original_name),
        )
        .header(header::ETAG, &etag_value)
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

/// Stream a multipart field to blob storage via a temp file.
async fn stream_field_to_store(
    mut field: axum::extract::multipart::Field<'_>,
    blob_store: &dyn BlobStore,
    max_size: u64,
) -> Result<StoredBlob, AppError> {
    let temp_path = std::env::temp_dir().join(format!("depot-upload-{}", Uuid::new_v4()));

    let result = async {
        let mut temp_file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create temp file: {e}")))?;

        let mut total_size: u64 = 0;

        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
        {
            total_size += chunk.len() as u64;
            if total_size > max_size {
                return Err(AppError::Validation(format!(
                    "File exceeds maximum size of {max_size} bytes"
                )));
            }
            temp_file
                .write_all(&chunk)
                .await
                .map_err(|e| AppError::Internal(format!("Temp file write failed: {e}")))?;
        }

        temp_file
            .flush()
            .await
            .map_err(|e| AppError::Internal(format!("Temp file flush failed: {e}")))?;
        drop(temp_file);

        let file = tokio::fs::File::open(&temp_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to reopen temp file: {e}")))?;
        let reader: BoxReader = Box::new(file);
        Ok(blob_store.put_stream(reader).await?)
    }
    .await;

    // Best effort.
    let _ = tokio::fs::remove_file(&temp_path).await;

    result
}

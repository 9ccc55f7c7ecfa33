use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::client::{ClientResponse, UpdateClientRequest};
use crate::persona::CallerContext;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/clients",
    tag = "Clients",
    operation_id = "listClients",
    summary = "List all personas",
    description = "Admin only. Sorted by display name.",
    params(("X-Client-ID" = String, Header, description = "Administrator persona id")),
    responses(
        (status = 200, description = "All personas", body = Vec<ClientResponse>),
        (status = 403, description = "Not an administrator (PERMISSION_DENIED)", body = ErrorBody),
    ),
)]
#[instrument(skip(caller, state))]
pub async fn list_clients(
    caller: CallerContext,
    State(state): State<AppState>,
) -> Result<Json<Vec<ClientResponse>>, AppError> {
    caller.require_admin()?;

    let personas = state.directory.list().await?;
    Ok(Json(personas.into_iter().map(ClientResponse::from).collect()))
}

#[utoipa::path(
    put,
    path = "/clients/{id}",
    tag = "Clients",
    operation_id = "updateClient",
    summary = "Edit a persona",
    description = "Admin only. Rewrites name, recovery code and admin flag; the id is kept. \
        An administrator cannot remove its own admin flag.",
    params(
        ("id" = String, Path, description = "Persona id"),
        ("X-Client-ID" = String, Header, description = "Administrator persona id"),
    ),
    request_body = UpdateClientRequest,
    responses(
        (status = 200, description = "Updated persona", body = ClientResponse),
        (status = 400, description = "Invalid name or code (VALIDATION_ERROR)", body = ErrorBody),
        (status = 403, description = "Not an administrator, or self-demotion (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Persona not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Recovery code in use (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(caller, state, body))]
pub async fn update_client(
    caller: CallerContext,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(body): AppJson<UpdateClientRequest>,
) -> Result<Json<ClientResponse>, AppError> {
    let persona = state
        .directory
        .update_persona_full(&caller, &id, &body.name, &body.recovery_code, body.is_admin)
        .await?;

    Ok(Json(persona.into()))
}

#[utoipa::path(
    delete,
    path = "/clients/{id}",
    tag = "Clients",
    operation_id = "deleteClient",
    summary = "Delete a persona",
    description = "Admin only. The caller's own persona and the system persona cannot be \
        deleted. Files owned by the persona are kept.",
    params(
        ("id" = String, Path, description = "Persona id"),
        ("X-Client-ID" = String, Header, description = "Administrator persona id"),
    ),
    responses(
        (status = 204, description = "Persona deleted"),
        (status = 403, description = "Not an administrator, or protected persona (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Persona not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(caller, state))]
pub async fn delete_client(
    caller: CallerContext,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.directory.delete_persona(&caller, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

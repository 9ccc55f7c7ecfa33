use axum::Json;
use axum::extract::State;
use chrono::Utc;
use tracing::{instrument, warn};

use crate::VERSION;
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::persona::{
    EscalateRequest, PersonaResponse, RecoverRequest, RecoverResponse, SetNameRequest,
    SetNameResponse, persona_label,
};
use crate::models::shared::StatusResponse;
use crate::persona::CallerContext;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/persona",
    tag = "Persona",
    operation_id = "getPersona",
    summary = "Current caller's persona",
    description = "Returns the persona behind `X-Client-ID`. Anonymous callers get empty \
        name and recovery code. Known personas have their last-active time updated.",
    params(("X-Client-ID" = Option<String>, Header, description = "Persona id")),
    responses(
        (status = 200, description = "Caller persona", body = PersonaResponse),
    ),
)]
#[instrument(skip(caller))]
pub async fn get_persona(caller: CallerContext) -> Json<PersonaResponse> {
    let is_admin = caller.is_admin();
    let (name, recovery_code) = caller
        .persona
        .map(|p| (p.name, p.recovery_code))
        .unwrap_or_default();

    Json(PersonaResponse {
        persona: persona_label(is_admin),
        name,
        recovery_code,
        version: VERSION,
    })
}

#[utoipa::path(
    post,
    path = "/persona/name",
    tag = "Persona",
    operation_id = "setPersonaName",
    summary = "Set the caller's display name",
    description = "On first use this creates the persona: a recovery code is issued, the \
        persona id is derived from it, and files uploaded under the anonymous id move to the \
        new persona. Clients must switch to the returned id.",
    params(("X-Client-ID" = String, Header, description = "Persona or anonymous client id")),
    request_body = SetNameRequest,
    responses(
        (status = 200, description = "Name saved", body = SetNameResponse),
        (status = 400, description = "Missing client id or invalid name (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "No unique recovery code available (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(caller, state, body), fields(client_id))]
pub async fn set_name(
    caller: CallerContext,
    State(state): State<AppState>,
    AppJson(body): AppJson<SetNameRequest>,
) -> Result<Json<SetNameResponse>, AppError> {
    let caller_id = caller.require_id()?;
    tracing::Span::current().record("client_id", caller_id);

    let outcome = state
        .directory
        .set_display_name(caller_id, &body.name, Utc::now().timestamp())
        .await?;

    if let Some(previous) = &outcome.adopted_from
        && let Err(e) = state.files.adopt(previous, &outcome.persona.id).await
    {
        // The persona exists now; failing here would make a retry mint a second one.
        warn!(from = %previous, error = ?e, "Failed to adopt anonymous files");
    }

    Ok(Json(SetNameResponse {
        status: "success",
        id: outcome.persona.id,
        recovery_code: outcome.persona.recovery_code,
    }))
}

#[utoipa::path(
    post,
    path = "/persona/recover",
    tag = "Persona",
    operation_id = "recoverPersona",
    summary = "Recover a persona from its recovery code",
    request_body = RecoverRequest,
    responses(
        (status = 200, description = "Persona recovered", body = RecoverResponse),
        (status = 400, description = "Malformed body (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Unknown recovery code (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, body))]
pub async fn recover(
    State(state): State<AppState>,
    AppJson(body): AppJson<RecoverRequest>,
) -> Result<Json<RecoverResponse>, AppError> {
    let persona = state
        .directory
        .recover(&body.code, Utc::now().timestamp())
        .await?;

    Ok(Json(RecoverResponse {
        persona: persona_label(persona.is_admin),
        id: persona.id,
        name: persona.name,
    }))
}

#[utoipa::path(
    post,
    path = "/persona/admin",
    tag = "Persona",
    operation_id = "activateAdmin",
    summary = "Escalate the caller to administrator",
    description = "Grants admin when the supplied secret matches the configured one. \
        Escalation is disabled when no secret is configured.",
    params(("X-Client-ID" = String, Header, description = "Persona id")),
    request_body = EscalateRequest,
    responses(
        (status = 200, description = "Caller is now an administrator", body = StatusResponse),
        (status = 400, description = "Missing client id (VALIDATION_ERROR)", body = ErrorBody),
        (status = 403, description = "Wrong or disabled secret (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Caller has no persona yet (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(caller, state, body), fields(client_id))]
pub async fn activate_admin(
    caller: CallerContext,
    State(state): State<AppState>,
    AppJson(body): AppJson<EscalateRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    let caller_id = caller.require_id()?;
    tracing::Span::current().record("client_id", caller_id);

    state
        .directory
        .escalate(caller_id, &body.secret, &state.config.identity.admin_secret)
        .await?;

    Ok(Json(StatusResponse::success()))
}

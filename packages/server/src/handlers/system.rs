use axum::Json;

use crate::VERSION;
use crate::models::shared::VersionResponse;

#[utoipa::path(
    get,
    path = "/version",
    tag = "System",
    operation_id = "getVersion",
    summary = "Server version",
    responses(
        (status = 200, description = "Running build version", body = VersionResponse),
    ),
)]
pub async fn get_version() -> Json<VersionResponse> {
    Json(VersionResponse { version: VERSION })
}

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::Utc;

use crate::error::AppError;
use crate::persona::CallerContext;
use crate::state::AppState;

/// Header carrying the caller's persona id.
pub const CLIENT_ID_HEADER: &str = "X-Client-ID";

/// Resolves the `X-Client-ID` header against the persona directory.
///
/// A missing or blank header yields an anonymous context rather than a
/// rejection; handlers that need an identity call `require_id()`. Known
/// personas have their last-active time touched as a side effect.
impl FromRequestParts<AppState> for CallerContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(CLIENT_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned);

        state
            .directory
            .resolve_caller(id, Utc::now().timestamp())
            .await
    }
}

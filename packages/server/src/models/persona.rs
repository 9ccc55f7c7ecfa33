use serde::{Deserialize, Serialize};

/// Caller's own persona as seen by the client.
#[derive(Serialize, utoipa::ToSchema)]
pub struct PersonaResponse {
    /// `client` or `admin`.
    #[schema(example = "client")]
    pub persona: &'static str,
    /// Display name; empty for anonymous callers.
    #[schema(example = "Ada")]
    pub name: String,
    /// Empty for anonymous callers.
    #[schema(example = "7QK2M9XD")]
    pub recovery_code: String,
    #[schema(example = "0.1.0")]
    pub version: &'static str,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SetNameRequest {
    #[schema(example = "Ada")]
    pub name: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SetNameResponse {
    #[schema(example = "success")]
    pub status: &'static str,
    /// Persona id the client must present from now on.
    #[schema(example = "04ae3e8a-b18d-56a1-bf4c-6a750cb4b145")]
    pub id: String,
    #[schema(example = "7QK2M9XD")]
    pub recovery_code: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct RecoverRequest {
    #[schema(example = "7QK2M9XD")]
    pub code: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RecoverResponse {
    /// `client` or `admin`.
    #[schema(example = "client")]
    pub persona: &'static str,
    #[schema(example = "04ae3e8a-b18d-56a1-bf4c-6a750cb4b145")]
    pub id: String,
    #[schema(example = "Ada")]
    pub name: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct EscalateRequest {
    pub secret: String,
}

pub fn persona_label(is_admin: bool) -> &'static str {
    if is_admin { "admin" } else { "client" }
}

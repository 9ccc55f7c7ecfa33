use serde::{Deserialize, Serialize};

use crate::persona::Persona;

/// A persona as listed to administrators.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ClientResponse {
    #[schema(example = "04ae3e8a-b18d-56a1-bf4c-6a750cb4b145")]
    pub id: String,
    #[schema(example = "Ada")]
    pub name: String,
    #[schema(example = "7QK2M9XD")]
    pub recovery_code: String,
    /// Unix seconds of the last request.
    #[schema(example = 1767225600)]
    pub last_active: i64,
    pub is_admin: bool,
}

impl From<Persona> for ClientResponse {
    fn from(persona: Persona) -> Self {
        Self {
            id: persona.id,
            name: persona.name,
            recovery_code: persona.recovery_code,
            last_active: persona.last_active,
            is_admin: persona.is_admin,
        }
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateClientRequest {
    #[schema(example = "Ada")]
    pub name: String,
    #[schema(example = "7QK2M9XD")]
    pub recovery_code: String,
    #[serde(default)]
    pub is_admin: bool,
}

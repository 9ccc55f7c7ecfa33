use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Key not found: {0}")]
    NotFound(String),

    /// The key is already held, either by a different partition or (for
    /// create-only writes) by any partition at all.
    #[error("Key conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RegistryError {
    pub(crate) fn missing(partition: &str, namespace: &str, key: &str) -> Self {
        Self::NotFound(format!("{partition}/{namespace}/{key}"))
    }

    pub(crate) fn unindexed(namespace: &str, key: &str) -> Self {
        Self::NotFound(format!("{namespace}/{key}"))
    }

    pub(crate) fn held_elsewhere(namespace: &str, key: &str, holder: &str) -> Self {
        Self::Conflict(format!("{namespace}/{key} is held by partition '{holder}'"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

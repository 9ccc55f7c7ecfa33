//! Personas: the identities every request acts under.
//!
//! A persona is one record type with an `is_admin` capability flag. Records
//! live in the system partition of the registry under [`PERSONAS`], keyed by
//! persona id.

pub mod directory;
pub mod identity;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::files::FileRecord;

pub use directory::{NameOutcome, PersonaDirectory};

/// Registry namespace holding persona records.
pub const PERSONAS: &str = "personas";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub id: String,
    pub name: String,
    pub recovery_code: String,
    /// Unix seconds of the last authenticated request.
    #[serde(default)]
    pub last_active: i64,
    #[serde(default)]
    pub is_admin: bool,
}

/// Who is making the current request.
///
/// `id` is whatever the client presented; `persona` is its directory record,
/// if one exists. Anonymous clients have an id but no record.
#[derive(Debug, Clone, Default)]
pub struct CallerContext {
    pub id: Option<String>,
    pub persona: Option<Persona>,
}

impl CallerContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_admin(&self) -> bool {
        self.persona.as_ref().is_some_and(|p| p.is_admin)
    }

    /// The caller's id, or a validation error when none was presented.
    pub fn require_id(&self) -> Result<&str, AppError> {
        self.id
            .as_deref()
            .ok_or_else(|| AppError::Validation("X-Client-ID header is required".into()))
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::PermissionDenied("Admin access required".into()))
        }
    }

    /// Whether `id` is the caller's own identity.
    pub fn is_self(&self, id: &str) -> bool {
        self.id.as_deref() == Some(id)
    }

    fn owns(&self, record: &FileRecord) -> bool {
        !record.owner_id.is_empty() && self.is_self(&record.owner_id)
    }

    pub fn can_view(&self, record: &FileRecord) -> bool {
        record.is_public || self.is_admin() || self.owns(record)
    }

    pub fn can_modify(&self, record: &FileRecord) -> bool {
        self.is_admin() || self.owns(record)
    }
}

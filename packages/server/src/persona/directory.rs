use std::sync::Arc;

use registry::{Registry, SYSTEM_PARTITION};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::identity::{
    derive_id, generate_recovery_code, normalize_recovery_code, validate_recovery_code,
};
use super::{CallerContext, PERSONAS, Persona};
use crate::error::AppError;

/// How many random recovery codes to try before giving up.
const RECOVERY_CODE_ATTEMPTS: usize = 16;

pub const MAX_NAME_LEN: usize = 64;

/// Result of a display-name save.
#[derive(Debug)]
pub struct NameOutcome {
    pub persona: Persona,
    /// The anonymous id the caller acted under before it was named. Its files
    /// belong to `persona` now.
    pub adopted_from: Option<String>,
}

/// Persona records, stored in the system partition.
///
/// Every read-modify-write of a persona record holds `writes`, so a
/// last-active touch can never roll back a concurrent rename or escalation.
pub struct PersonaDirectory {
    registry: Arc<dyn Registry>,
    namespace: Uuid,
    writes: Mutex<()>,
}

fn persona_not_found(err: registry::RegistryError) -> AppError {
    if err.is_not_found() {
        AppError::NotFound("Persona not found".into())
    } else {
        err.into()
    }
}

fn validate_name(name: &str) -> Result<&str, AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Name must be 1-{MAX_NAME_LEN} characters"
        )));
    }
    Ok(name)
}

impl PersonaDirectory {
    pub fn new(registry: Arc<dyn Registry>, namespace: Uuid) -> Self {
        Self {
            registry,
            namespace,
            writes: Mutex::new(()),
        }
    }

    pub fn namespace(&self) -> &Uuid {
        &self.namespace
    }

    pub async fn get(&self, id: &str) -> Result<Persona, AppError> {
        let value = self
            .registry
            .get(SYSTEM_PARTITION, PERSONAS, id)
            .await
            .map_err(persona_not_found)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Like [`get`](Self::get), with a missing persona as `None`.
    pub async fn find(&self, id: &str) -> Result<Option<Persona>, AppError> {
        match self.get(id).await {
            Ok(persona) => Ok(Some(persona)),
            Err(AppError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn save(&self, persona: &Persona) -> Result<(), AppError> {
        let value = serde_json::to_value(persona)?;
        self.registry
            .set(SYSTEM_PARTITION, PERSONAS, &persona.id, value)
            .await?;
        Ok(())
    }

    /// All personas, ordered by display name.
    pub async fn list(&self) -> Result<Vec<Persona>, AppError> {
        let entries = self
            .registry
            .list_namespace(SYSTEM_PARTITION, PERSONAS)
            .await?;

        let mut personas: Vec<Persona> = entries
            .into_iter()
            .filter_map(|(key, value)| match serde_json::from_value(value) {
                Ok(persona) => Some(persona),
                Err(e) => {
                    warn!(key = %key, error = %e, "Skipping malformed persona record");
                    None
                }
            })
            .collect();
        personas.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(personas)
    }

    /// Create or replace a persona, keeping its admin flag if it already exists.
    pub async fn upsert_persona(
        &self,
        id: &str,
        name: &str,
        recovery_code: &str,
        last_active: i64,
    ) -> Result<Persona, AppError> {
        let _guard = self.writes.lock().await;
        let is_admin = self.find(id).await?.is_some_and(|p| p.is_admin);

        let persona = Persona {
            id: id.to_string(),
            name: name.to_string(),
            recovery_code: normalize_recovery_code(recovery_code),
            last_active,
            is_admin,
        };
        self.save(&persona).await?;
        Ok(persona)
    }

    /// The persona holding `code`, if any. Linear scan over all personas.
    async fn code_holder(&self, code: &str) -> Result<Option<Persona>, AppError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|p| p.recovery_code == code))
    }

    pub async fn find_by_recovery_code(&self, code: &str) -> Result<Persona, AppError> {
        let code = normalize_recovery_code(code);
        if code.is_empty() {
            return Err(AppError::NotFound("Invalid recovery code".into()));
        }
        self.code_holder(&code)
            .await?
            .ok_or_else(|| AppError::NotFound("Invalid recovery code".into()))
    }

    /// Generate a recovery code no persona currently holds.
    pub async fn issue_recovery_code(&self) -> Result<String, AppError> {
        for _ in 0..RECOVERY_CODE_ATTEMPTS {
            let code = generate_recovery_code();
            if self.code_holder(&code).await?.is_none() {
                return Ok(code);
            }
            debug!("Recovery code collision, regenerating");
        }
        Err(AppError::Conflict(
            "Could not allocate a unique recovery code".into(),
        ))
    }

    /// Grant admin to `id` when the supplied secret matches a configured one.
    pub async fn escalate(
        &self,
        id: &str,
        supplied_secret: &str,
        configured_secret: &str,
    ) -> Result<Persona, AppError> {
        if configured_secret.is_empty() || supplied_secret != configured_secret {
            warn!(persona_id = %id, "Rejected admin escalation");
            return Err(AppError::PermissionDenied("Invalid admin secret".into()));
        }

        let _guard = self.writes.lock().await;
        let mut persona = self.get(id).await?;
        persona.is_admin = true;
        self.save(&persona).await?;

        info!(persona_id = %id, "Persona escalated to admin");
        Ok(persona)
    }

    /// Record activity. Failures are logged and otherwise ignored.
    pub async fn touch_last_active(&self, id: &str, now: i64) {
        let _guard = self.writes.lock().await;
        let result = async {
            if let Some(mut persona) = self.find(id).await? {
                persona.last_active = now;
                self.save(&persona).await?;
            }
            Ok::<_, AppError>(())
        }
        .await;

        if let Err(e) = result {
            warn!(persona_id = %id, error = ?e, "Failed to update last-active time");
        }
    }

    pub async fn delete_persona(&self, caller: &CallerContext, id: &str) -> Result<(), AppError> {
        caller.require_admin()?;
        if id == SYSTEM_PARTITION {
            return Err(AppError::PermissionDenied(
                "Cannot delete the system persona".into(),
            ));
        }
        if caller.is_self(id) {
            return Err(AppError::PermissionDenied(
                "Cannot delete your own persona".into(),
            ));
        }

        let _guard = self.writes.lock().await;
        self.registry
            .delete(SYSTEM_PARTITION, PERSONAS, id)
            .await
            .map_err(persona_not_found)?;

        info!(persona_id = %id, "Persona deleted");
        Ok(())
    }

    /// Administrator edit of every persona field. The id never changes.
    pub async fn update_persona_full(
        &self,
        caller: &CallerContext,
        id: &str,
        name: &str,
        recovery_code: &str,
        is_admin: bool,
    ) -> Result<Persona, AppError> {
        caller.require_admin()?;
        if caller.is_self(id) && !is_admin {
            return Err(AppError::PermissionDenied(
                "Cannot remove admin status from yourself".into(),
            ));
        }
        let name = validate_name(name)?;
        let recovery_code = validate_recovery_code(recovery_code)?;

        let _guard = self.writes.lock().await;
        let mut persona = self.get(id).await?;

        if let Some(holder) = self.code_holder(&recovery_code).await?
            && holder.id != id
        {
            return Err(AppError::Conflict(
                "Recovery code is already in use".into(),
            ));
        }

        persona.name = name.to_string();
        persona.recovery_code = recovery_code;
        persona.is_admin = is_admin;
        self.save(&persona).await?;
        Ok(persona)
    }

    /// Save a display name for the caller, creating its persona on first use.
    ///
    /// A caller that already has a record keeps its id and recovery code. A
    /// caller without one gets a fresh code and the id derived from it; the
    /// anonymous id it used so far is reported in
    /// [`NameOutcome::adopted_from`].
    pub async fn set_display_name(
        &self,
        caller_id: &str,
        name: &str,
        now: i64,
    ) -> Result<NameOutcome, AppError> {
        let name = validate_name(name)?;
        let _guard = self.writes.lock().await;

        if let Some(mut persona) = self.find(caller_id).await? {
            persona.name = name.to_string();
            persona.last_active = now;
            if persona.recovery_code.is_empty() {
                persona.recovery_code = self.issue_recovery_code().await?;
            }
            self.save(&persona).await?;
            return Ok(NameOutcome {
                persona,
                adopted_from: None,
            });
        }

        let recovery_code = self.issue_recovery_code().await?;
        let persona = Persona {
            id: derive_id(&self.namespace, &recovery_code),
            name: name.to_string(),
            recovery_code,
            last_active: now,
            is_admin: false,
        };
        self.save(&persona).await?;
        info!(persona_id = %persona.id, "Persona created");

        let adopted_from = (!caller_id.is_empty()
            && caller_id != SYSTEM_PARTITION
            && caller_id != persona.id)
            .then(|| caller_id.to_string());

        Ok(NameOutcome {
            persona,
            adopted_from,
        })
    }

    /// Look a persona up by recovery code and mark it active.
    pub async fn recover(&self, code: &str, now: i64) -> Result<Persona, AppError> {
        let mut persona = self.find_by_recovery_code(code).await?;
        self.touch_last_active(&persona.id, now).await;
        persona.last_active = now;
        Ok(persona)
    }

    /// Build the caller context for a presented id, touching its last-active time.
    ///
    /// The system partition id is reserved: presenting it yields an anonymous
    /// context, never access to unowned records.
    pub async fn resolve_caller(
        &self,
        id: Option<String>,
        now: i64,
    ) -> Result<CallerContext, AppError> {
        let Some(id) = id.filter(|id| !id.is_empty()) else {
            return Ok(CallerContext::anonymous());
        };
        if id == SYSTEM_PARTITION {
            warn!("Client presented the reserved system id");
            return Ok(CallerContext::anonymous());
        }

        let persona = self.find(&id).await?;
        if persona.is_some() {
            self.touch_last_active(&id, now).await;
        }

        Ok(CallerContext {
            id: Some(id),
            persona,
        })
    }
}

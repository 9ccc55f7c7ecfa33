//! Password-free persona identity.
//!
//! A persona id is a name-based (v5) UUID of its recovery code under the
//! operator's namespace, so the code alone reconstructs the id on any device
//! and on any instance sharing the namespace.

use rand::Rng;
use uuid::Uuid;

use crate::error::AppError;

pub const RECOVERY_CODE_LEN: usize = 8;

/// Longest recovery code an administrator may assign by hand.
pub const MAX_RECOVERY_CODE_LEN: usize = 32;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Derive the persona id for a recovery code.
pub fn derive_id(namespace: &Uuid, recovery_code: &str) -> String {
    Uuid::new_v5(namespace, recovery_code.as_bytes()).to_string()
}

/// A fresh random code. Uniqueness is the directory's job.
pub fn generate_recovery_code() -> String {
    let mut rng = rand::rng();
    (0..RECOVERY_CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Codes are typed by humans: surrounding whitespace and case are ignored.
pub fn normalize_recovery_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Normalize and validate a recovery code supplied by an administrator.
pub fn validate_recovery_code(code: &str) -> Result<String, AppError> {
    let code = normalize_recovery_code(code);
    if code.is_empty() || code.len() > MAX_RECOVERY_CODE_LEN {
        return Err(AppError::Validation(format!(
            "Recovery code must be 1-{MAX_RECOVERY_CODE_LEN} characters"
        )));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(AppError::Validation(
            "Recovery code may only contain letters, digits and '-'".into(),
        ));
    }
    Ok(code)
}

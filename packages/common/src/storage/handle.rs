use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::StorageError;

/// Opaque reference to one stored blob.
///
/// Every upload gets a fresh handle, so two files with identical bytes never
/// share storage and deleting one cannot affect the other. The canonical text
/// form is 32 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobHandle(Uuid);

impl BlobHandle {
    /// Allocate a new random handle.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse the canonical 32-character form.
    pub fn parse(s: &str) -> Result<Self, StorageError> {
        if s.len() != 32 {
            return Err(StorageError::InvalidHandle(format!(
                "expected 32 hex characters, got {}",
                s.len()
            )));
        }
        if !s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')) {
            return Err(StorageError::InvalidHandle(
                "handle must be lowercase hex".into(),
            ));
        }

        Uuid::try_parse(s)
            .map(Self)
            .map_err(|e| StorageError::InvalidHandle(e.to_string()))
    }

    /// Return the canonical text form.
    pub fn to_canonical(&self) -> String {
        self.0.simple().to_string()
    }

    /// Return the first 2 hex characters (shard directory for filesystem layout).
    pub fn shard_prefix(&self) -> String {
        self.to_canonical()[..2].to_string()
    }
}

impl fmt::Debug for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobHandle({})", self.to_canonical())
    }
}

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl Serialize for BlobHandle {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical())
    }
}

impl<'de> Deserialize<'de> for BlobHandle {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

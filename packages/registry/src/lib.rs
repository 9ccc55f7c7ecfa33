//! Partitioned key-value registry.
//!
//! Values live under `(partition, namespace, key)`. A partition is one persona
//! id, or [`SYSTEM_PARTITION`] for records that belong to nobody in particular.
//! Alongside the partition tables every backend maintains a global key index
//! mapping `(namespace, key)` to the single partition currently holding it, so
//! a record can be found by key alone and moved between partitions without
//! ever existing in two places at once.
//!
//! ## Backends
//! - [`MemoryRegistry`]: in-process tables, used for tests and `memory` URLs.
//! - [`SqlRegistry`]: SeaORM over SQLite or PostgreSQL.

mod error;

pub mod entity;
pub mod memory;
pub mod sql;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

pub use error::RegistryError;
pub use memory::MemoryRegistry;
pub use sql::SqlRegistry;

/// Reserved partition for directory records and unowned files.
pub const SYSTEM_PARTITION: &str = "_system";

/// Database URL selecting the in-process backend.
pub const MEMORY_URL: &str = "memory";

/// Contents of one namespace inside one partition, keyed by record key.
pub type NamespaceMap = HashMap<String, Value>;

/// Contents of one namespace across every partition, keyed by partition.
pub type NamespaceDump = HashMap<String, NamespaceMap>;

/// Storage contract shared by every registry backend.
///
/// Single-key operations are atomic with respect to each other. `move_key`
/// relocates a record and rewrites its value in one step, so a concurrent
/// reader sees the record either in the source partition with its old value
/// or in the destination partition with its new one.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Read one value.
    async fn get(
        &self,
        partition: &str,
        namespace: &str,
        key: &str,
    ) -> Result<Value, RegistryError>;

    /// Upsert one value.
    ///
    /// Fails with [`RegistryError::Conflict`] if the key is indexed under a
    /// different partition; ownership only changes through [`Registry::move_key`].
    async fn set(
        &self,
        partition: &str,
        namespace: &str,
        key: &str,
        value: Value,
    ) -> Result<(), RegistryError>;

    /// Create one value; fails if any partition already holds the key.
    async fn insert(
        &self,
        partition: &str,
        namespace: &str,
        key: &str,
        value: Value,
    ) -> Result<(), RegistryError>;

    /// Remove one value and its index entry.
    async fn delete(
        &self,
        partition: &str,
        namespace: &str,
        key: &str,
    ) -> Result<(), RegistryError>;

    /// Every record of `namespace` held by `partition`.
    async fn list_namespace(
        &self,
        partition: &str,
        namespace: &str,
    ) -> Result<NamespaceMap, RegistryError>;

    /// Every record of `namespace` across all partitions.
    async fn dump_namespace(&self, namespace: &str) -> Result<NamespaceDump, RegistryError>;

    /// The partition currently holding `(namespace, key)`.
    async fn locate(&self, namespace: &str, key: &str) -> Result<String, RegistryError>;

    /// Relocate a key from `src` to `dst`, optionally replacing its value.
    async fn move_key(
        &self,
        src: &str,
        dst: &str,
        namespace: &str,
        key: &str,
        replacement: Option<Value>,
    ) -> Result<(), RegistryError>;
}

/// Open the backend named by `url`: [`MEMORY_URL`] or a SeaORM connection URL.
pub async fn open(url: &str) -> Result<Arc<dyn Registry>, RegistryError> {
    if url == MEMORY_URL {
        tracing::warn!("Using the in-memory registry; records will not survive a restart");
        return Ok(Arc::new(MemoryRegistry::new()));
    }

    Ok(Arc::new(SqlRegistry::connect(url).await?))
}

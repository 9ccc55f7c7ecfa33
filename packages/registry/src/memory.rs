use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RegistryError;
use crate::{NamespaceDump, NamespaceMap, Registry};

/// `(namespace, key)` as stored in the global index.
type IndexKey = (String, String);

#[derive(Default)]
struct Tables {
    /// partition -> namespace -> key -> value
    partitions: HashMap<String, HashMap<String, NamespaceMap>>,
    index: HashMap<IndexKey, String>,
}

impl Tables {
    fn namespace(&self, partition: &str, namespace: &str) -> Option<&NamespaceMap> {
        self.partitions.get(partition)?.get(namespace)
    }

    fn namespace_mut(&mut self, partition: &str, namespace: &str) -> &mut NamespaceMap {
        self.partitions
            .entry(partition.to_string())
            .or_default()
            .entry(namespace.to_string())
            .or_default()
    }

    fn holder(&self, namespace: &str, key: &str) -> Option<&str> {
        self.index
            .get(&(namespace.to_string(), key.to_string()))
            .map(String::as_str)
    }

    /// Remove a value, pruning namespaces and partitions left empty.
    fn take(&mut self, partition: &str, namespace: &str, key: &str) -> Option<Value> {
        let namespaces = self.partitions.get_mut(partition)?;
        let entries = namespaces.get_mut(namespace)?;
        let value = entries.remove(key)?;

        if entries.is_empty() {
            namespaces.remove(namespace);
        }
        if namespaces.is_empty() {
            self.partitions.remove(partition);
        }

        Some(value)
    }

    fn place(&mut self, partition: &str, namespace: &str, key: &str, value: Value) {
        self.namespace_mut(partition, namespace)
            .insert(key.to_string(), value);
        self.index.insert(
            (namespace.to_string(), key.to_string()),
            partition.to_string(),
        );
    }
}

/// Registry held entirely in process memory.
///
/// Partition tables and the key index share one reader/writer lock, so every
/// write (including a move) is applied as a unit and reads never observe a
/// key in two partitions or in none.
#[derive(Default)]
pub struct MemoryRegistry {
    tables: RwLock<Tables>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, RegistryError> {
        self.tables
            .read()
            .map_err(|_| RegistryError::Internal("Registry lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, RegistryError> {
        self.tables
            .write()
            .map_err(|_| RegistryError::Internal("Registry lock poisoned".into()))
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn get(
        &self,
        partition: &str,
        namespace: &str,
        key: &str,
    ) -> Result<Value, RegistryError> {
        let tables = self.read()?;
        tables
            .namespace(partition, namespace)
            .and_then(|entries| entries.get(key))
            .cloned()
            .ok_or_else(|| RegistryError::missing(partition, namespace, key))
    }

    async fn set(
        &self,
        partition: &str,
        namespace: &str,
        key: &str,
        value: Value,
    ) -> Result<(), RegistryError> {
        let mut tables = self.write()?;
        if let Some(holder) = tables.holder(namespace, key)
            && holder != partition
        {
            return Err(RegistryError::held_elsewhere(namespace, key, holder));
        }

        tables.place(partition, namespace, key, value);
        Ok(())
    }

    async fn insert(
        &self,
        partition: &str,
        namespace: &str,
        key: &str,
        value: Value,
    ) -> Result<(), RegistryError> {
        let mut tables = self.write()?;
        if let Some(holder) = tables.holder(namespace, key) {
            return Err(RegistryError::held_elsewhere(namespace, key, holder));
        }

        tables.place(partition, namespace, key, value);
        Ok(())
    }

    async fn delete(
        &self,
        partition: &str,
        namespace: &str,
        key: &str,
    ) -> Result<(), RegistryError> {
        let mut tables = self.write()?;
        tables
            .take(partition, namespace, key)
            .ok_or_else(|| RegistryError::missing(partition, namespace, key))?;

        let index_key = (namespace.to_string(), key.to_string());
        if tables.index.get(&index_key).is_some_and(|p| p == partition) {
            tables.index.remove(&index_key);
        }
        Ok(())
    }

    async fn list_namespace(
        &self,
        partition: &str,
        namespace: &str,
    ) -> Result<NamespaceMap, RegistryError> {
        let tables = self.read()?;
        Ok(tables
            .namespace(partition, namespace)
            .cloned()
            .unwrap_or_default())
    }

    async fn dump_namespace(&self, namespace: &str) -> Result<NamespaceDump, RegistryError> {
        let tables = self.read()?;
        Ok(tables
            .partitions
            .iter()
            .filter_map(|(partition, namespaces)| {
                namespaces
                    .get(namespace)
                    .map(|entries| (partition.clone(), entries.clone()))
            })
            .collect())
    }

    async fn locate(&self, namespace: &str, key: &str) -> Result<String, RegistryError> {
        let tables = self.read()?;
        tables
            .holder(namespace, key)
            .map(str::to_string)
            .ok_or_else(|| RegistryError::unindexed(namespace, key))
    }

    async fn move_key(
        &self,
        src: &str,
        dst: &str,
        namespace: &str,
        key: &str,
        replacement: Option<Value>,
    ) -> Result<(), RegistryError> {
        let mut tables = self.write()?;
        let current = tables
            .take(src, namespace, key)
            .ok_or_else(|| RegistryError::missing(src, namespace, key))?;

        tables.place(dst, namespace, key, replacement.unwrap_or(current));
        Ok(())
    }
}

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{LockType, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QuerySelect, Set, SqlErr, TransactionTrait,
};
use serde_json::Value;
use tracing::info;

use crate::entity::{registry_entry, registry_key_index};
use crate::error::RegistryError;
use crate::{NamespaceDump, NamespaceMap, Registry};

/// Open a connection pool and sync the registry schema.
pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    if db_url.starts_with("sqlite:") {
        // SQLite has a single writer, and an in-memory database only lives as
        // long as the one connection that created it.
        opt.max_connections(1).min_connections(1);
    } else {
        opt.max_connections(100)
            .min_connections(5)
            .idle_timeout(Duration::from_secs(8))
            .max_lifetime(Duration::from_secs(8));
    }
    opt.connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("registry::entity::*")
        .sync(&db)
        .await?;

    info!("Registry schema ready");
    Ok(db)
}

/// Registry persisted through SeaORM.
///
/// Entries live in `registry_entry`; `registry_key_index` holds the global key
/// index. Every operation touching both tables runs in one transaction.
#[derive(Clone)]
pub struct SqlRegistry {
    db: DatabaseConnection,
}

impl SqlRegistry {
    pub async fn connect(db_url: &str) -> Result<Self, RegistryError> {
        Ok(Self {
            db: init_db(db_url).await?,
        })
    }

    /// Wrap a connection whose schema is already in place.
    pub fn from_connection(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn entry_id(partition: &str, namespace: &str, key: &str) -> (String, String, String) {
    (partition.to_owned(), namespace.to_owned(), key.to_owned())
}

/// Read the index row for `(namespace, key)` under `SELECT ... FOR UPDATE`.
///
/// Writers that consult the holder take this lock first, so a write and a
/// move of the same key queue behind each other and the later one sees the
/// committed holder.
async fn lock_holder<C: ConnectionTrait>(
    conn: &C,
    namespace: &str,
    key: &str,
) -> Result<Option<registry_key_index::Model>, DbErr> {
    registry_key_index::Entity::find_by_id((namespace.to_owned(), key.to_owned()))
        .lock(LockType::Update)
        .one(conn)
        .await
}

/// Make sure the index records `partition` as the holder of `(namespace, key)`.
///
/// With `exclusive` set, any existing index entry is a conflict, including one
/// for the same partition.
async fn claim_key<C: ConnectionTrait>(
    conn: &C,
    partition: &str,
    namespace: &str,
    key: &str,
    exclusive: bool,
) -> Result<(), RegistryError> {
    match lock_holder(conn, namespace, key).await? {
        Some(holder) if holder.partition == partition && !exclusive => Ok(()),
        Some(holder) => Err(RegistryError::held_elsewhere(
            namespace,
            key,
            &holder.partition,
        )),
        None => {
            let model = registry_key_index::ActiveModel {
                namespace: Set(namespace.to_owned()),
                key: Set(key.to_owned()),
                partition: Set(partition.to_owned()),
            };
            registry_key_index::Entity::insert(model)
                .exec_without_returning(conn)
                .await
                .map_err(|e| match e.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => {
                        tracing::debug!("Index race on {namespace}/{key}: unique constraint caught");
                        RegistryError::Conflict(format!("{namespace}/{key} was claimed concurrently"))
                    }
                    _ => RegistryError::from(e),
                })?;
            Ok(())
        }
    }
}

async fn upsert_entry<C: ConnectionTrait>(
    conn: &C,
    partition: &str,
    namespace: &str,
    key: &str,
    data: Value,
) -> Result<(), DbErr> {
    let model = registry_entry::ActiveModel {
        partition: Set(partition.to_owned()),
        namespace: Set(namespace.to_owned()),
        key: Set(key.to_owned()),
        data: Set(data),
        updated_at: Set(Utc::now()),
    };

    registry_entry::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([
                registry_entry::Column::Partition,
                registry_entry::Column::Namespace,
                registry_entry::Column::Key,
            ])
            .update_columns([
                registry_entry::Column::Data,
                registry_entry::Column::UpdatedAt,
            ])
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    Ok(())
}

#[async_trait]
impl Registry for SqlRegistry {
    async fn get(
        &self,
        partition: &str,
        namespace: &str,
        key: &str,
    ) -> Result<Value, RegistryError> {
        registry_entry::Entity::find_by_id(entry_id(partition, namespace, key))
            .one(&self.db)
            .await?
            .map(|entry| entry.data)
            .ok_or_else(|| RegistryError::missing(partition, namespace, key))
    }

    async fn set(
        &self,
        partition: &str,
        namespace: &str,
        key: &str,
        value: Value,
    ) -> Result<(), RegistryError> {
        let txn = self.db.begin().await?;
        claim_key(&txn, partition, namespace, key, false).await?;
        upsert_entry(&txn, partition, namespace, key, value).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn insert(
        &self,
        partition: &str,
        namespace: &str,
        key: &str,
        value: Value,
    ) -> Result<(), RegistryError> {
        let txn = self.db.begin().await?;
        claim_key(&txn, partition, namespace, key, true).await?;
        upsert_entry(&txn, partition, namespace, key, value).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn delete(
        &self,
        partition: &str,
        namespace: &str,
        key: &str,
    ) -> Result<(), RegistryError> {
        let txn = self.db.begin().await?;
        lock_holder(&txn, namespace, key).await?;

        let removed = registry_entry::Entity::delete_by_id(entry_id(partition, namespace, key))
            .exec(&txn)
            .await?;
        if removed.rows_affected == 0 {
            return Err(RegistryError::missing(partition, namespace, key));
        }

        registry_key_index::Entity::delete_many()
            .filter(registry_key_index::Column::Namespace.eq(namespace))
            .filter(registry_key_index::Column::Key.eq(key))
            .filter(registry_key_index::Column::Partition.eq(partition))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    async fn list_namespace(
        &self,
        partition: &str,
        namespace: &str,
    ) -> Result<NamespaceMap, RegistryError> {
        let entries = registry_entry::Entity::find()
            .filter(registry_entry::Column::Partition.eq(partition))
            .filter(registry_entry::Column::Namespace.eq(namespace))
            .all(&self.db)
            .await?;

        Ok(entries
            .into_iter()
            .map(|entry| (entry.key, entry.data))
            .collect())
    }

    async fn dump_namespace(&self, namespace: &str) -> Result<NamespaceDump, RegistryError> {
        let entries = registry_entry::Entity::find()
            .filter(registry_entry::Column::Namespace.eq(namespace))
            .all(&self.db)
            .await?;

        let mut dump = NamespaceDump::new();
        for entry in entries {
            dump.entry(entry.partition)
                .or_default()
                .insert(entry.key, entry.data);
        }
        Ok(dump)
    }

    async fn locate(&self, namespace: &str, key: &str) -> Result<String, RegistryError> {
        registry_key_index::Entity::find_by_id((namespace.to_owned(), key.to_owned()))
            .one(&self.db)
            .await?
            .map(|holder| holder.partition)
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
        let txn = self.db.begin().await?;

        match lock_holder(&txn, namespace, key).await? {
            Some(holder) if holder.partition == src => {}
            _ => return Err(RegistryError::missing(src, namespace, key)),
        }

        let current = registry_entry::Entity::find_by_id(entry_id(src, namespace, key))
            .one(&txn)
            .await?
            .ok_or_else(|| RegistryError::missing(src, namespace, key))?;

        if src != dst {
            registry_entry::Entity::delete_by_id(entry_id(src, namespace, key))
                .exec(&txn)
                .await?;
        }
        upsert_entry(&txn, dst, namespace, key, replacement.unwrap_or(current.data)).await?;

        let holder = registry_key_index::ActiveModel {
            namespace: Set(namespace.to_owned()),
            key: Set(key.to_owned()),
            partition: Set(dst.to_owned()),
        };
        registry_key_index::Entity::insert(holder)
            .on_conflict(
                OnConflict::columns([
                    registry_key_index::Column::Namespace,
                    registry_key_index::Column::Key,
                ])
                .update_column(registry_key_index::Column::Partition)
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }
}

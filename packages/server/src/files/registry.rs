use std::collections::HashMap;
use std::sync::Arc;

use ::registry::{Registry, RegistryError, SYSTEM_PARTITION};
use common::storage::{BlobHandle, BlobStore};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{
    FILES, FileListQuery, FilePage, FileRecord, FileUpdate, LINKS, OwnedFile, SYSTEM_OWNER_NAME,
    UNKNOWN_OWNER_NAME, normalize_owner, partition_for,
};
use crate::error::AppError;
use crate::persona::PersonaDirectory;
use crate::utils::filename::validate_flat_filename;

/// File records stored in their owners' partitions.
///
/// Owner changes go through a single [`Registry::move_key`] carrying the
/// rewritten record, so a record's partition and `owner_id` never disagree.
pub struct FileRegistry {
    registry: Arc<dyn Registry>,
    directory: Arc<PersonaDirectory>,
    blobs: Arc<dyn BlobStore>,
}

fn file_not_found(err: RegistryError) -> AppError {
    if err.is_not_found() {
        AppError::NotFound("File not found".into())
    } else {
        err.into()
    }
}

fn parse_record(key: &str, value: Value) -> Option<FileRecord> {
    match serde_json::from_value(value) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(file_id = %key, error = %e, "Skipping malformed file record");
            None
        }
    }
}

impl FileRegistry {
    pub fn new(
        registry: Arc<dyn Registry>,
        directory: Arc<PersonaDirectory>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            registry,
            directory,
            blobs,
        }
    }

    /// Store a new record in its owner's partition and index its public link.
    pub async fn create(&self, mut record: FileRecord) -> Result<FileRecord, AppError> {
        record.owner_id = normalize_owner(&record.owner_id);
        let partition = record.partition().to_string();

        self.registry
            .insert(&partition, FILES, &record.id, serde_json::to_value(&record)?)
            .await?;

        if let Err(e) = self
            .registry
            .insert(
                SYSTEM_PARTITION,
                LINKS,
                &record.download_link,
                Value::String(record.id.clone()),
            )
            .await
        {
            if let Err(rollback) = self.registry.delete(&partition, FILES, &record.id).await {
                warn!(file_id = %record.id, error = %rollback, "Failed to roll back file record");
            }
            return Err(e.into());
        }

        debug!(
            file_id = %record.id,
            name = %record.original_name,
            owner_id = %record.owner_id,
            "Saved file record"
        );
        Ok(record)
    }

    /// Read a record without resolving its owner.
    pub async fn get_record(&self, id: &str) -> Result<FileRecord, AppError> {
        let partition = self
            .registry
            .locate(FILES, id)
            .await
            .map_err(file_not_found)?;
        let value = self
            .registry
            .get(&partition, FILES, id)
            .await
            .map_err(file_not_found)?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn get(&self, id: &str) -> Result<OwnedFile, AppError> {
        let record = self.get_record(id).await?;
        let owner_name = self.owner_name(&record.owner_id).await?;
        Ok(OwnedFile { record, owner_name })
    }

    pub async fn find_by_public_link(&self, link: &str) -> Result<FileRecord, AppError> {
        let value = self
            .registry
            .get(SYSTEM_PARTITION, LINKS, link)
            .await
            .map_err(file_not_found)?;
        let id = value
            .as_str()
            .ok_or_else(|| AppError::Internal(format!("Malformed link entry for {link}")))?;
        self.get_record(id).await
    }

    /// Rename, re-own or change the visibility of a record.
    pub async fn update(&self, id: &str, update: FileUpdate) -> Result<OwnedFile, AppError> {
        let original_name = validate_flat_filename(&update.original_name)
            .map_err(|e| AppError::Validation(e.message().into()))?
            .to_string();

        let current = self.get_record(id).await?;
        let updated = FileRecord {
            original_name,
            owner_id: normalize_owner(&update.owner_id),
            is_public: update.is_public.unwrap_or(current.is_public),
            ..current.clone()
        };
        let value = serde_json::to_value(&updated)?;

        if updated.partition() == current.partition() {
            self.registry
                .set(current.partition(), FILES, id, value)
                .await?;
        } else {
            self.registry
                .move_key(current.partition(), updated.partition(), FILES, id, Some(value))
                .await
                .map_err(file_not_found)?;
            info!(
                file_id = %id,
                from = %current.partition(),
                to = %updated.partition(),
                "File ownership transferred"
            );
        }

        let owner_name = self.owner_name(&updated.owner_id).await?;
        Ok(OwnedFile {
            record: updated,
            owner_name,
        })
    }

    /// Remove a record, its link and its bytes.
    ///
    /// Only the record removal can fail the call; link and blob cleanup
    /// failures are logged.
    pub async fn delete(&self, id: &str) -> Result<FileRecord, AppError> {
        let record = self.get_record(id).await?;
        self.registry
            .delete(record.partition(), FILES, id)
            .await
            .map_err(file_not_found)?;

        if let Err(e) = self
            .registry
            .delete(SYSTEM_PARTITION, LINKS, &record.download_link)
            .await
        {
            warn!(file_id = %id, error = %e, "Failed to remove public link");
        }

        match BlobHandle::parse(&record.stored_location) {
            Ok(handle) => match self.blobs.delete(&handle).await {
                Ok(true) => {}
                Ok(false) => warn!(file_id = %id, handle = %handle, "Blob was already gone"),
                Err(e) => warn!(file_id = %id, error = %e, "Failed to release blob"),
            },
            Err(e) => warn!(file_id = %id, error = %e, "Record has no valid blob handle"),
        }

        Ok(record)
    }

    /// Search, order and paginate records.
    pub async fn list(&self, query: &FileListQuery) -> Result<FilePage, AppError> {
        let entries: Vec<(String, Value)> = match &query.owner_id {
            Some(owner_id) => self
                .registry
                .list_namespace(partition_for(owner_id), FILES)
                .await?
                .into_iter()
                .collect(),
            None => self
                .registry
                .dump_namespace(FILES)
                .await?
                .into_values()
                .flatten()
                .collect(),
        };

        let needle = query.search.trim().to_lowercase();
        let mut records: Vec<FileRecord> = entries
            .into_iter()
            .filter_map(|(key, value)| parse_record(&key, value))
            .filter(|r| needle.is_empty() || r.original_name.to_lowercase().contains(&needle))
            .collect();

        // Newest first; the id tiebreak keeps pages stable across calls.
        records.sort_by(|a, b| {
            b.upload_time
                .cmp(&a.upload_time)
                .then_with(|| a.id.cmp(&b.id))
        });

        let total = records.len();
        let offset = usize::try_from(query.offset).unwrap_or(0);
        let limit = usize::try_from(query.limit)
            .ok()
            .filter(|&limit| limit > 0)
            .unwrap_or(usize::MAX);

        let mut names: HashMap<String, String> = HashMap::new();
        let mut files = Vec::new();
        for record in records.into_iter().skip(offset).take(limit) {
            let owner_name = match names.get(&record.owner_id) {
                Some(name) => name.clone(),
                None => {
                    let name = self.owner_name(&record.owner_id).await?;
                    names.insert(record.owner_id.clone(), name.clone());
                    name
                }
            };
            files.push(OwnedFile { record, owner_name });
        }

        Ok(FilePage { files, total })
    }

    /// Move every record of an anonymous id into a persona's partition.
    pub async fn adopt(&self, from: &str, to: &str) -> Result<usize, AppError> {
        let entries = self.registry.list_namespace(from, FILES).await?;

        let mut adopted = 0;
        for (key, value) in entries {
            let Some(mut record) = parse_record(&key, value) else {
                continue;
            };
            record.owner_id = to.to_string();
            self.registry
                .move_key(from, to, FILES, &key, Some(serde_json::to_value(&record)?))
                .await?;
            adopted += 1;
        }

        if adopted > 0 {
            info!(from = %from, to = %to, count = adopted, "Adopted anonymous files");
        }
        Ok(adopted)
    }

    async fn owner_name(&self, owner_id: &str) -> Result<String, AppError> {
        if owner_id.is_empty() {
            return Ok(SYSTEM_OWNER_NAME.to_string());
        }
        Ok(self
            .directory
            .find(owner_id)
            .await?
            .map(|persona| persona.name)
            .unwrap_or_else(|| UNKNOWN_OWNER_NAME.to_string()))
    }
}

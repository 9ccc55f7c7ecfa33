use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

use super::error::StorageError;
use super::handle::BlobHandle;
use super::traits::{BlobStore, BoxReader, StoredBlob};

/// Filesystem-backed blob store.
///
/// Blobs are stored in a sharded directory layout:
/// `{base_path}/{first 2 hex chars}/{32 hex char handle}`
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store.
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    /// Compute the filesystem path for a given handle.
    fn blob_path(&self, handle: &BlobHandle) -> PathBuf {
        self.base_path
            .join(handle.shard_prefix())
            .join(handle.to_canonical())
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self, handle: &BlobHandle) -> PathBuf {
        self.base_path.join(".tmp").join(handle.to_canonical())
    }

    async fn discard(&self, temp_path: &Path) {
        if let Err(e) = fs::remove_file(temp_path).await {
            tracing::debug!("Failed to remove temp blob {}: {e}", temp_path.display());
        }
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put_stream(&self, mut reader: BoxReader) -> Result<StoredBlob, StorageError> {
        let handle = BlobHandle::generate();
        let temp_path = self.temp_path(&handle);
        let mut total_bytes: u64 = 0;

        let mut buf = vec![0u8; 64 * 1024]; // 64KB read buffer
        let mut temp_file = fs::File::create(&temp_path).await?;

        loop {
            let n = match reader.read(&mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    drop(temp_file);
                    self.discard(&temp_path).await;
                    return Err(e.into());
                }
            };
            if n == 0 {
                break;
            }

            total_bytes += n as u64;
            if total_bytes > self.max_size {
                drop(temp_file);
                self.discard(&temp_path).await;
                return Err(StorageError::SizeLimitExceeded {
                    actual: total_bytes,
                    limit: self.max_size,
                });
            }

            if let Err(e) = temp_file.write_all(&buf[..n]).await {
                drop(temp_file);
                self.discard(&temp_path).await;
                return Err(e.into());
            }
        }

        temp_file.flush().await?;
        drop(temp_file);

        let blob_path = self.blob_path(&handle);
        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &blob_path).await {
            self.discard(&temp_path).await;
            return Err(e.into());
        }

        Ok(StoredBlob {
            handle,
            size: total_bytes,
        })
    }

    async fn get_stream(&self, handle: &BlobHandle) -> Result<BoxReader, StorageError> {
        let blob_path = self.blob_path(handle);
        match fs::File::open(&blob_path).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(handle.to_canonical()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, handle: &BlobHandle) -> Result<bool, StorageError> {
        let blob_path = self.blob_path(handle);
        Ok(fs::try_exists(&blob_path).await?)
    }

    async fn delete(&self, handle: &BlobHandle) -> Result<bool, StorageError> {
        let blob_path = self.blob_path(handle);
        match fs::remove_file(&blob_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

use std::io::Cursor;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::handle::BlobHandle;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Outcome of a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredBlob {
    pub handle: BlobHandle,
    pub size: u64,
}

/// Handle-addressed blob storage for uploaded file bytes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under a fresh handle.
    async fn put(&self, data: &[u8]) -> Result<StoredBlob, StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        self.put_stream(reader).await
    }

    /// Store data from an async reader under a fresh handle.
    async fn put_stream(&self, reader: BoxReader) -> Result<StoredBlob, StorageError>;

    /// Retrieve all bytes for a blob.
    async fn get(&self, handle: &BlobHandle) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(handle).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve a blob as a streaming async reader.
    async fn get_stream(&self, handle: &BlobHandle) -> Result<BoxReader, StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, handle: &BlobHandle) -> Result<bool, StorageError>;

    /// Release a blob.
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, handle: &BlobHandle) -> Result<bool, StorageError>;
}

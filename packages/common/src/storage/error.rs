/// Failures of a [`BlobStore`](super::BlobStore).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("no blob stored under {0}")]
    NotFound(String),
    #[error("blob storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed blob handle: {0}")]
    InvalidHandle(String),
    /// Upload grew past the configured cap; `actual` is the count when writing stopped.
    #[error("blob of at least {actual} bytes exceeds the {limit} byte limit")]
    SizeLimitExceeded { actual: u64, limit: u64 },
}

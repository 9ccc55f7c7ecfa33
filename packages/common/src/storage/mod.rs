mod error;
mod handle;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use handle::BlobHandle;
pub use traits::{BlobStore, BoxReader, StoredBlob};

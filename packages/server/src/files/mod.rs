//! File metadata records and their partitioned registry.

pub mod registry;

use ::registry::SYSTEM_PARTITION;
use serde::{Deserialize, Serialize};

pub use self::registry::FileRegistry;

/// Registry namespace holding file records, partitioned by owner.
pub const FILES: &str = "files";

/// Registry namespace mapping public download links to file ids. Always in
/// the system partition.
pub const LINKS: &str = "links";

/// Owner label for files nobody owns.
pub const SYSTEM_OWNER_NAME: &str = "System";

/// Owner label for files whose persona no longer exists.
pub const UNKNOWN_OWNER_NAME: &str = "Unknown";

/// Metadata of one uploaded file. The bytes live in the blob store under
/// `stored_location`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub original_name: String,
    pub stored_location: String,
    pub size: i64,
    /// Unix seconds.
    pub upload_time: i64,
    /// Owning persona id; empty for system-owned files.
    #[serde(default)]
    pub owner_id: String,
    pub download_link: String,
    #[serde(default)]
    pub is_public: bool,
}

impl FileRecord {
    /// The registry partition this record must live in.
    pub fn partition(&self) -> &str {
        partition_for(&self.owner_id)
    }
}

pub fn partition_for(owner_id: &str) -> &str {
    if owner_id.is_empty() {
        SYSTEM_PARTITION
    } else {
        owner_id
    }
}

/// The system partition id and the empty string both mean "nobody".
pub(crate) fn normalize_owner(owner_id: &str) -> String {
    let owner_id = owner_id.trim();
    if owner_id == SYSTEM_PARTITION {
        String::new()
    } else {
        owner_id.to_string()
    }
}

/// A record with its owner's display name resolved.
#[derive(Debug, Clone)]
pub struct OwnedFile {
    pub record: FileRecord,
    pub owner_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct FileListQuery {
    /// Case-insensitive substring of `original_name`; empty matches everything.
    pub search: String,
    /// Restrict to one owner's partition. `None` scans every partition.
    pub owner_id: Option<String>,
    /// Page size; zero or negative returns everything from `offset` on.
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug)]
pub struct FilePage {
    pub files: Vec<OwnedFile>,
    /// Matching records before pagination.
    pub total: usize,
}

/// Administrator edit of a file record.
#[derive(Debug, Clone)]
pub struct FileUpdate {
    pub original_name: String,
    /// New owner; empty hands the file to the system.
    pub owner_id: String,
    /// `None` keeps the current visibility.
    pub is_public: Option<bool>,
}

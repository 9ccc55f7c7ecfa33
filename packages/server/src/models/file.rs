use serde::{Deserialize, Serialize};

use crate::files::OwnedFile;
use crate::models::shared::Pagination;

/// Default page size for file listings.
pub const DEFAULT_PAGE_SIZE: i64 = 8;

/// File metadata as returned to clients. The blob location stays server-side.
#[derive(Serialize, utoipa::ToSchema)]
pub struct FileResponse {
    #[schema(example = "9b2f6c1e-3d4a-4f5b-8c7d-0e1f2a3b4c5d")]
    pub id: String,
    #[schema(example = "Q1_Report.pdf")]
    pub original_name: String,
    /// Size in bytes.
    #[schema(example = 142857)]
    pub size: i64,
    /// Unix seconds.
    #[schema(example = 1767225600)]
    pub upload_time: i64,
    /// Owning persona id; empty for system-owned files.
    pub owner_id: String,
    #[schema(example = "Ada")]
    pub owner_name: String,
    /// Token for `GET /api/download/{download_link}`.
    pub download_link: String,
    pub is_public: bool,
}

impl From<OwnedFile> for FileResponse {
    fn from(file: OwnedFile) -> Self {
        let OwnedFile { record, owner_name } = file;
        Self {
            id: record.id,
            original_name: record.original_name,
            size: record.size,
            upload_time: record.upload_time,
            owner_id: record.owner_id,
            owner_name,
            download_link: record.download_link,
            is_public: record.is_public,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct FileListResponse {
    pub files: Vec<FileResponse>,
    /// Matching files across all pages.
    #[schema(example = 10)]
    pub total: u64,
    pub pagination: Pagination,
}

/// Query parameters for file listing.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct FileListQueryParams {
    /// Case-insensitive substring of the file name.
    #[param(example = "report")]
    pub search: Option<String>,
    /// 1-based page number.
    #[param(example = 1)]
    pub page: Option<i64>,
    /// Page size (default 8).
    #[param(example = 8)]
    pub limit: Option<i64>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateFileRequest {
    #[schema(example = "Q1_Report.pdf")]
    pub original_name: String,
    /// New owner persona id; empty hands the file to the system.
    pub owner_id: String,
    /// Omit to keep the current visibility.
    pub is_public: Option<bool>,
}

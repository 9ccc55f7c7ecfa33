use serde::Serialize;

/// Pagination metadata included in list responses.
#[derive(Serialize, utoipa::ToSchema)]
pub struct Pagination {
    /// Current page number (1-based).
    #[schema(example = 1)]
    pub page: u64,
    /// Number of items per page.
    #[schema(example = 8)]
    pub per_page: u64,
    /// Total number of matching items across all pages.
    #[schema(example = 10)]
    pub total: u64,
    /// Total number of pages.
    #[schema(example = 2)]
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        Self {
            page,
            per_page,
            total,
            total_pages: total.div_ceil(per_page.max(1)),
        }
    }
}

/// Acknowledgement for operations without a richer result.
#[derive(Serialize, utoipa::ToSchema)]
pub struct StatusResponse {
    #[schema(example = "success")]
    pub status: &'static str,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self { status: "success" }
    }
}

/// Build version of the running server.
#[derive(Serialize, utoipa::ToSchema)]
pub struct VersionResponse {
    #[schema(example = "0.1.0")]
    pub version: &'static str,
}

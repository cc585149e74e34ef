use serde::Deserialize;
use utoipa::ToSchema;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;
/// Past this no catalog has rows; it keeps the offset inside `i64`.
pub const MAX_PAGE: i64 = 1_000_000;

#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    /// Returns `(page, limit, offset)` with a 1-based page.
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let limit = self
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1) * limit;
        (page, limit, offset)
    }
}

/// `ceil(total / limit)`; zero when there is nothing to show.
pub fn page_count(total: i64, limit: i64) -> i64 {
    if total <= 0 || limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    #[default]
    Newest,
    Rating,
}

impl ProductSort {
    /// Unknown or missing values fall back to newest first.
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("price-asc") => ProductSort::PriceAsc,
            Some("price-desc") => ProductSort::PriceDesc,
            Some("rating") => ProductSort::Rating,
            _ => ProductSort::Newest,
        }
    }
}

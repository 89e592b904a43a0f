//! Pagination utilities for the admin job listing

/// Default page size when the caller does not supply `limit`
pub const DEFAULT_LIMIT: i64 = 20;

/// Upper bound on caller-supplied `limit`
pub const MAX_LIMIT: i64 = 100;

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    /// Rows per page after clamping to [1, MAX_LIMIT]
    pub limit: i64,
    /// Total number of matching rows
    pub total: i64,
    /// Total number of pages
    pub pages: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
}

/// Calculate pagination metadata from total results and requested page/limit
///
/// Clamps `limit` to [1, MAX_LIMIT] and `page` to at least 1. Pages past the
/// end yield an empty result rather than an error.
pub fn calculate_pagination(total: i64, requested_page: i64, requested_limit: i64) -> Pagination {
    let limit = requested_limit.clamp(1, MAX_LIMIT);
    let pages = (total + limit - 1) / limit;
    let page = requested_page.max(1);
    let offset = (page - 1) * limit;

    Pagination {
        page,
        limit,
        total,
        pages,
        offset,
    }
}

pub mod job;
pub mod story;

/// Maximum page size for listings.
pub const MAX_LIMIT: i64 = 100;

/// Default page size for listings.
pub const DEFAULT_LIMIT: i64 = 50;

/// Clamp caller-supplied paging to `[1, MAX_LIMIT]` and a non-negative offset.
pub fn page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

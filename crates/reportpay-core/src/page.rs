//! Pagination for report listings.

use serde::{Deserialize, Serialize};

/// Default page size.
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// Largest accepted page size.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// An effective `limit`/`offset` pair.
///
/// Construct with [`Page::new`], which clamps caller input: a limit outside
/// `1..=100` becomes the default of 20 and a negative offset becomes 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Maximum number of items.
    pub limit: i64,
    /// Number of items to skip.
    pub offset: i64,
}

impl Page {
    /// Build a page from raw caller input.
    #[must_use]
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        let limit = match limit {
            Some(l) if (1..=MAX_PAGE_LIMIT).contains(&l) => l,
            _ => DEFAULT_PAGE_LIMIT,
        };
        let offset = offset.filter(|o| *o >= 0).unwrap_or(0);
        Self { limit, offset }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

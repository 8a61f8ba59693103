//! # Pagination
//!
//! JSON:API leaves the pagination scheme to the server. Two conventions are supported:
//!
//! * **[`PaginationStrategy::PageNumber`]**: `page[number]` and `page[size]`.
//! * **[`PaginationStrategy::Offset`]**: `page[offset]` and `page[limit]`.
//!
//! A strategy is a pure mapping from a [`PageRequest`] and a set of [`PageParamNames`] to
//! query-parameter pairs. The parameter names are configurable per entity type.
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationStrategy {
    #[default]
    PageNumber,
    Offset,
}

/// The four query-parameter names a strategy may emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageParamNames {
    pub number: String,
    pub size: String,
    pub offset: String,
    pub limit: String,
}

impl Default for PageParamNames {
    fn default() -> Self {
        Self {
            number: "page[number]".to_string(),
            size: "page[size]".to_string(),
            offset: "page[offset]".to_string(),
            limit: "page[limit]".to_string(),
        }
    }
}

/// A requested window of a collection.
///
/// `page` is a page number for [`PaginationStrategy::PageNumber`] and an offset for
/// [`PaginationStrategy::Offset`]. `size` is the page size or the limit respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageRequest {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl PaginationStrategy {
    /// The page value that addresses the beginning of a collection.
    pub fn first(&self) -> u32 {
        match self {
            PaginationStrategy::PageNumber => 1,
            PaginationStrategy::Offset => 0,
        }
    }

    pub fn next(&self, page: u32, size: u32) -> u32 {
        match self {
            PaginationStrategy::PageNumber => page.saturating_add(1),
            PaginationStrategy::Offset => page.saturating_add(size),
        }
    }

    /// Returns `None` when `page` already addresses the first window.
    pub fn previous(&self, page: u32, size: u32) -> Option<u32> {
        if page <= self.first() {
            return None;
        }
        match self {
            PaginationStrategy::PageNumber => Some(page - 1),
            PaginationStrategy::Offset => Some(page.saturating_sub(size)),
        }
    }

    /// The page value of the last window of a collection holding `total` resources.
    pub fn last(&self, total: u64, size: u32) -> u32 {
        let size = u64::from(size.max(1));
        let pages = total.div_ceil(size).max(1);
        let value = match self {
            PaginationStrategy::PageNumber => pages,
            PaginationStrategy::Offset => (pages - 1) * size,
        };
        u32::try_from(value).unwrap_or(u32::MAX)
    }

    /// Maps a page request to query parameters.
    ///
    /// Missing values default to the first page and to `default_size`.
    pub fn params(
        &self,
        names: &PageParamNames,
        request: PageRequest,
        default_size: u32,
    ) -> Vec<(String, String)> {
        let page = request.page.unwrap_or_else(|| self.first());
        let size = request.size.unwrap_or(default_size);

        let (page_key, size_key) = match self {
            PaginationStrategy::PageNumber => (&names.number, &names.size),
            PaginationStrategy::Offset => (&names.offset, &names.limit),
        };

        vec![
            (page_key.clone(), page.to_string()),
            (size_key.clone(), size.to_string()),
        ]
    }
}

//! Paginated query results.

use serde::Serialize;

/// One page of a query together with the metadata needed to navigate the rest.
///
/// Page numbers are 1-based. The navigation values are derived from the stored
/// counts, so a result is consistent by construction.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PagedResult<T> {
    /// Items on the current page
    pub items: Vec<T>,
    total_count: u64,
    page_number: u64,
    page_size: u64,
    total_pages: u64,
    has_previous_page: bool,
    has_next_page: bool,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total_count: u64, page_number: u64, page_size: u64) -> Self {
        let total_pages = if page_size > 0 { total_count.div_ceil(page_size) } else { 0 };
        Self {
            items,
            total_count,
            page_number,
            page_size,
            total_pages,
            has_previous_page: page_number > 1,
            has_next_page: page_number < total_pages,
        }
    }

    /// Number of items across all pages.
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Current page number (1-based).
    pub fn page_number(&self) -> u64 {
        self.page_number
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Total number of pages, `0` when the page size is zero.
    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    pub fn has_previous_page(&self) -> bool {
        self.has_previous_page
    }

    pub fn has_next_page(&self) -> bool {
        self.has_next_page
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Transform the items while keeping the page metadata.
    pub fn map<U, F>(self, f: F) -> PagedResult<U>
    where
        F: FnMut(T) -> U,
    {
        PagedResult::new(
            self.items.into_iter().map(f).collect(),
            self.total_count,
            self.page_number,
            self.page_size,
        )
    }
}

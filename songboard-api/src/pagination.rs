//! Pagination utilities
//!
//! Pages are 1-indexed. A page past the end is not clamped: it yields an
//! empty `data` array while `total` and `last_page` stay correct.

use serde::{Deserialize, Serialize};

/// Page size for the remaining-songs and status lists
pub const DEFAULT_PER_PAGE: i64 = 10;

/// Page size for the general song list
pub const LIST_PER_PAGE: i64 = 15;

/// Upper bound for a caller-supplied `per_page`
pub const MAX_PER_PAGE: i64 = 100;

/// `?page=&per_page=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageQuery {
    pub fn with_default(self, default_per_page: i64) -> PageRequest {
        PageRequest::new(self.page, self.per_page, default_per_page)
    }
}

/// Sanitized page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    /// Clamp `page` to >= 1 and `per_page` to `1..=MAX_PER_PAGE`
    ///
    /// # Examples
    /// ```
    /// use songboard_api::pagination::PageRequest;
    ///
    /// let p = PageRequest::new(Some(0), Some(500), 10);
    /// assert_eq!(p.page, 1);
    /// assert_eq!(p.per_page, 100);
    ///
    /// let p = PageRequest::new(None, None, 15);
    /// assert_eq!((p.page, p.per_page), (1, 15));
    /// ```
    pub fn new(page: Option<i64>, per_page: Option<i64>, default_per_page: i64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(default_per_page).clamp(1, MAX_PER_PAGE),
        }
    }

    /// Offset for SQL LIMIT/OFFSET query
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub page: i64,
    /// Never below 1, even for an empty result
    pub last_page: i64,
    pub offset: i64,
}

/// Calculate pagination metadata from total results and a page request
///
/// # Examples
/// ```
/// use songboard_api::pagination::{calculate_pagination, PageRequest};
///
/// // 25 total results at 10 per page = 3 pages (10 + 10 + 5)
/// let p = calculate_pagination(25, PageRequest::new(Some(2), Some(10), 10));
/// assert_eq!(p.last_page, 3);
/// assert_eq!(p.offset, 10);
/// ```
pub fn calculate_pagination(total_results: i64, request: PageRequest) -> Pagination {
    let last_page = ((total_results + request.per_page - 1) / request.per_page).max(1);

    Pagination {
        page: request.page,
        last_page,
        offset: request.offset(),
    }
}

/// One page of results as returned by a repository
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub request: PageRequest,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            request: self.request,
        }
    }
}

/// JSON pagination envelope
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub current_page: i64,
    pub last_page: i64,
    pub per_page: i64,
    pub total: i64,
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl<T> From<Page<T>> for Paginated<T> {
    fn from(page: Page<T>) -> Self {
        let p = calculate_pagination(page.total, page.request);
        let len = page.items.len() as i64;
        let (from, to) = if len == 0 {
            (None, None)
        } else {
            (Some(p.offset.saturating_add(1)), Some(p.offset.saturating_add(len)))
        };

        Paginated {
            data: page.items,
            current_page: p.page,
            last_page: p.last_page,
            per_page: page.request.per_page,
            total: page.total,
            from,
            to,
        }
    }
}

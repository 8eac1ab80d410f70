//! Offset pagination primitives and navigation metadata.
//!
//! # Responsibility
//! - Normalize caller page/limit input into a bounded [`PageRequest`].
//! - Derive the `meta.pagination` block from `(total, page, limit)`.
//!
//! # Invariants
//! - `page` and `limit` are always >= 1 after normalization.
//! - Out-of-range pages are valid: they yield `count = 0` with well-formed links.
//! - `prev` is `None` iff `page <= 1`; `next` is `None` iff `page >= total_pages`.

use serde::Serialize;

/// Page used when the caller supplies none (or zero).
pub const DEFAULT_PAGE: u32 = 1;
/// Page size used when the caller supplies none (or zero).
pub const DEFAULT_LIMIT: u32 = 10;
/// Upper bound applied to caller-provided page sizes.
pub const LIMIT_MAX: u32 = 100;

/// Normalized offset pagination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Builds a request from optional caller input.
    ///
    /// - `None` or `0` page -> [`DEFAULT_PAGE`].
    /// - `None` or `0` limit -> [`DEFAULT_LIMIT`]; values above [`LIMIT_MAX`] are clamped.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        let page = match page {
            None | Some(0) => DEFAULT_PAGE,
            Some(value) => value,
        };
        let limit = match limit {
            None | Some(0) => DEFAULT_LIMIT,
            Some(value) => value.min(LIMIT_MAX),
        };
        Self { page, limit }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of rows to skip: `(page - 1) * limit`.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of query results plus the total row count under the same filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: PageRequest,
}

impl<T> Paginated<T> {
    /// Derives navigation metadata for this page.
    pub fn meta(&self, base_url: &str) -> PaginationMeta {
        compute_meta(self.total, self.page.page(), self.page.limit(), base_url)
    }

    /// Maps page items while keeping totals and request untouched.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
        }
    }
}

/// Navigation links for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLinks {
    pub first: String,
    pub last: String,
    pub prev: Option<String>,
    pub next: Option<String>,
}

/// `meta.pagination` block returned by every list operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub total: u64,
    /// Items actually present on the current page.
    pub count: u64,
    pub per_page: u32,
    pub current_page: u32,
    pub total_pages: u64,
    pub links: PageLinks,
}

/// Computes pagination metadata.
///
/// Pure function. `page` and `limit` below 1 are treated as 1 so the
/// computation never divides by zero.
pub fn compute_meta(total: u64, page: u32, limit: u32, base_url: &str) -> PaginationMeta {
    let page = page.max(1);
    let limit = limit.max(1);
    let per_page = u64::from(limit);

    let total_pages = total.div_ceil(per_page);
    let skipped = u64::from(page - 1) * per_page;
    let count = total.saturating_sub(skipped).min(per_page);

    let link = |target: u64| format!("{base_url}?page={target}&limit={limit}");
    let current = u64::from(page);

    PaginationMeta {
        total,
        count,
        per_page: limit,
        current_page: page,
        total_pages,
        links: PageLinks {
            first: link(1),
            last: link(total_pages.max(1)),
            prev: (current > 1).then(|| link(current - 1)),
            next: (current < total_pages).then(|| link(current + 1)),
        },
    }
}

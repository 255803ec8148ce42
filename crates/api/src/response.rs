//! Shared response envelope types for API handlers.
//!
//! Single resources and lists are wrapped as `{ "data": ... }`. Paginated
//! lists use [`PageResponse`], which adds the page metadata next to `data`.

use serde::Serialize;
use servicematch_core::pagination::Paginated;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// `{ "data": [...], "pagination": { page, per_page, total, total_pages } }`.
#[derive(Debug, Serialize)]
pub struct PageResponse<T: Serialize> {
    pub data: Vec<T>,
    pub pagination: PageMeta,
}

#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl<T: Serialize> From<Paginated<T>> for PageResponse<T> {
    fn from(page: Paginated<T>) -> Self {
        Self {
            pagination: PageMeta {
                page: page.page,
                per_page: page.per_page,
                total: page.total,
                total_pages: page.total_pages,
            },
            data: page.items,
        }
    }
}

//! Shared query parameter types for API handlers.

use serde::Deserialize;
use servicematch_core::error::CoreError;
use servicematch_core::pagination::PageRequest;

/// Page-number pagination parameters (`?page=&per_page=`).
///
/// Out-of-range values are clamped by [`PageRequest::new`].
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PaginationParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }
}

/// Pagination plus an optional `?status=` filter.
#[derive(Debug, Default, Deserialize)]
pub struct StatusPageParams {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl StatusPageParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }

    /// Parse the status filter with `parse`, treating an empty value as absent.
    pub fn status<S>(&self, parse: fn(&str) -> Result<S, CoreError>) -> Result<Option<S>, CoreError> {
        self.status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| parse(&s.to_uppercase()))
            .transpose()
    }
}

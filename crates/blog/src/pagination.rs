//! Page/pageSize query parameters and paged responses.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{ServiceError, ServiceResult};

pub const DEFAULT_PAGE_SIZE: i64 = 25;
pub const MAX_PAGE_SIZE: i64 = 100;

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// Zero-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(default)]
    #[validate(range(min = 0, message = "must not be negative"))]
    pub page: i64,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100, message = "must be between 1 and 100"))]
    pub page_size: i64,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageQuery {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self { page, page_size }
    }

    /// Validate and return self, so callers can chain into the query.
    ///
    /// Rejects pages whose row offset does not fit in an `i64`.
    pub fn checked(self) -> ServiceResult<Self> {
        self.validate()?;
        if self.page.checked_mul(self.page_size).is_none() {
            return Err(ServiceError::validation("page: is too large"));
        }
        Ok(self)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.page_size)
    }
}

/// One page of results. `total` counts the whole matching set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(query: PageQuery, total: i64, items: Vec<T>) -> Self {
        Self {
            total,
            page: query.page,
            page_size: query.page_size,
            items,
        }
    }

    pub fn empty(query: PageQuery) -> Self {
        Self::new(query, 0, Vec::new())
    }
}

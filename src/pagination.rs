// ABOUTME: Page-based pagination parameters and response metadata
// ABOUTME: Enforces page >= 1 and 1 <= limit <= 100, computes total_pages as ceil(total/limit)
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Parley Contributors

use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Highest permitted page size
pub const MAX_LIMIT: i64 = 100;

/// Default page size when the query omits `limit`
pub const DEFAULT_LIMIT: i64 = 20;

/// Query-string pagination parameters
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

const fn default_page() -> i64 {
    1
}

const fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PaginationParams {
    /// Validate bounds and return `(limit, offset)` for the query
    ///
    /// # Errors
    ///
    /// Returns a validation error when `page < 1` or `limit` is outside 1..=100.
    pub fn to_limit_offset(self) -> AppResult<(i64, i64)> {
        if self.page < 1 {
            return Err(AppError::validation(
                "Invalid pagination parameters",
                &[("page", "Page must be a positive number")],
            ));
        }
        if self.limit < 1 || self.limit > MAX_LIMIT {
            return Err(AppError::validation(
                "Invalid pagination parameters",
                &[("limit", "Limit must be a number between 1 and 100")],
            ));
        }
        Ok((self.limit, (self.page - 1) * self.limit))
    }
}

/// One page of results plus pagination metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl<T> PaginatedResponse<T> {
    /// Assemble a page; `total_pages = ceil(total / limit)`
    #[must_use]
    pub fn new(items: Vec<T>, total: i64, params: PaginationParams) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + params.limit - 1) / params.limit
        };
        Self {
            items,
            total,
            page: params.page,
            limit: params.limit,
            total_pages,
        }
    }
}

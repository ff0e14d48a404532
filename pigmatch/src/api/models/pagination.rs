//! Offset pagination for list endpoints.
//!
//! Limits are clamped against the deployment's [`PaginationConfig`], so a client can never
//! ask for an empty page or more than `max_limit` items.

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

use crate::config::PaginationConfig;

#[serde_as]
#[derive(Debug, Default, Clone, Copy, Deserialize, IntoParams, ToSchema)]
pub struct Pagination {
    /// Number of items to skip (default: 0)
    #[param(default = 0, minimum = 0)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub skip: Option<i64>,

    /// Maximum number of items to return (default and maximum are configurable)
    #[param(minimum = 1)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub limit: Option<i64>,
}

impl Pagination {
    #[inline]
    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    #[inline]
    pub fn limit(&self, config: &PaginationConfig) -> i64 {
        self.limit.unwrap_or(config.default_limit).clamp(1, config.max_limit)
    }

    /// Cut one page out of an already ordered list.
    pub fn page<T: ToSchema>(&self, items: impl IntoIterator<Item = T>, config: &PaginationConfig) -> PaginatedResponse<T> {
        let (skip, limit) = (self.skip(), self.limit(config));
        let items: Vec<T> = items.into_iter().collect();
        let total_count = items.len() as i64;
        let data = items.into_iter().skip(skip as usize).take(limit as usize).collect();
        PaginatedResponse::new(data, total_count, skip, limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T: ToSchema> {
    pub data: Vec<T>,
    /// Total number of items matching the query (before pagination)
    pub total_count: i64,
    pub skip: i64,
    pub limit: i64,
}

impl<T: ToSchema> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total_count: i64, skip: i64, limit: i64) -> Self {
        Self {
            data,
            total_count,
            skip,
            limit,
        }
    }
}

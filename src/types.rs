/// Shared types used across the codebase

use serde::Serialize;

use crate::database::Row;
use crate::services::CrudError;

/// A validated pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Parse `page`/`limit` query values. Missing values take defaults (page 1,
    /// `default_limit`); limits above `max_limit` are capped.
    pub fn parse(
        page: Option<&str>,
        limit: Option<&str>,
        default_limit: u32,
        max_limit: u32,
    ) -> Result<Self, CrudError> {
        let page = match page {
            Some(p) => positive(p, "page")?,
            None => 1,
        };
        let mut limit = match limit {
            Some(l) => positive(l, "limit")?,
            None => default_limit.max(1),
        };
        if max_limit > 0 && limit > max_limit {
            tracing::debug!("Limit {} exceeds max {}, capping to max", limit, max_limit);
            limit = max_limit;
        }
        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }
}

fn positive(raw: &str, field: &str) -> Result<u32, CrudError> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(CrudError::InvalidPagination(format!(
            "'{}' must be a positive integer, got '{}'",
            field, raw
        ))),
    }
}

/// One page of rows plus the totals needed to navigate the rest
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub total_items: u64,
    pub current_page: u32,
    pub total_pages: u64,
    pub data: Vec<Row>,
}

impl Page {
    pub fn new(total_items: u64, request: PageRequest, data: Vec<Row>) -> Self {
        Self {
            total_items,
            current_page: request.page,
            total_pages: total_pages(total_items, request.limit),
            data,
        }
    }
}

/// ceil(total / limit)
pub fn total_pages(total_items: u64, limit: u32) -> u64 {
    let limit = limit.max(1) as u64;
    total_items.div_ceil(limit)
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::errors::{DomainError, DomainResult};

/// Pagination parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationParams {
    pub page: u32,
    pub per_page: u32,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 12,
        }
    }
}

impl PaginationParams {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }

    /// Clamp page to >= 1 and per_page to 1..=100.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, 100),
        }
    }

    pub fn offset(&self) -> i64 {
        let p = self.normalized();
        ((p.page - 1) as i64) * p.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.normalized().per_page as i64
    }
}

/// Paginated result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResult<T> {
    pub fn new(items: Vec<T>, total: u64, params: PaginationParams) -> Self {
        let params = params.normalized();
        let total_pages = (total as f64 / params.per_page as f64).ceil() as u32;
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
            total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PaginatedResult<U> {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}

/// Timestamps are stored with a fixed precision so TEXT ordering matches
/// chronological ordering.
pub fn to_db_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_db_uuid(value: &str, column: &str) -> DomainResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| DomainError::Internal(format!("Invalid UUID format for {} '{}': {}", column, value, e)))
}

pub fn parse_db_timestamp(value: &str, column: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DomainError::Internal(format!("Invalid RFC3339 format for {} '{}': {}", column, value, e)))
}

pub fn parse_db_decimal(value: &str, column: &str) -> DomainResult<Decimal> {
    Decimal::from_str(value)
        .map_err(|e| DomainError::Internal(format!("Invalid Decimal format for {} '{}': {}", column, value, e)))
}

pub fn parse_optional_uuid(value: &Option<String>, column: &str) -> DomainResult<Option<Uuid>> {
    value.as_deref().map(|v| parse_db_uuid(v, column)).transpose()
}

pub fn parse_optional_timestamp(value: &Option<String>, column: &str) -> DomainResult<Option<DateTime<Utc>>> {
    value.as_deref().map(|v| parse_db_timestamp(v, column)).transpose()
}

//! Configuration management

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::{ServiceError, ServiceResult};

// ============================================================================
// Defaults
// ============================================================================

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://webinar.db";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// Default time a writer waits on a locked database, in seconds.
pub const DEFAULT_DATABASE_BUSY_TIMEOUT_SECS: u64 = 5;

/// Default booking reference prefix.
pub const DEFAULT_BOOKING_REFERENCE_PREFIX: &str = "WB";

/// Default number of attempts when a generated reference collides.
pub const DEFAULT_BOOKING_REFERENCE_ATTEMPTS: u32 = 5;

pub const DEFAULT_RELEASE_FULL_ON_CANCEL: bool = false;

/// Default catalog page size.
pub const DEFAULT_PAGE_SIZE: u32 = 12;

pub const DEFAULT_FEATURED_LIMIT: u32 = 6;

pub const DEFAULT_RELATED_LIMIT: u32 = 3;

/// Default number of days a duplicated workshop is moved forward.
pub const DEFAULT_DUPLICATE_SHIFT_DAYS: i64 = 7;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub booking: BookingPolicy,
    pub catalog: CatalogConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

/// Booking rules that are deployment choices rather than invariants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingPolicy {
    pub reference_prefix: String,
    pub reference_attempts: u32,
    /// Move a `full` workshop back to `active` when a cancellation frees seats.
    pub release_full_on_cancel: bool,
}

/// Catalog listing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogConfig {
    pub page_size: u32,
    pub featured_limit: u32,
    pub related_limit: u32,
    pub duplicate_shift_days: i64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            busy_timeout_secs: DEFAULT_DATABASE_BUSY_TIMEOUT_SECS,
        }
    }
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            reference_prefix: DEFAULT_BOOKING_REFERENCE_PREFIX.to_string(),
            reference_attempts: DEFAULT_BOOKING_REFERENCE_ATTEMPTS,
            release_full_on_cancel: DEFAULT_RELEASE_FULL_ON_CANCEL,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            featured_limit: DEFAULT_FEATURED_LIMIT,
            related_limit: DEFAULT_RELATED_LIMIT,
            duplicate_shift_days: DEFAULT_DUPLICATE_SHIFT_DAYS,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            booking: BookingPolicy::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and defaults
    pub fn from_env() -> ServiceResult<Self> {
        dotenv::dotenv().ok();

        let config = AppConfig {
            database: DatabaseConfig {
                url: std::env::var("WEBINAR_DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: env_or("WEBINAR_DB_MAX_CONNECTIONS", DEFAULT_DATABASE_MAX_CONNECTIONS)?,
                busy_timeout_secs: env_or("WEBINAR_DB_BUSY_TIMEOUT_SECS", DEFAULT_DATABASE_BUSY_TIMEOUT_SECS)?,
            },
            booking: BookingPolicy {
                reference_prefix: std::env::var("WEBINAR_BOOKING_REFERENCE_PREFIX")
                    .unwrap_or_else(|_| DEFAULT_BOOKING_REFERENCE_PREFIX.to_string()),
                reference_attempts: env_or("WEBINAR_BOOKING_REFERENCE_ATTEMPTS", DEFAULT_BOOKING_REFERENCE_ATTEMPTS)?,
                release_full_on_cancel: env_or("WEBINAR_RELEASE_FULL_ON_CANCEL", DEFAULT_RELEASE_FULL_ON_CANCEL)?,
            },
            catalog: CatalogConfig {
                page_size: env_or("WEBINAR_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
                featured_limit: env_or("WEBINAR_FEATURED_LIMIT", DEFAULT_FEATURED_LIMIT)?,
                related_limit: env_or("WEBINAR_RELATED_LIMIT", DEFAULT_RELATED_LIMIT)?,
                duplicate_shift_days: env_or("WEBINAR_DUPLICATE_SHIFT_DAYS", DEFAULT_DUPLICATE_SHIFT_DAYS)?,
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> ServiceResult<()> {
        if self.database.url.is_empty() {
            return Err(config_error("Database URL cannot be empty"));
        }

        if self.database.max_connections == 0 {
            return Err(config_error("Database max_connections must be greater than 0"));
        }

        let prefix = &self.booking.reference_prefix;
        if prefix.len() != 2 || !prefix.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(config_error(&format!(
                "Booking reference prefix must be two uppercase letters, got '{}'",
                prefix
            )));
        }

        if self.booking.reference_attempts == 0 {
            return Err(config_error("Booking reference attempts must be greater than 0"));
        }

        if self.catalog.page_size == 0 || self.catalog.page_size > 100 {
            return Err(config_error("Catalog page size must be between 1 and 100"));
        }

        Ok(())
    }
}

fn config_error(message: &str) -> ServiceError {
    ServiceError::Configuration(message.to_string())
}

/// Read `key` from the environment, falling back to `default` when unset.
/// A set but unparsable value is an error rather than a silent default.
fn env_or<T: FromStr>(key: &str, default: T) -> ServiceResult<T> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| {
            ServiceError::Configuration(format!("Invalid value for {}: '{}'", key, raw))
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.booking.reference_prefix, "WB");
        assert_eq!(config.catalog.page_size, 12);
        assert!(!config.booking.release_full_on_cancel);
    }

    #[test]
    fn test_rejects_bad_prefix() {
        let mut config = AppConfig::default();
        config.booking.reference_prefix = "wb".to_string();
        assert!(matches!(config.validate(), Err(ServiceError::Configuration(_))));

        config.booking.reference_prefix = "WBX".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_pool() {
        let mut config = AppConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_or_parsing() {
        std::env::set_var("WEBINAR_TEST_ENV_OR_NUMBER", "42");
        std::env::set_var("WEBINAR_TEST_ENV_OR_GARBAGE", "forty-two");
        assert_eq!(env_or("WEBINAR_TEST_ENV_OR_NUMBER", 1u32).unwrap(), 42);
        assert!(env_or("WEBINAR_TEST_ENV_OR_GARBAGE", 1u32).is_err());
        assert_eq!(env_or("WEBINAR_TEST_ENV_OR_UNSET", 7u32).unwrap(), 7);
    }
}

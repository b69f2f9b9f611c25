//! Storage and business rules for an online workshop (webinar) catalog:
//! categories, workshops with seat capacity, bookings, reviews, newsletter
//! subscribers and static content pages.

// Public modules
pub mod config;
pub mod database;
pub mod db_migration;
pub mod domains;
pub mod errors;
pub mod globals;
pub mod types;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use config::{AppConfig, BookingPolicy, CatalogConfig, DatabaseConfig};
pub use errors::{DomainError, DomainResult, ServiceError, ServiceResult};

/// Load configuration from the environment and initialize every service.
/// Must be called before any of the `globals::get_*` accessors.
pub async fn initialize_from_env() -> ServiceResult<()> {
    let config = AppConfig::from_env()?;
    globals::initialize(config).await
}

/// Initialize with an explicit configuration
pub async fn initialize(config: AppConfig) -> ServiceResult<()> {
    globals::initialize(config).await
}

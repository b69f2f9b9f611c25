use crate::config::AppConfig;
use crate::database;
use crate::db_migration::run_migrations;
use crate::domains::booking::repository::SqliteBookingRepository;
use crate::domains::booking::service::{BookingService, BookingServiceImpl};
use crate::domains::category::repository::SqliteCategoryRepository;
use crate::domains::category::service::{CategoryService, CategoryServiceImpl};
use crate::domains::content::repository::SqliteContentRepository;
use crate::domains::content::service::{ContentService, ContentServiceImpl};
use crate::domains::newsletter::repository::SqliteSubscriberRepository;
use crate::domains::newsletter::service::{NewsletterService, NewsletterServiceImpl};
use crate::domains::review::repository::SqliteReviewRepository;
use crate::domains::review::service::{ReviewService, ReviewServiceImpl};
use crate::domains::workshop::repository::SqliteWorkshopRepository;
use crate::domains::workshop::service::{WorkshopService, WorkshopServiceImpl};
use crate::errors::{DomainError, ServiceError, ServiceResult};
use lazy_static::lazy_static;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

// Global state definitions
lazy_static! {
    static ref INIT_MUTEX: tokio::sync::Mutex<()> = tokio::sync::Mutex::new(());
    static ref INITIALIZED: AtomicBool = AtomicBool::new(false);

    static ref DB_POOL: Mutex<Option<SqlitePool>> = Mutex::new(None);
    static ref APP_CONFIG: Mutex<Option<AppConfig>> = Mutex::new(None);

    static ref CATEGORY_SERVICE: Mutex<Option<Arc<dyn CategoryService>>> = Mutex::new(None);
    static ref WORKSHOP_SERVICE: Mutex<Option<Arc<dyn WorkshopService>>> = Mutex::new(None);
    static ref BOOKING_SERVICE: Mutex<Option<Arc<dyn BookingService>>> = Mutex::new(None);
    static ref REVIEW_SERVICE: Mutex<Option<Arc<dyn ReviewService>>> = Mutex::new(None);
    static ref NEWSLETTER_SERVICE: Mutex<Option<Arc<dyn NewsletterService>>> = Mutex::new(None);
    static ref CONTENT_SERVICE: Mutex<Option<Arc<dyn ContentService>>> = Mutex::new(None);
}

fn read_global<T: Clone>(slot: &Mutex<Option<T>>, name: &str) -> ServiceResult<T> {
    slot.lock()
        .map_err(|_| ServiceError::Configuration(format!("{} lock poisoned", name)))?
        .clone()
        .ok_or_else(|| ServiceError::Configuration(format!("{} not initialized", name)))
}

fn write_global<T>(slot: &Mutex<Option<T>>, name: &str, value: T) -> ServiceResult<()> {
    let mut guard = slot
        .lock()
        .map_err(|_| ServiceError::Configuration(format!("{} lock poisoned", name)))?;
    *guard = Some(value);
    Ok(())
}

pub fn get_db_pool() -> ServiceResult<SqlitePool> {
    read_global(&DB_POOL, "DB_POOL")
}
pub fn get_config() -> ServiceResult<AppConfig> {
    read_global(&APP_CONFIG, "APP_CONFIG")
}
pub fn get_category_service() -> ServiceResult<Arc<dyn CategoryService>> {
    read_global(&CATEGORY_SERVICE, "CategoryService")
}
pub fn get_workshop_service() -> ServiceResult<Arc<dyn WorkshopService>> {
    read_global(&WORKSHOP_SERVICE, "WorkshopService")
}
pub fn get_booking_service() -> ServiceResult<Arc<dyn BookingService>> {
    read_global(&BOOKING_SERVICE, "BookingService")
}
pub fn get_review_service() -> ServiceResult<Arc<dyn ReviewService>> {
    read_global(&REVIEW_SERVICE, "ReviewService")
}
pub fn get_newsletter_service() -> ServiceResult<Arc<dyn NewsletterService>> {
    read_global(&NEWSLETTER_SERVICE, "NewsletterService")
}
pub fn get_content_service() -> ServiceResult<Arc<dyn ContentService>> {
    read_global(&CONTENT_SERVICE, "ContentService")
}

pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

/// Connect, migrate and wire every service. Later calls are no-ops once an
/// initialization has succeeded.
pub async fn initialize(config: AppConfig) -> ServiceResult<()> {
    let _guard = INIT_MUTEX.lock().await;

    if INITIALIZED.load(Ordering::Acquire) {
        return Ok(());
    }

    let result = initialize_internal(config).await;

    if result.is_ok() {
        INITIALIZED.store(true, Ordering::Release);
    }

    result
}

async fn initialize_internal(config: AppConfig) -> ServiceResult<()> {
    if std::env::var("RUST_LOG").is_err() {
        #[cfg(debug_assertions)]
        std::env::set_var("RUST_LOG", "debug");
        #[cfg(not(debug_assertions))]
        std::env::set_var("RUST_LOG", "info");
    }
    let _ = env_logger::try_init();

    config.validate()?;
    log::info!("Starting initialization");
    log::debug!("Database URL: {}", config.database.url);

    let pool = database::connect(&config.database)
        .await
        .map_err(DomainError::from)?;
    run_migrations(&pool).await.map_err(DomainError::from)?;
    log::info!("Database ready");

    let category_repo = Arc::new(SqliteCategoryRepository::new(pool.clone()));
    let workshop_repo = Arc::new(SqliteWorkshopRepository::new(pool.clone()));
    let booking_repo = Arc::new(SqliteBookingRepository::new(pool.clone()));
    let review_repo = Arc::new(SqliteReviewRepository::new(pool.clone()));
    let subscriber_repo = Arc::new(SqliteSubscriberRepository::new(pool.clone()));
    let content_repo = Arc::new(SqliteContentRepository::new(pool.clone()));

    let category_service: Arc<dyn CategoryService> =
        Arc::new(CategoryServiceImpl::new(category_repo.clone()));
    let workshop_service: Arc<dyn WorkshopService> = Arc::new(WorkshopServiceImpl::new(
        pool.clone(),
        workshop_repo.clone(),
        category_repo,
        review_repo.clone(),
        booking_repo.clone(),
        config.catalog.clone(),
    ));
    let booking_service: Arc<dyn BookingService> = Arc::new(BookingServiceImpl::new(
        pool.clone(),
        booking_repo.clone(),
        workshop_repo.clone(),
        config.booking.clone(),
    ));
    let review_service: Arc<dyn ReviewService> =
        Arc::new(ReviewServiceImpl::new(review_repo, workshop_repo, booking_repo));
    let newsletter_service: Arc<dyn NewsletterService> =
        Arc::new(NewsletterServiceImpl::new(subscriber_repo));
    let content_service: Arc<dyn ContentService> =
        Arc::new(ContentServiceImpl::new(content_repo));

    write_global(&DB_POOL, "DB_POOL", pool)?;
    write_global(&APP_CONFIG, "APP_CONFIG", config)?;
    write_global(&CATEGORY_SERVICE, "CategoryService", category_service)?;
    write_global(&WORKSHOP_SERVICE, "WorkshopService", workshop_service)?;
    write_global(&BOOKING_SERVICE, "BookingService", booking_service)?;
    write_global(&REVIEW_SERVICE, "ReviewService", review_service)?;
    write_global(&NEWSLETTER_SERVICE, "NewsletterService", newsletter_service)?;
    write_global(&CONTENT_SERVICE, "ContentService", content_service)?;

    log::info!("Initialization complete");
    Ok(())
}

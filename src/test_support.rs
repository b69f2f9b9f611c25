//! Fixtures shared by the storage-backed tests.

use crate::config::DatabaseConfig;
use crate::database;
use crate::db_migration::run_migrations;
use crate::domains::booking::repository::SqliteBookingRepository;
use crate::domains::booking::types::{generate_reference, Booking};
use crate::domains::core::repository::FindById;
use crate::domains::workshop::repository::{SqliteWorkshopRepository, WorkshopRepository};
use crate::domains::workshop::types::{MeetingInfo, NewWorkshop, Workshop, WorkshopStatus};
use crate::types::to_db_timestamp;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

/// A migrated database in a throwaway directory. The directory lives as
/// long as the value.
pub struct TestDb {
    pub pool: SqlitePool,
    _dir: TempDir,
}

impl TestDb {
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("webinar_test.db").display()),
            max_connections: 5,
            busy_timeout_secs: 10,
        };
        let pool = database::connect(&config).await.expect("connect test database");
        run_migrations(&pool).await.expect("run migrations");
        Self { pool, _dir: dir }
    }
}

/// A valid, bookable workshop starting a week from now.
pub fn sample_workshop(slug: &str, max_participants: i64) -> NewWorkshop {
    let start = Utc::now() + Duration::days(7);
    NewWorkshop {
        title: format!("Workshop {}", slug),
        slug: Some(slug.to_string()),
        description: "Hands-on online session with practical exercises.".to_string(),
        short_description: None,
        category_id: None,
        start_datetime: start,
        end_datetime: start + Duration::hours(2),
        duration_hours: dec!(2.0),
        meeting: MeetingInfo::default(),
        max_participants,
        min_participants: None,
        price: dec!(49.99),
        materials_included: None,
        requirements: None,
        what_to_bring: None,
        status: None,
        is_active: None,
        featured: None,
        instructor_name: "Sofie Claes".to_string(),
        instructor_bio: None,
    }
}

pub async fn insert_workshop(db: &TestDb, new_workshop: NewWorkshop) -> Workshop {
    SqliteWorkshopRepository::new(db.pool.clone())
        .create(&new_workshop)
        .await
        .expect("insert workshop")
}

/// In-memory workshop that was never stored.
pub fn workshop_entity(start: DateTime<Utc>) -> Workshop {
    Workshop {
        id: Uuid::new_v4(),
        title: "Intro to AI".to_string(),
        slug: "intro".to_string(),
        description: "Hands-on online session with practical exercises.".to_string(),
        short_description: None,
        category_id: None,
        start_datetime: start,
        end_datetime: start + Duration::hours(2),
        duration_hours: dec!(2.0),
        meeting: MeetingInfo::default(),
        max_participants: 10,
        min_participants: 1,
        price: Decimal::from(25),
        materials_included: true,
        requirements: None,
        what_to_bring: None,
        status: WorkshopStatus::Upcoming,
        is_active: true,
        featured: false,
        instructor_name: "Sofie Claes".to_string(),
        instructor_bio: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Insert a booking row directly, bypassing capacity checks and derived
/// status updates.
pub async fn insert_booking_with_status(
    db: &TestDb,
    workshop: &Workshop,
    participants: i64,
    status: &str,
) -> Booking {
    let id = Uuid::new_v4();
    let now_str = to_db_timestamp(&Utc::now());
    let confirmed_at = (status == "confirmed" || status == "completed").then(|| now_str.clone());
    let cancelled_at = (status == "cancelled").then(|| now_str.clone());

    sqlx::query(
        "INSERT INTO bookings (
            id, workshop_id, user_id, number_of_participants, first_name, last_name, email, phone,
            total_price, payment_status, status, booking_reference, created_at, updated_at,
            confirmed_at, cancelled_at
         ) VALUES (?, ?, NULL, ?, 'Test', 'Guest', 'guest@example.com', '+32470000000', ?, 'unpaid', ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(workshop.id.to_string())
    .bind(participants)
    .bind((workshop.price * Decimal::from(participants)).to_string())
    .bind(status)
    .bind(generate_reference("WB"))
    .bind(&now_str)
    .bind(&now_str)
    .bind(confirmed_at)
    .bind(cancelled_at)
    .execute(&db.pool)
    .await
    .expect("insert booking");

    SqliteBookingRepository::new(db.pool.clone())
        .find_by_id(id)
        .await
        .expect("reload booking")
}

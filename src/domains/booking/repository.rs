use crate::domains::booking::types::{Booking, BookingInsert, BookingRow, BookingStatus, PaymentStatus};
use crate::domains::core::repository::{map_unique_violation, FindById};
use crate::errors::{DbError, DomainError, DomainResult};
use crate::types::to_db_timestamp;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query, query_as, query_scalar, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Trait defining booking repository operations.
///
/// Writes take a connection because they always run inside the caller's
/// `BEGIN IMMEDIATE` transaction together with the capacity check.
#[async_trait]
pub trait BookingRepository: FindById<Booking> + Send + Sync {
    /// Insert a pending, unpaid booking. A clash on `booking_reference`
    /// surfaces as `ValidationError::Unique { field: "booking_reference" }`.
    async fn insert_with_conn(&self, insert: &BookingInsert, conn: &mut SqliteConnection) -> DomainResult<Booking>;

    async fn find_by_reference(&self, reference: &str) -> DomainResult<Booking>;

    async fn find_by_reference_with_conn(&self, reference: &str, conn: &mut SqliteConnection) -> DomainResult<Booking>;

    /// Bookings of a workshop, oldest first
    async fn find_by_workshop(&self, workshop_id: Uuid) -> DomainResult<Vec<Booking>>;

    /// Write the new status. `confirmed_at` and `cancelled_at` are stamped
    /// only the first time the booking reaches that state.
    async fn update_status_with_conn(
        &self,
        id: Uuid,
        status: BookingStatus,
        conn: &mut SqliteConnection,
    ) -> DomainResult<Booking>;

    /// Set the payment status on bookings currently in `from`. Returns the
    /// number of rows changed.
    async fn update_payment_status(
        &self,
        references: &[String],
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> DomainResult<u64>;

    async fn count_confirmed(&self) -> DomainResult<i64>;
}

/// SQLite implementation for BookingRepository
#[derive(Debug, Clone)]
pub struct SqliteBookingRepository {
    pool: SqlitePool,
}

impl SqliteBookingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_row_to_entity(row: BookingRow) -> DomainResult<Booking> {
        row.into_entity()
            .map_err(|e| DomainError::Internal(format!("Failed to map row to entity: {}", e)))
    }

    async fn find_by_id_with_conn(&self, id: Uuid, conn: &mut SqliteConnection) -> DomainResult<Booking> {
        let row = query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| DomainError::EntityNotFound("Booking".to_string(), id))?;

        Self::map_row_to_entity(row)
    }
}

#[async_trait]
impl FindById<Booking> for SqliteBookingRepository {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Booking> {
        let row = query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| DomainError::EntityNotFound("Booking".to_string(), id))?;

        Self::map_row_to_entity(row)
    }
}

#[async_trait]
impl BookingRepository for SqliteBookingRepository {
    async fn insert_with_conn(&self, insert: &BookingInsert, conn: &mut SqliteConnection) -> DomainResult<Booking> {
        let id = Uuid::new_v4();
        let now_str = to_db_timestamp(&Utc::now());
        let participants_details = insert
            .participants_details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| DomainError::Internal(format!("Failed to serialize participants_details: {}", e)))?;

        query(
            r#"
            INSERT INTO bookings (
                id, workshop_id, user_id, number_of_participants,
                first_name, last_name, email, phone,
                participants_details, total_price, payment_status, status, notes,
                booking_reference, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'unpaid', 'pending', ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(insert.workshop_id.to_string())
        .bind(insert.user_id.map(|u| u.to_string()))
        .bind(insert.number_of_participants)
        .bind(&insert.contact.first_name)
        .bind(&insert.contact.last_name)
        .bind(&insert.contact.email)
        .bind(&insert.contact.phone)
        .bind(participants_details)
        .bind(insert.total_price.to_string())
        .bind(&insert.notes)
        .bind(&insert.booking_reference)
        .bind(&now_str)
        .bind(&now_str)
        .execute(&mut *conn)
        .await
        .map_err(map_unique_violation)?;

        self.find_by_id_with_conn(id, conn).await
    }

    async fn find_by_reference(&self, reference: &str) -> DomainResult<Booking> {
        let row = query_as::<_, BookingRow>("SELECT * FROM bookings WHERE booking_reference = ?")
            .bind(reference)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| DomainError::NotFound("Booking".to_string(), reference.to_string()))?;

        Self::map_row_to_entity(row)
    }

    async fn find_by_reference_with_conn(&self, reference: &str, conn: &mut SqliteConnection) -> DomainResult<Booking> {
        let row = query_as::<_, BookingRow>("SELECT * FROM bookings WHERE booking_reference = ?")
            .bind(reference)
            .fetch_optional(&mut *conn)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| DomainError::NotFound("Booking".to_string(), reference.to_string()))?;

        Self::map_row_to_entity(row)
    }

    async fn find_by_workshop(&self, workshop_id: Uuid) -> DomainResult<Vec<Booking>> {
        let rows = query_as::<_, BookingRow>(
            "SELECT * FROM bookings WHERE workshop_id = ? ORDER BY created_at ASC",
        )
        .bind(workshop_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        rows.into_iter().map(Self::map_row_to_entity).collect()
    }

    async fn update_status_with_conn(
        &self,
        id: Uuid,
        status: BookingStatus,
        conn: &mut SqliteConnection,
    ) -> DomainResult<Booking> {
        let now_str = to_db_timestamp(&Utc::now());

        let result = query(
            "UPDATE bookings SET
                status = ?1,
                updated_at = ?2,
                confirmed_at = CASE WHEN ?1 = 'confirmed' THEN COALESCE(confirmed_at, ?2) ELSE confirmed_at END,
                cancelled_at = CASE WHEN ?1 = 'cancelled' THEN COALESCE(cancelled_at, ?2) ELSE cancelled_at END
             WHERE id = ?3",
        )
        .bind(status.as_str())
        .bind(&now_str)
        .bind(id.to_string())
        .execute(&mut *conn)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::EntityNotFound("Booking".to_string(), id));
        }

        self.find_by_id_with_conn(id, conn).await
    }

    async fn update_payment_status(
        &self,
        references: &[String],
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> DomainResult<u64> {
        if references.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; references.len()].join(", ");
        let query_str = format!(
            "UPDATE bookings SET payment_status = ?, updated_at = ?
             WHERE payment_status = ? AND booking_reference IN ({})",
            placeholders
        );

        let mut update_query = query(&query_str)
            .bind(to.as_str())
            .bind(to_db_timestamp(&Utc::now()))
            .bind(from.as_str());
        for reference in references {
            update_query = update_query.bind(reference);
        }

        let result = update_query
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(result.rows_affected())
    }

    async fn count_confirmed(&self) -> DomainResult<i64> {
        let total: i64 = query_scalar("SELECT COUNT(*) FROM bookings WHERE status = 'confirmed'")
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(total)
    }
}

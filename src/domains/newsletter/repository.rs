use crate::domains::core::repository::FindById;
use crate::domains::newsletter::types::{Interests, Subscriber, SubscriberRow};
use crate::errors::{DbError, DomainError, DomainResult};
use crate::types::{to_db_timestamp, PaginatedResult, PaginationParams};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query, query_as, query_scalar, SqlitePool};
use uuid::Uuid;

/// Trait defining newsletter subscriber repository operations
#[async_trait]
pub trait SubscriberRepository: FindById<Subscriber> + Send + Sync {
    /// Insert a new active, confirmed subscriber or reactivate an inactive
    /// one in a single statement. Returns `None` when the email is already
    /// actively subscribed.
    async fn upsert_active(&self, email: &str, first_name: Option<&str>) -> DomainResult<Option<Subscriber>>;

    async fn find_by_email(&self, email: &str) -> DomainResult<Subscriber>;

    /// Toggle `is_active` and stamp or clear `unsubscribed_at`. Rows already
    /// in the requested state are left alone. Returns the number changed.
    async fn set_active(&self, ids: &[Uuid], active: bool) -> DomainResult<u64>;

    async fn set_interests(&self, id: Uuid, interests: &Interests) -> DomainResult<Subscriber>;

    /// Newest subscribers first
    async fn find_all(&self, active_only: bool, params: PaginationParams) -> DomainResult<PaginatedResult<Subscriber>>;

    /// Active subscribers ordered by email
    async fn find_active(&self) -> DomainResult<Vec<Subscriber>>;
}

/// SQLite implementation for SubscriberRepository
#[derive(Debug, Clone)]
pub struct SqliteSubscriberRepository {
    pool: SqlitePool,
}

impl SqliteSubscriberRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_row_to_entity(row: SubscriberRow) -> DomainResult<Subscriber> {
        row.into_entity()
            .map_err(|e| DomainError::Internal(format!("Failed to map row to entity: {}", e)))
    }
}

#[async_trait]
impl FindById<Subscriber> for SqliteSubscriberRepository {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Subscriber> {
        let row = query_as::<_, SubscriberRow>("SELECT * FROM newsletter_subscribers WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| DomainError::EntityNotFound("Subscriber".to_string(), id))?;

        Self::map_row_to_entity(row)
    }
}

#[async_trait]
impl SubscriberRepository for SqliteSubscriberRepository {
    async fn upsert_active(&self, email: &str, first_name: Option<&str>) -> DomainResult<Option<Subscriber>> {
        let result = query(
            "INSERT INTO newsletter_subscribers (id, email, first_name, is_active, confirmed, subscribed_at)
             VALUES (?, ?, ?, 1, 1, ?)
             ON CONFLICT(email) DO UPDATE SET
                is_active = 1,
                confirmed = 1,
                unsubscribed_at = NULL,
                first_name = COALESCE(excluded.first_name, newsletter_subscribers.first_name)
             WHERE newsletter_subscribers.is_active = 0",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(email)
        .bind(first_name)
        .bind(to_db_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_by_email(email).await.map(Some)
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Subscriber> {
        let row = query_as::<_, SubscriberRow>("SELECT * FROM newsletter_subscribers WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| DomainError::NotFound("Subscriber".to_string(), email.to_string()))?;

        Self::map_row_to_entity(row)
    }

    async fn set_active(&self, ids: &[Uuid], active: bool) -> DomainResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let query_str = format!(
            "UPDATE newsletter_subscribers
             SET is_active = ?, unsubscribed_at = ?
             WHERE is_active <> ? AND id IN ({})",
            placeholders
        );

        let unsubscribed_at = if active {
            None
        } else {
            Some(to_db_timestamp(&Utc::now()))
        };

        let mut update_query = query(&query_str)
            .bind(active)
            .bind(unsubscribed_at)
            .bind(active);
        for id in ids {
            update_query = update_query.bind(id.to_string());
        }

        let result = update_query
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(result.rows_affected())
    }

    async fn set_interests(&self, id: Uuid, interests: &Interests) -> DomainResult<Subscriber> {
        let result = query("UPDATE newsletter_subscribers SET interests = ? WHERE id = ?")
            .bind(interests.to_json()?)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::EntityNotFound("Subscriber".to_string(), id));
        }

        self.find_by_id(id).await
    }

    async fn find_all(&self, active_only: bool, params: PaginationParams) -> DomainResult<PaginatedResult<Subscriber>> {
        let where_clause = if active_only { "WHERE is_active = 1" } else { "" };

        let total: i64 = query_scalar(&format!("SELECT COUNT(*) FROM newsletter_subscribers {}", where_clause))
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;

        let rows = query_as::<_, SubscriberRow>(&format!(
            "SELECT * FROM newsletter_subscribers {} ORDER BY subscribed_at DESC, email ASC LIMIT ? OFFSET ?",
            where_clause
        ))
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(Self::map_row_to_entity)
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(PaginatedResult::new(items, total as u64, params))
    }

    async fn find_active(&self) -> DomainResult<Vec<Subscriber>> {
        let rows = query_as::<_, SubscriberRow>(
            "SELECT * FROM newsletter_subscribers WHERE is_active = 1 ORDER BY email ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        rows.into_iter().map(Self::map_row_to_entity).collect()
    }
}

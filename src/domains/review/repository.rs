use crate::domains::core::repository::FindById;
use crate::domains::review::types::{NewReview, RatingSummary, Review, ReviewRow};
use crate::errors::{DbError, DomainError, DomainResult};
use crate::types::to_db_timestamp;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query, query_as, query_scalar, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

/// Trait defining review repository operations
#[async_trait]
pub trait ReviewRepository: FindById<Review> + Send + Sync {
    /// Insert the review. A second review for the same (workshop, user) pair
    /// or the same booking fails with `DuplicateReview`.
    async fn create(&self, new_review: &NewReview) -> DomainResult<Review>;

    /// Approved reviews of a workshop, newest first
    async fn find_approved_by_workshop(&self, workshop_id: Uuid) -> DomainResult<Vec<Review>>;

    async fn rating_summary(&self, workshop_id: Uuid) -> DomainResult<RatingSummary>;

    /// Batched variant for list responses. Workshops without approved
    /// reviews are absent from the map.
    async fn rating_summaries(&self, workshop_ids: &[Uuid]) -> DomainResult<HashMap<Uuid, RatingSummary>>;

    /// Returns the number of rows changed
    async fn set_approval(&self, ids: &[Uuid], approved: bool) -> DomainResult<u64>;

    async fn count_approved(&self) -> DomainResult<i64>;
}

/// SQLite implementation for ReviewRepository
#[derive(Debug, Clone)]
pub struct SqliteReviewRepository {
    pool: SqlitePool,
}

impl SqliteReviewRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_row_to_entity(row: ReviewRow) -> DomainResult<Review> {
        row.into_entity()
            .map_err(|e| DomainError::Internal(format!("Failed to map row to entity: {}", e)))
    }
}

#[async_trait]
impl FindById<Review> for SqliteReviewRepository {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Review> {
        let row = query_as::<_, ReviewRow>("SELECT * FROM reviews WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| DomainError::EntityNotFound("Review".to_string(), id))?;

        Self::map_row_to_entity(row)
    }
}

#[async_trait]
impl ReviewRepository for SqliteReviewRepository {
    async fn create(&self, new_review: &NewReview) -> DomainResult<Review> {
        let id = Uuid::new_v4();
        let now_str = to_db_timestamp(&Utc::now());

        let result = query(
            "INSERT INTO reviews (
                id, workshop_id, booking_id, user_id, rating, title, comment,
                is_approved, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(id.to_string())
        .bind(new_review.workshop_id.to_string())
        .bind(new_review.booking_id.map(|b| b.to_string()))
        .bind(new_review.user_id.to_string())
        .bind(new_review.rating)
        .bind(new_review.title.trim())
        .bind(new_review.comment.trim())
        .bind(&now_str)
        .bind(&now_str)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            let db_err = DbError::from(e);
            if db_err.is_unique_violation() {
                return Err(DomainError::DuplicateReview {
                    workshop_id: new_review.workshop_id,
                    user_id: new_review.user_id,
                });
            }
            return Err(DomainError::Database(db_err));
        }

        self.find_by_id(id).await
    }

    async fn find_approved_by_workshop(&self, workshop_id: Uuid) -> DomainResult<Vec<Review>> {
        let rows = query_as::<_, ReviewRow>(
            "SELECT * FROM reviews WHERE workshop_id = ? AND is_approved = 1 ORDER BY created_at DESC",
        )
        .bind(workshop_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        rows.into_iter().map(Self::map_row_to_entity).collect()
    }

    async fn rating_summary(&self, workshop_id: Uuid) -> DomainResult<RatingSummary> {
        let (average, count): (Option<f64>, i64) = query_as(
            "SELECT AVG(CAST(rating AS REAL)), COUNT(*) FROM reviews WHERE workshop_id = ? AND is_approved = 1",
        )
        .bind(workshop_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(RatingSummary::from_aggregate(average, count))
    }

    async fn rating_summaries(&self, workshop_ids: &[Uuid]) -> DomainResult<HashMap<Uuid, RatingSummary>> {
        if workshop_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; workshop_ids.len()].join(", ");
        let query_str = format!(
            "SELECT workshop_id, AVG(CAST(rating AS REAL)), COUNT(*) FROM reviews
             WHERE is_approved = 1 AND workshop_id IN ({})
             GROUP BY workshop_id",
            placeholders
        );

        let mut select_query = query_as::<_, (String, Option<f64>, i64)>(&query_str);
        for id in workshop_ids {
            select_query = select_query.bind(id.to_string());
        }

        let rows = select_query
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        rows.into_iter()
            .map(|(id, average, count)| {
                Ok((
                    crate::types::parse_db_uuid(&id, "reviews.workshop_id")?,
                    RatingSummary::from_aggregate(average, count),
                ))
            })
            .collect()
    }

    async fn set_approval(&self, ids: &[Uuid], approved: bool) -> DomainResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let query_str = format!(
            "UPDATE reviews SET is_approved = ?, updated_at = ? WHERE is_approved <> ? AND id IN ({})",
            placeholders
        );

        let mut update_query = query(&query_str)
            .bind(approved)
            .bind(to_db_timestamp(&Utc::now()))
            .bind(approved);
        for id in ids {
            update_query = update_query.bind(id.to_string());
        }

        let result = update_query
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(result.rows_affected())
    }

    async fn count_approved(&self) -> DomainResult<i64> {
        let total: i64 = query_scalar("SELECT COUNT(*) FROM reviews WHERE is_approved = 1")
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(total)
    }
}

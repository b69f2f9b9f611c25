use crate::errors::DomainResult;
use crate::types::{parse_db_timestamp, parse_db_uuid, parse_optional_uuid};
use crate::validation::{Validate, ValidationBuilder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

const MAX_TITLE_LENGTH: usize = 200;

/// Review entity - a participant's rating of a workshop
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub id: Uuid,
    pub workshop_id: Uuid,
    pub booking_id: Option<Uuid>,
    pub user_id: Uuid,
    pub rating: i64,
    pub title: String,
    pub comment: String,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// NewReview DTO - used when creating a new review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReview {
    pub workshop_id: Uuid,
    pub user_id: Uuid,
    pub booking_id: Option<Uuid>,
    pub rating: i64,
    pub title: String,
    pub comment: String,
}

impl Validate for NewReview {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("workshop_id", Some(self.workshop_id))
            .not_nil()
            .validate()?;

        ValidationBuilder::new("user_id", Some(self.user_id))
            .not_nil()
            .validate()?;

        ValidationBuilder::new("rating", Some(self.rating))
            .range(1, 5)
            .validate()?;

        ValidationBuilder::new("title", Some(self.title.clone()))
            .not_blank()
            .max_length(MAX_TITLE_LENGTH)
            .validate()?;

        ValidationBuilder::new("comment", Some(self.comment.clone()))
            .not_blank()
            .validate()
    }
}

/// ReviewRow - SQLite row representation for mapping from database
#[derive(Debug, Clone, FromRow)]
pub struct ReviewRow {
    pub id: String,
    pub workshop_id: String,
    pub booking_id: Option<String>,
    pub user_id: String,
    pub rating: i64,
    pub title: String,
    pub comment: String,
    pub is_approved: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl ReviewRow {
    /// Convert database row to domain entity
    pub fn into_entity(self) -> DomainResult<Review> {
        Ok(Review {
            id: parse_db_uuid(&self.id, "reviews.id")?,
            workshop_id: parse_db_uuid(&self.workshop_id, "reviews.workshop_id")?,
            booking_id: parse_optional_uuid(&self.booking_id, "reviews.booking_id")?,
            user_id: parse_db_uuid(&self.user_id, "reviews.user_id")?,
            rating: self.rating,
            title: self.title,
            comment: self.comment,
            is_approved: self.is_approved,
            created_at: parse_db_timestamp(&self.created_at, "reviews.created_at")?,
            updated_at: parse_db_timestamp(&self.updated_at, "reviews.updated_at")?,
        })
    }
}

/// Mean rating over approved reviews, rounded to one decimal.
/// `(0.0, 0)` when there are none.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct RatingSummary {
    pub average: f64,
    pub count: i64,
}

impl RatingSummary {
    pub fn from_aggregate(average: Option<f64>, count: i64) -> Self {
        match average {
            Some(avg) if count > 0 => Self {
                average: (avg * 10.0).round() / 10.0,
                count,
            },
            _ => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_review(rating: i64) -> NewReview {
        NewReview {
            workshop_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            booking_id: None,
            rating,
            title: "Great session".to_string(),
            comment: "Learned a lot about prompting.".to_string(),
        }
    }

    #[test]
    fn test_rating_bounds() {
        assert!(new_review(1).validate().is_ok());
        assert!(new_review(5).validate().is_ok());
        assert!(new_review(0).validate().is_err());
        assert!(new_review(6).validate().is_err());
    }

    #[test]
    fn test_blank_comment_rejected() {
        let mut review = new_review(4);
        review.comment = "   ".to_string();
        assert!(review.validate().is_err());
    }

    #[test]
    fn test_rating_summary_rounding() {
        assert_eq!(RatingSummary::from_aggregate(Some(14.0 / 3.0), 3), RatingSummary { average: 4.7, count: 3 });
        assert_eq!(RatingSummary::from_aggregate(None, 0), RatingSummary { average: 0.0, count: 0 });
        assert_eq!(RatingSummary::from_aggregate(Some(4.25), 4).average, 4.3);
    }
}

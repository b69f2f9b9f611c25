use crate::domains::booking::repository::BookingRepository;
use crate::domains::booking::types::BookingStatus;
use crate::domains::core::repository::FindById;
use crate::domains::review::repository::ReviewRepository;
use crate::domains::review::types::{NewReview, RatingSummary, Review};
use crate::domains::workshop::repository::WorkshopRepository;
use crate::errors::{DomainError, DomainResult, ServiceResult, ValidationError};
use crate::validation::Validate;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Trait defining review service operations
#[async_trait]
pub trait ReviewService: Send + Sync {
    async fn add_review(&self, new_review: NewReview) -> ServiceResult<Review>;

    async fn average_rating(&self, workshop_id: Uuid) -> ServiceResult<RatingSummary>;

    async fn approved_reviews_for_workshop(&self, workshop_id: Uuid) -> ServiceResult<Vec<Review>>;

    /// Approve or hide reviews. Returns the number of reviews changed.
    async fn set_approval(&self, ids: &[Uuid], approved: bool) -> ServiceResult<u64>;
}

#[derive(Clone)]
pub struct ReviewServiceImpl {
    repo: Arc<dyn ReviewRepository>,
    workshop_repo: Arc<dyn WorkshopRepository>,
    booking_repo: Arc<dyn BookingRepository>,
}

impl ReviewServiceImpl {
    pub fn new(
        repo: Arc<dyn ReviewRepository>,
        workshop_repo: Arc<dyn WorkshopRepository>,
        booking_repo: Arc<dyn BookingRepository>,
    ) -> Self {
        Self {
            repo,
            workshop_repo,
            booking_repo,
        }
    }

    /// A review may point at the booking it came from; that booking has to
    /// be a completed booking of the same workshop by the same user.
    async fn check_booking_relation(&self, new_review: &NewReview, booking_id: Uuid) -> DomainResult<()> {
        let booking = self.booking_repo.find_by_id(booking_id).await?;

        if booking.workshop_id != new_review.workshop_id {
            return Err(DomainError::Validation(ValidationError::relationship(
                "The booking belongs to a different workshop",
            )));
        }
        if booking.user_id.is_some_and(|owner| owner != new_review.user_id) {
            return Err(DomainError::Validation(ValidationError::relationship(
                "The booking belongs to a different user",
            )));
        }
        if booking.status != BookingStatus::Completed {
            return Err(DomainError::Validation(ValidationError::relationship(
                "Only completed bookings can be reviewed",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ReviewService for ReviewServiceImpl {
    async fn add_review(&self, new_review: NewReview) -> ServiceResult<Review> {
        new_review.validate()?;
        self.workshop_repo.find_by_id(new_review.workshop_id).await?;

        if let Some(booking_id) = new_review.booking_id {
            self.check_booking_relation(&new_review, booking_id).await?;
        }

        match self.repo.create(&new_review).await {
            Ok(review) => {
                log::info!(
                    "User {} reviewed workshop {} ({} stars)",
                    review.user_id, review.workshop_id, review.rating
                );
                Ok(review)
            }
            Err(e @ DomainError::DuplicateReview { .. }) => {
                log::debug!("{}", e);
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn average_rating(&self, workshop_id: Uuid) -> ServiceResult<RatingSummary> {
        Ok(self.repo.rating_summary(workshop_id).await?)
    }

    async fn approved_reviews_for_workshop(&self, workshop_id: Uuid) -> ServiceResult<Vec<Review>> {
        Ok(self.repo.find_approved_by_workshop(workshop_id).await?)
    }

    async fn set_approval(&self, ids: &[Uuid], approved: bool) -> ServiceResult<u64> {
        let changed = self.repo.set_approval(ids, approved).await?;
        log::info!(
            "{} {} of {} reviews",
            if approved { "Approved" } else { "Disapproved" },
            changed,
            ids.len()
        );
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::booking::repository::SqliteBookingRepository;
    use crate::domains::review::repository::SqliteReviewRepository;
    use crate::domains::workshop::repository::SqliteWorkshopRepository;
    use crate::errors::ServiceError;
    use crate::test_support::{insert_booking_with_status, insert_workshop, sample_workshop, TestDb};

    fn service(db: &TestDb) -> ReviewServiceImpl {
        let pool = db.pool.clone();
        ReviewServiceImpl::new(
            Arc::new(SqliteReviewRepository::new(pool.clone())),
            Arc::new(SqliteWorkshopRepository::new(pool.clone())),
            Arc::new(SqliteBookingRepository::new(pool)),
        )
    }

    fn review(workshop_id: Uuid, rating: i64) -> NewReview {
        NewReview {
            workshop_id,
            user_id: Uuid::new_v4(),
            booking_id: None,
            rating,
            title: "Very practical".to_string(),
            comment: "Clear examples we could use the next day.".to_string(),
        }
    }

    #[tokio::test]
    async fn test_average_rating() {
        let db = TestDb::new().await;
        let svc = service(&db);
        let workshop = insert_workshop(&db, sample_workshop("rated", 10)).await;

        let empty = svc.average_rating(workshop.id).await.unwrap();
        assert_eq!(empty, RatingSummary { average: 0.0, count: 0 });

        for rating in [5, 5, 4] {
            svc.add_review(review(workshop.id, rating)).await.unwrap();
        }
        assert_eq!(
            svc.average_rating(workshop.id).await.unwrap(),
            RatingSummary { average: 4.7, count: 3 }
        );

        // Hidden reviews drop out of the average.
        let low = svc.add_review(review(workshop.id, 1)).await.unwrap();
        assert_eq!(svc.set_approval(&[low.id], false).await.unwrap(), 1);
        assert_eq!(svc.set_approval(&[low.id], false).await.unwrap(), 0);
        assert_eq!(svc.average_rating(workshop.id).await.unwrap().count, 3);
        assert_eq!(svc.approved_reviews_for_workshop(workshop.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_second_review_by_same_user_is_duplicate() {
        let db = TestDb::new().await;
        let svc = service(&db);
        let workshop = insert_workshop(&db, sample_workshop("once", 10)).await;

        let first = review(workshop.id, 4);
        svc.add_review(first.clone()).await.unwrap();

        let mut second = first.clone();
        second.rating = 2;
        second.title = "Changed my mind".to_string();
        let err = svc.add_review(second).await.unwrap_err();
        assert_eq!(err.user_message(), "You have already reviewed this webinar");
        match err {
            ServiceError::Domain(DomainError::DuplicateReview { workshop_id, user_id }) => {
                assert_eq!(workshop_id, workshop.id);
                assert_eq!(user_id, first.user_id);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reviews_by_same_user() {
        let db = TestDb::new().await;
        let svc = Arc::new(service(&db));
        let workshop = insert_workshop(&db, sample_workshop("racing", 10)).await;
        let base = review(workshop.id, 5);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let svc = svc.clone();
                let mut attempt = base.clone();
                attempt.rating = 1 + (i % 5);
                tokio::spawn(async move { svc.add_review(attempt).await })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        for err in results.into_iter().filter_map(|r| r.err()) {
            assert!(
                matches!(err, ServiceError::Domain(DomainError::DuplicateReview { .. })),
                "unexpected error: {:?}",
                err
            );
        }

        let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE workshop_id = ?")
            .bind(workshop.id.to_string())
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(stored, 1);
    }

    #[tokio::test]
    async fn test_invalid_rating_is_validation_error() {
        let db = TestDb::new().await;
        let svc = service(&db);
        let workshop = insert_workshop(&db, sample_workshop("bounds", 10)).await;

        let err = svc.add_review(review(workshop.id, 6)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));

        let err = svc.add_review(review(Uuid::new_v4(), 4)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::EntityNotFound(_, _))));
    }

    #[tokio::test]
    async fn test_review_linked_to_booking() {
        let db = TestDb::new().await;
        let svc = service(&db);
        let workshop = insert_workshop(&db, sample_workshop("linked", 10)).await;
        let other = insert_workshop(&db, sample_workshop("other", 10)).await;

        let pending = insert_booking_with_status(&db, &workshop, 1, "pending").await;
        let completed = insert_booking_with_status(&db, &workshop, 1, "completed").await;
        let elsewhere = insert_booking_with_status(&db, &other, 1, "completed").await;

        let mut new = review(workshop.id, 5);
        new.booking_id = Some(pending.id);
        assert!(svc.add_review(new.clone()).await.is_err());

        new.booking_id = Some(elsewhere.id);
        assert!(svc.add_review(new.clone()).await.is_err());

        new.booking_id = Some(completed.id);
        let saved = svc.add_review(new).await.unwrap();
        assert_eq!(saved.booking_id, Some(completed.id));
        assert!(saved.is_approved);

        // A booking owns at most one review, even from another user.
        let mut again = review(workshop.id, 3);
        again.booking_id = Some(completed.id);
        let err = svc.add_review(again).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::DuplicateReview { .. })));
    }
}

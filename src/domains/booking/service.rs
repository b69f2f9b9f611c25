use crate::config::BookingPolicy;
use crate::database::ImmediateTx;
use crate::domains::booking::repository::BookingRepository;
use crate::domains::core::repository::FindById;
use crate::domains::booking::types::{
    check_participant_request, generate_reference, Booking, BookingInsert, BookingStatus, NewBooking,
    PaymentStatus,
};
use crate::domains::workshop::capacity;
use crate::domains::workshop::repository::WorkshopRepository;
use crate::errors::{CapacityError, DomainError, DomainResult, ServiceResult, ValidationError};
use crate::validation::{normalize, Validate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of a bulk admin action, one entry per requested reference
pub type BulkOutcome = Vec<(String, ServiceResult<Booking>)>;

/// Trait defining booking service operations
#[async_trait]
pub trait BookingService: Send + Sync {
    /// Check the workshop and the seat request, then insert a pending booking
    /// in one write transaction.
    async fn create_booking(&self, new_booking: NewBooking) -> ServiceResult<Booking>;

    async fn get_booking(&self, reference: &str) -> ServiceResult<Booking>;

    async fn list_bookings_for_workshop(&self, workshop_id: Uuid) -> ServiceResult<Vec<Booking>>;

    /// Move a booking along its state machine. Moving to the current state
    /// is a no-op.
    async fn transition(&self, reference: &str, next: BookingStatus) -> ServiceResult<Booking>;

    async fn confirm(&self, reference: &str) -> ServiceResult<Booking>;

    async fn cancel(&self, reference: &str) -> ServiceResult<Booking>;

    async fn complete(&self, reference: &str) -> ServiceResult<Booking>;

    async fn confirm_bookings(&self, references: &[String]) -> BulkOutcome;

    async fn cancel_bookings(&self, references: &[String]) -> BulkOutcome;

    async fn mark_paid(&self, reference: &str) -> ServiceResult<Booking>;

    /// Only paid bookings can be refunded
    async fn mark_refunded(&self, reference: &str) -> ServiceResult<Booking>;

    /// Mark every unpaid booking among `references` as paid. Returns how
    /// many changed.
    async fn mark_as_paid(&self, references: &[String]) -> ServiceResult<u64>;
}

#[derive(Clone)]
pub struct BookingServiceImpl {
    pool: SqlitePool,
    repo: Arc<dyn BookingRepository>,
    workshop_repo: Arc<dyn WorkshopRepository>,
    policy: BookingPolicy,
}

impl BookingServiceImpl {
    pub fn new(
        pool: SqlitePool,
        repo: Arc<dyn BookingRepository>,
        workshop_repo: Arc<dyn WorkshopRepository>,
        policy: BookingPolicy,
    ) -> Self {
        Self {
            pool,
            repo,
            workshop_repo,
            policy,
        }
    }

    /// Re-check everything against the live rows and insert. Runs on the
    /// connection of an open `BEGIN IMMEDIATE` transaction.
    async fn insert_checked(
        &self,
        new_booking: &NewBooking,
        workshop_id: Uuid,
        now: DateTime<Utc>,
        conn: &mut SqliteConnection,
    ) -> DomainResult<Booking> {
        let workshop = self.workshop_repo.find_by_id_with_conn(workshop_id, conn).await?;
        workshop.booking_gate(now)?;

        let available = capacity::available_spots(&mut *conn, &workshop).await?;
        check_participant_request(new_booking.number_of_participants, available, workshop.max_participants)?;

        let total_price = new_booking
            .total_price
            .unwrap_or_else(|| workshop.price * Decimal::from(new_booking.number_of_participants));

        let mut insert = BookingInsert {
            workshop_id: workshop.id,
            user_id: new_booking.user_id,
            number_of_participants: new_booking.number_of_participants,
            contact: new_booking.contact.clone(),
            participants_details: new_booking.participants_details.clone(),
            notes: new_booking.notes.clone(),
            total_price,
            booking_reference: String::new(),
        };

        for attempt in 1..=self.policy.reference_attempts {
            insert.booking_reference = generate_reference(&self.policy.reference_prefix);
            match self.repo.insert_with_conn(&insert, conn).await {
                Err(DomainError::Validation(ValidationError::Unique { field })) if field == "booking_reference" => {
                    log::warn!(
                        "Booking reference {} already taken (attempt {}/{})",
                        insert.booking_reference, attempt, self.policy.reference_attempts
                    );
                }
                other => return other,
            }
        }

        Err(DomainError::Internal(format!(
            "No unique booking reference after {} attempts",
            self.policy.reference_attempts
        )))
    }

    async fn transition_with_conn(
        &self,
        reference: &str,
        next: BookingStatus,
        conn: &mut SqliteConnection,
    ) -> DomainResult<Booking> {
        let booking = self.repo.find_by_reference_with_conn(reference, conn).await?;

        if booking.status == next {
            log::debug!("Booking {} already {}", reference, next);
            return Ok(booking);
        }

        if !booking.status.can_transition_to(next) {
            log::error!("Rejected booking transition {} -> {} for {}", booking.status, next, reference);
            return Err(DomainError::InvalidTransition {
                from: booking.status.to_string(),
                to: next.to_string(),
            });
        }

        if next.holds_seats() {
            let workshop = self.workshop_repo.find_by_id_with_conn(booking.workshop_id, conn).await?;
            let available = capacity::available_spots(&mut *conn, &workshop).await?;
            if booking.number_of_participants > available {
                log::warn!(
                    "Cannot confirm {}: {} participants requested, {} seats left on '{}'",
                    reference, booking.number_of_participants, available, workshop.slug
                );
                let err = if available <= 0 {
                    CapacityError::SoldOut
                } else {
                    CapacityError::OnlyRemaining(available)
                };
                return Err(err.into());
            }
        }

        let updated = self.repo.update_status_with_conn(booking.id, next, conn).await?;

        if booking.status.holds_seats() != next.holds_seats() {
            let allow_release = next == BookingStatus::Cancelled && self.policy.release_full_on_cancel;
            self.workshop_repo
                .refresh_derived_status_with_conn(booking.workshop_id, allow_release, conn)
                .await?;
        }

        log::info!("Booking {} {} -> {}", reference, booking.status, next);
        Ok(updated)
    }

    async fn bulk_transition(&self, references: &[String], next: BookingStatus) -> BulkOutcome {
        let mut outcome = Vec::with_capacity(references.len());
        for reference in references {
            let result = self.transition(reference, next).await;
            outcome.push((reference.clone(), result));
        }

        let succeeded = outcome.iter().filter(|(_, r)| r.is_ok()).count();
        log::info!("Bulk {}: {} of {} bookings", next, succeeded, references.len());
        outcome
    }
}

#[async_trait]
impl BookingService for BookingServiceImpl {
    async fn create_booking(&self, mut new_booking: NewBooking) -> ServiceResult<Booking> {
        new_booking.contact = new_booking.contact.normalized();
        new_booking.notes = normalize::optional_text(new_booking.notes.take());

        let workshop = self.workshop_repo.find_by_slug(&new_booking.workshop_slug).await?;
        if !workshop.is_active {
            return Err(DomainError::NotFound("Workshop".to_string(), new_booking.workshop_slug.clone()).into());
        }

        let now = Utc::now();
        if let Err(reason) = workshop.booking_gate(now) {
            log::debug!("Booking refused for '{}': {}", workshop.slug, reason);
            return Err(DomainError::from(reason).into());
        }

        let available = capacity::available_spots(&self.pool, &workshop).await?;
        if let Err(e) = check_participant_request(
            new_booking.number_of_participants,
            available,
            workshop.max_participants,
        ) {
            log::warn!(
                "Booking refused for '{}': {} participants requested, {} seats left",
                workshop.slug, new_booking.number_of_participants, available
            );
            return Err(e.into());
        }

        new_booking.validate()?;

        let mut tx = ImmediateTx::begin(&self.pool).await.map_err(DomainError::from)?;
        let result = async {
            let conn = tx.conn()?;
            self.insert_checked(&new_booking, workshop.id, now, conn).await
        }
        .await;

        match result {
            Ok(booking) => {
                tx.commit().await.map_err(DomainError::from)?;
                log::info!(
                    "Created booking {} for '{}' ({} participants, total {})",
                    booking.booking_reference, workshop.slug, booking.number_of_participants, booking.total_price
                );
                Ok(booking)
            }
            Err(e) => {
                tx.abort().await;
                log::warn!("Booking for '{}' rolled back: {}", workshop.slug, e);
                Err(e.into())
            }
        }
    }

    async fn get_booking(&self, reference: &str) -> ServiceResult<Booking> {
        Ok(self.repo.find_by_reference(reference.trim()).await?)
    }

    async fn list_bookings_for_workshop(&self, workshop_id: Uuid) -> ServiceResult<Vec<Booking>> {
        Ok(self.repo.find_by_workshop(workshop_id).await?)
    }

    async fn transition(&self, reference: &str, next: BookingStatus) -> ServiceResult<Booking> {
        let mut tx = ImmediateTx::begin(&self.pool).await.map_err(DomainError::from)?;
        let result = async {
            let conn = tx.conn()?;
            self.transition_with_conn(reference, next, conn).await
        }
        .await;

        match result {
            Ok(booking) => {
                tx.commit().await.map_err(DomainError::from)?;
                Ok(booking)
            }
            Err(e) => {
                tx.abort().await;
                Err(e.into())
            }
        }
    }

    async fn confirm(&self, reference: &str) -> ServiceResult<Booking> {
        self.transition(reference, BookingStatus::Confirmed).await
    }

    async fn cancel(&self, reference: &str) -> ServiceResult<Booking> {
        self.transition(reference, BookingStatus::Cancelled).await
    }

    async fn complete(&self, reference: &str) -> ServiceResult<Booking> {
        self.transition(reference, BookingStatus::Completed).await
    }

    async fn confirm_bookings(&self, references: &[String]) -> BulkOutcome {
        self.bulk_transition(references, BookingStatus::Confirmed).await
    }

    async fn cancel_bookings(&self, references: &[String]) -> BulkOutcome {
        self.bulk_transition(references, BookingStatus::Cancelled).await
    }

    async fn mark_paid(&self, reference: &str) -> ServiceResult<Booking> {
        let booking = self.repo.find_by_reference(reference).await?;
        match booking.payment_status {
            PaymentStatus::Paid => Ok(booking),
            PaymentStatus::Refunded => Err(DomainError::Validation(ValidationError::invalid_value(
                "payment_status",
                "a refunded booking cannot be marked as paid",
            ))
            .into()),
            PaymentStatus::Unpaid => {
                self.repo
                    .update_payment_status(&[booking.booking_reference.clone()], PaymentStatus::Unpaid, PaymentStatus::Paid)
                    .await?;
                log::info!("Booking {} marked as paid", reference);
                Ok(self.repo.find_by_id(booking.id).await?)
            }
        }
    }

    async fn mark_refunded(&self, reference: &str) -> ServiceResult<Booking> {
        let booking = self.repo.find_by_reference(reference).await?;
        match booking.payment_status {
            PaymentStatus::Refunded => Ok(booking),
            PaymentStatus::Unpaid => Err(DomainError::Validation(ValidationError::invalid_value(
                "payment_status",
                "only paid bookings can be refunded",
            ))
            .into()),
            PaymentStatus::Paid => {
                self.repo
                    .update_payment_status(&[booking.booking_reference.clone()], PaymentStatus::Paid, PaymentStatus::Refunded)
                    .await?;
                log::info!("Booking {} refunded", reference);
                Ok(self.repo.find_by_id(booking.id).await?)
            }
        }
    }

    async fn mark_as_paid(&self, references: &[String]) -> ServiceResult<u64> {
        let changed = self
            .repo
            .update_payment_status(references, PaymentStatus::Unpaid, PaymentStatus::Paid)
            .await?;
        log::info!("Marked {} of {} bookings as paid", changed, references.len());
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::booking::repository::SqliteBookingRepository;
    use crate::domains::workshop::repository::SqliteWorkshopRepository;
    use crate::domains::workshop::types::{UpdateWorkshop, WorkshopStatus};
    use crate::domains::booking::types::ContactInfo;
    use crate::errors::{ServiceError, WorkshopUnavailable};
    use crate::test_support::{insert_booking_with_status, insert_workshop, sample_workshop, TestDb};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn service(db: &TestDb, policy: BookingPolicy) -> BookingServiceImpl {
        let pool = db.pool.clone();
        BookingServiceImpl::new(
            pool.clone(),
            Arc::new(SqliteBookingRepository::new(pool.clone())),
            Arc::new(SqliteWorkshopRepository::new(pool)),
            policy,
        )
    }

    fn request(slug: &str, participants: i64) -> NewBooking {
        NewBooking {
            workshop_slug: slug.to_string(),
            user_id: None,
            number_of_participants: participants,
            contact: ContactInfo::from_full_name("Lotte Janssens", " Lotte@Example.be ", "+32 470 11 22 33"),
            participants_details: None,
            notes: None,
            total_price: None,
        }
    }

    async fn booking_count(db: &TestDb) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM bookings")
            .fetch_one(&db.pool)
            .await
            .unwrap()
    }

    fn domain(err: ServiceError) -> DomainError {
        match err {
            ServiceError::Domain(e) => e,
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_booking_scenario_until_sold_out() {
        let db = TestDb::new().await;
        let svc = service(&db, BookingPolicy::default());
        let workshop = insert_workshop(&db, sample_workshop("ai-for-teams", 10)).await;
        assert_eq!(capacity::available_spots(&db.pool, &workshop).await.unwrap(), 10);

        let first = svc.create_booking(request("ai-for-teams", 3)).await.unwrap();
        assert_eq!(first.status, BookingStatus::Pending);
        assert_eq!(first.payment_status, PaymentStatus::Unpaid);
        assert_eq!(first.contact.email, "lotte@example.be");
        assert_eq!(first.contact.phone, "+32470112233");
        svc.confirm(&first.booking_reference).await.unwrap();
        assert_eq!(capacity::available_spots(&db.pool, &workshop).await.unwrap(), 7);

        let second = svc.create_booking(request("ai-for-teams", 7)).await.unwrap();
        svc.confirm(&second.booking_reference).await.unwrap();
        assert_eq!(capacity::available_spots(&db.pool, &workshop).await.unwrap(), 0);

        let workshops = SqliteWorkshopRepository::new(db.pool.clone());
        let refreshed = workshops.find_by_id(workshop.id).await.unwrap();
        assert_eq!(refreshed.status, WorkshopStatus::Full);

        let err = svc.create_booking(request("ai-for-teams", 1)).await.unwrap_err();
        assert_eq!(err.user_message(), "This webinar is sold out");
        assert!(matches!(
            domain(err),
            DomainError::InvalidWorkshopState(WorkshopUnavailable::SoldOut)
        ));
        assert_eq!(booking_count(&db).await, 2);
    }

    #[tokio::test]
    async fn test_over_capacity_request_is_not_persisted() {
        let db = TestDb::new().await;
        let svc = service(&db, BookingPolicy::default());
        let workshop = insert_workshop(&db, sample_workshop("small-group", 5)).await;
        insert_booking_with_status(&db, &workshop, 4, "confirmed").await;

        let err = svc.create_booking(request("small-group", 2)).await.unwrap_err();
        assert_eq!(err.user_message(), "Only 1 spots left");
        assert!(matches!(
            domain(err),
            DomainError::CapacityExceeded(CapacityError::OnlyRemaining(1))
        ));

        let err = svc.create_booking(request("small-group", 0)).await.unwrap_err();
        assert!(matches!(domain(err), DomainError::Validation(_)));
        assert_eq!(booking_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_workshop_gating() {
        let db = TestDb::new().await;
        let svc = service(&db, BookingPolicy::default());

        let mut hidden = sample_workshop("hidden", 10);
        hidden.is_active = Some(false);
        insert_workshop(&db, hidden).await;
        assert!(matches!(
            domain(svc.create_booking(request("hidden", 1)).await.unwrap_err()),
            DomainError::NotFound(_, _)
        ));
        assert!(matches!(
            domain(svc.create_booking(request("nope", 1)).await.unwrap_err()),
            DomainError::NotFound(_, _)
        ));

        let mut cancelled = sample_workshop("called-off", 10);
        cancelled.status = Some(WorkshopStatus::Cancelled);
        insert_workshop(&db, cancelled).await;
        assert!(matches!(
            domain(svc.create_booking(request("called-off", 1)).await.unwrap_err()),
            DomainError::InvalidWorkshopState(WorkshopUnavailable::Cancelled)
        ));

        let mut past = sample_workshop("yesterday", 10);
        past.start_datetime = Utc::now() - Duration::days(1);
        past.end_datetime = past.start_datetime + Duration::hours(2);
        insert_workshop(&db, past).await;
        assert!(matches!(
            domain(svc.create_booking(request("yesterday", 1)).await.unwrap_err()),
            DomainError::InvalidWorkshopState(WorkshopUnavailable::AlreadyStarted)
        ));

        assert_eq!(booking_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_price_is_a_snapshot() {
        let db = TestDb::new().await;
        let svc = service(&db, BookingPolicy::default());
        let mut new = sample_workshop("snapshot", 10);
        new.price = dec!(49.99);
        let workshop = insert_workshop(&db, new).await;

        let booking = svc.create_booking(request("snapshot", 3)).await.unwrap();
        assert_eq!(booking.total_price, dec!(149.97));

        let workshops = SqliteWorkshopRepository::new(db.pool.clone());
        workshops
            .update(workshop.id, &UpdateWorkshop { price: Some(dec!(99.00)), ..Default::default() })
            .await
            .unwrap();

        let reloaded = svc.get_booking(&booking.booking_reference).await.unwrap();
        assert_eq!(reloaded.total_price, dec!(149.97));

        let mut explicit = request("snapshot", 2);
        explicit.total_price = Some(dec!(120.00));
        let booking = svc.create_booking(explicit).await.unwrap();
        assert_eq!(booking.total_price, dec!(120.00));
    }

    #[tokio::test]
    async fn test_timestamps_stamped_once_and_reference_kept() {
        let db = TestDb::new().await;
        let svc = service(&db, BookingPolicy::default());
        insert_workshop(&db, sample_workshop("stamps", 10)).await;

        let booking = svc.create_booking(request("stamps", 2)).await.unwrap();
        assert!(booking.confirmed_at.is_none());
        assert_eq!(booking.booking_reference.len(), 10);

        let confirmed = svc.confirm(&booking.booking_reference).await.unwrap();
        let first_stamp = confirmed.confirmed_at.expect("confirmed_at set");

        let again = svc.confirm(&booking.booking_reference).await.unwrap();
        assert_eq!(again.confirmed_at, Some(first_stamp));
        assert_eq!(again.booking_reference, booking.booking_reference);

        let cancelled = svc.cancel(&booking.booking_reference).await.unwrap();
        let cancel_stamp = cancelled.cancelled_at.expect("cancelled_at set");
        assert_eq!(cancelled.confirmed_at, Some(first_stamp));

        let again = svc.cancel(&booking.booking_reference).await.unwrap();
        assert_eq!(again.cancelled_at, Some(cancel_stamp));
        assert_eq!(again.booking_reference, booking.booking_reference);

        let rewrite = sqlx::query("UPDATE bookings SET booking_reference = 'WB00000000' WHERE id = ?")
            .bind(booking.id.to_string())
            .execute(&db.pool)
            .await;
        assert!(rewrite.is_err());
    }

    #[tokio::test]
    async fn test_invalid_transitions() {
        let db = TestDb::new().await;
        let svc = service(&db, BookingPolicy::default());
        insert_workshop(&db, sample_workshop("machine", 10)).await;

        let pending = svc.create_booking(request("machine", 1)).await.unwrap();
        assert!(matches!(
            domain(svc.complete(&pending.booking_reference).await.unwrap_err()),
            DomainError::InvalidTransition { .. }
        ));

        svc.cancel(&pending.booking_reference).await.unwrap();
        let err = svc.confirm(&pending.booking_reference).await.unwrap_err();
        assert_eq!(err.user_message(), "Something went wrong, please try again later");
        match domain(err) {
            DomainError::InvalidTransition { from, to } => {
                assert_eq!(from, "cancelled");
                assert_eq!(to, "confirmed");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let other = svc.create_booking(request("machine", 1)).await.unwrap();
        svc.confirm(&other.booking_reference).await.unwrap();
        let done = svc.complete(&other.booking_reference).await.unwrap();
        assert_eq!(done.status, BookingStatus::Completed);
        assert!(svc.cancel(&other.booking_reference).await.is_err());

        assert!(matches!(
            domain(svc.get_booking("WB12345678").await.unwrap_err()),
            DomainError::NotFound(_, _)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_confirmations_of_last_seat() {
        let db = TestDb::new().await;
        let svc = Arc::new(service(&db, BookingPolicy::default()));
        insert_workshop(&db, sample_workshop("last-seat", 1)).await;

        let a = svc.create_booking(request("last-seat", 1)).await.unwrap();
        let b = svc.create_booking(request("last-seat", 1)).await.unwrap();

        let handles: Vec<_> = [a.booking_reference, b.booking_reference]
            .into_iter()
            .map(|reference| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.confirm(&reference).await })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 1);
        let failure = results.into_iter().find_map(|r| r.err()).unwrap();
        assert!(matches!(
            domain(failure),
            DomainError::CapacityExceeded(CapacityError::SoldOut)
        ));

        let confirmed: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE status = 'confirmed'")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(confirmed, 1);
    }

    #[tokio::test]
    async fn test_concurrent_creates_without_seats_both_fail() {
        let db = TestDb::new().await;
        let svc = Arc::new(service(&db, BookingPolicy::default()));
        let workshop = insert_workshop(&db, sample_workshop("no-seats", 2)).await;
        insert_booking_with_status(&db, &workshop, 2, "confirmed").await;

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.create_booking(request("no-seats", 1)).await })
            })
            .collect();

        for handle in handles {
            let err = handle.await.unwrap().unwrap_err();
            assert!(matches!(
                domain(err),
                DomainError::CapacityExceeded(CapacityError::SoldOut)
            ));
        }
        assert_eq!(booking_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_full_status_release_policy() {
        for release in [false, true] {
            let db = TestDb::new().await;
            let policy = BookingPolicy {
                release_full_on_cancel: release,
                ..Default::default()
            };
            let svc = service(&db, policy);
            let workshop = insert_workshop(&db, sample_workshop("release", 2)).await;

            let booking = svc.create_booking(request("release", 2)).await.unwrap();
            svc.confirm(&booking.booking_reference).await.unwrap();

            let workshops = SqliteWorkshopRepository::new(db.pool.clone());
            assert_eq!(workshops.find_by_id(workshop.id).await.unwrap().status, WorkshopStatus::Full);

            svc.cancel(&booking.booking_reference).await.unwrap();
            let expected = if release { WorkshopStatus::Active } else { WorkshopStatus::Full };
            assert_eq!(workshops.find_by_id(workshop.id).await.unwrap().status, expected);
        }
    }

    #[tokio::test]
    async fn test_payment_flags_and_bulk_actions() {
        let db = TestDb::new().await;
        let svc = service(&db, BookingPolicy::default());
        insert_workshop(&db, sample_workshop("payments", 10)).await;

        let a = svc.create_booking(request("payments", 1)).await.unwrap();
        let b = svc.create_booking(request("payments", 2)).await.unwrap();
        let c = svc.create_booking(request("payments", 3)).await.unwrap();

        assert!(svc.mark_refunded(&a.booking_reference).await.is_err());
        assert_eq!(svc.mark_paid(&a.booking_reference).await.unwrap().payment_status, PaymentStatus::Paid);
        assert_eq!(
            svc.mark_refunded(&a.booking_reference).await.unwrap().payment_status,
            PaymentStatus::Refunded
        );
        assert!(svc.mark_paid(&a.booking_reference).await.is_err());

        let refs = vec![a.booking_reference.clone(), b.booking_reference.clone(), c.booking_reference.clone()];
        assert_eq!(svc.mark_as_paid(&refs).await.unwrap(), 2);

        svc.cancel(&c.booking_reference).await.unwrap();
        let outcome = svc.confirm_bookings(&refs).await;
        assert_eq!(outcome.len(), 3);
        assert!(outcome[0].1.is_ok());
        assert!(outcome[1].1.is_ok());
        assert!(outcome[2].1.is_err());

        let outcome = svc.cancel_bookings(&refs[..2]).await;
        assert!(outcome.iter().all(|(_, r)| r.is_ok()));

        let listed = svc.list_bookings_for_workshop(a.workshop_id).await.unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed.iter().all(|b| b.status == BookingStatus::Cancelled));
    }
}

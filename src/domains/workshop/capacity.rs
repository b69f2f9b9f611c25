//! Seat accounting.
//!
//! Available seats are never stored: they are `max_participants` minus the
//! participants of confirmed bookings, recomputed on every read. Pending,
//! cancelled and completed bookings hold no seat.

use crate::domains::workshop::types::{Workshop, WorkshopStatus};
use crate::errors::{DbError, DomainResult};
use sqlx::{query_as, query_scalar, Executor, Sqlite};
use std::collections::HashMap;
use uuid::Uuid;

/// `max(max_participants - confirmed, 0)`
pub fn remaining_seats(max_participants: i64, confirmed: i64) -> i64 {
    (max_participants - confirmed).max(0)
}

/// Participants currently holding a seat in the workshop.
pub async fn confirmed_seats<'e, E>(executor: E, workshop_id: Uuid) -> DomainResult<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let total: i64 = query_scalar(
        "SELECT COALESCE(SUM(number_of_participants), 0) FROM bookings
         WHERE workshop_id = ? AND status = 'confirmed'",
    )
    .bind(workshop_id.to_string())
    .fetch_one(executor)
    .await
    .map_err(DbError::from)?;

    Ok(total)
}

/// Seats still free. Pass a transaction connection to read inside the
/// writer lock.
pub async fn available_spots<'e, E>(executor: E, workshop: &Workshop) -> DomainResult<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let confirmed = confirmed_seats(executor, workshop.id).await?;
    Ok(remaining_seats(workshop.max_participants, confirmed))
}

pub async fn is_full<'e, E>(executor: E, workshop: &Workshop) -> DomainResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    Ok(available_spots(executor, workshop).await? <= 0)
}

/// Confirmed participant sums for several workshops in one query. Workshops
/// without confirmed bookings are absent from the map.
pub async fn confirmed_totals<'e, E>(executor: E, workshop_ids: &[Uuid]) -> DomainResult<HashMap<Uuid, i64>>
where
    E: Executor<'e, Database = Sqlite>,
{
    if workshop_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders = vec!["?"; workshop_ids.len()].join(", ");
    let query_str = format!(
        "SELECT workshop_id, COALESCE(SUM(number_of_participants), 0) FROM bookings
         WHERE status = 'confirmed' AND workshop_id IN ({})
         GROUP BY workshop_id",
        placeholders
    );

    let mut select_query = query_as::<_, (String, i64)>(&query_str);
    for id in workshop_ids {
        select_query = select_query.bind(id.to_string());
    }

    let rows = select_query.fetch_all(executor).await.map_err(DbError::from)?;

    rows.into_iter()
        .map(|(id, total)| Ok((crate::types::parse_db_uuid(&id, "bookings.workshop_id")?, total)))
        .collect()
}

/// The status a workshop should move to given its free seats, if any.
///
/// Bookable workshops with no seats left become `full`. Leaving `full` again
/// only happens when `allow_release` is set; otherwise an operator has to
/// change the status by hand. Cancelled and completed workshops are never
/// touched.
pub fn derived_status(current: WorkshopStatus, available: i64, allow_release: bool) -> Option<WorkshopStatus> {
    match current {
        WorkshopStatus::Upcoming | WorkshopStatus::Active if available <= 0 => Some(WorkshopStatus::Full),
        WorkshopStatus::Full if allow_release && available > 0 => Some(WorkshopStatus::Active),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_booking_with_status, insert_workshop, sample_workshop, TestDb};

    #[test]
    fn test_remaining_seats_never_negative() {
        assert_eq!(remaining_seats(10, 0), 10);
        assert_eq!(remaining_seats(10, 7), 3);
        assert_eq!(remaining_seats(10, 10), 0);
        assert_eq!(remaining_seats(10, 14), 0);
    }

    #[test]
    fn test_derived_status_is_one_way_by_default() {
        assert_eq!(derived_status(WorkshopStatus::Upcoming, 0, false), Some(WorkshopStatus::Full));
        assert_eq!(derived_status(WorkshopStatus::Active, 0, false), Some(WorkshopStatus::Full));
        assert_eq!(derived_status(WorkshopStatus::Active, 3, false), None);
        assert_eq!(derived_status(WorkshopStatus::Full, 2, false), None);
        assert_eq!(derived_status(WorkshopStatus::Full, 2, true), Some(WorkshopStatus::Active));
        assert_eq!(derived_status(WorkshopStatus::Full, 0, true), None);
        assert_eq!(derived_status(WorkshopStatus::Cancelled, 0, true), None);
        assert_eq!(derived_status(WorkshopStatus::Completed, 0, false), None);
    }

    #[test]
    fn test_closed_workshops_never_become_full() {
        for status in [WorkshopStatus::Cancelled, WorkshopStatus::Completed] {
            for allow_release in [false, true] {
                assert_eq!(derived_status(status, 0, allow_release), None);
                assert_eq!(derived_status(status, -3, allow_release), None);
            }
        }
    }

    #[tokio::test]
    async fn test_available_equals_max_without_confirmed_bookings() {
        let db = TestDb::new().await;
        let workshop = insert_workshop(&db, sample_workshop("empty", 12)).await;

        // Pending and cancelled bookings hold no seat.
        insert_booking_with_status(&db, &workshop, 4, "pending").await;
        insert_booking_with_status(&db, &workshop, 2, "cancelled").await;

        assert_eq!(available_spots(&db.pool, &workshop).await.unwrap(), 12);
        assert!(!is_full(&db.pool, &workshop).await.unwrap());
    }

    #[tokio::test]
    async fn test_overbooked_workshop_reports_zero() {
        let db = TestDb::new().await;
        let workshop = insert_workshop(&db, sample_workshop("overbooked", 5)).await;

        insert_booking_with_status(&db, &workshop, 4, "confirmed").await;
        insert_booking_with_status(&db, &workshop, 3, "confirmed").await;

        assert_eq!(confirmed_seats(&db.pool, workshop.id).await.unwrap(), 7);
        assert_eq!(available_spots(&db.pool, &workshop).await.unwrap(), 0);
        assert!(is_full(&db.pool, &workshop).await.unwrap());
    }

    #[tokio::test]
    async fn test_confirmed_totals_batches() {
        let db = TestDb::new().await;
        let a = insert_workshop(&db, sample_workshop("a", 10)).await;
        let b = insert_workshop(&db, sample_workshop("b", 10)).await;
        let c = insert_workshop(&db, sample_workshop("c", 10)).await;

        insert_booking_with_status(&db, &a, 2, "confirmed").await;
        insert_booking_with_status(&db, &a, 3, "confirmed").await;
        insert_booking_with_status(&db, &b, 1, "confirmed").await;
        insert_booking_with_status(&db, &c, 5, "pending").await;

        let totals = confirmed_totals(&db.pool, &[a.id, b.id, c.id]).await.unwrap();
        assert_eq!(totals.get(&a.id), Some(&5));
        assert_eq!(totals.get(&b.id), Some(&1));
        assert_eq!(totals.get(&c.id), None);
    }
}

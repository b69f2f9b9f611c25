use crate::domains::category::types::CategorySummary;
use crate::domains::review::types::RatingSummary;
use crate::errors::{DomainError, DomainResult, ValidationError, WorkshopUnavailable};
use crate::types::{parse_db_decimal, parse_db_timestamp, parse_db_uuid, parse_optional_uuid};
use crate::validation::{common, normalize, Validate, ValidationBuilder};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// SQL condition (on alias `w`) for workshops a visitor can see and book.
pub const VISIBLE_WORKSHOP_CONDITION: &str =
    "w.is_active = 1 AND w.status NOT IN ('cancelled', 'completed')";

const MAX_TITLE_LENGTH: usize = 200;
const MAX_SLUG_LENGTH: usize = 200;
const MAX_SHORT_DESCRIPTION_LENGTH: usize = 300;
const MAX_MEETING_URL_LENGTH: usize = 500;
const MAX_MEETING_FIELD_LENGTH: usize = 100;
const MAX_INSTRUCTOR_NAME_LENGTH: usize = 200;
const MAX_PARTICIPANTS_LIMIT: i64 = 500;
const COPY_TITLE_SUFFIX: &str = " (Copy)";

/// Lifecycle status of a workshop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkshopStatus {
    #[default]
    Upcoming,
    Active,
    Full,
    Cancelled,
    Completed,
}

impl WorkshopStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkshopStatus::Upcoming => "upcoming",
            WorkshopStatus::Active => "active",
            WorkshopStatus::Full => "full",
            WorkshopStatus::Cancelled => "cancelled",
            WorkshopStatus::Completed => "completed",
        }
    }

    /// Cancelled and completed workshops are hidden from the public catalog.
    pub fn is_archived(&self) -> bool {
        matches!(self, WorkshopStatus::Cancelled | WorkshopStatus::Completed)
    }
}

impl fmt::Display for WorkshopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkshopStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upcoming" => Ok(WorkshopStatus::Upcoming),
            "active" => Ok(WorkshopStatus::Active),
            "full" => Ok(WorkshopStatus::Full),
            "cancelled" => Ok(WorkshopStatus::Cancelled),
            "completed" => Ok(WorkshopStatus::Completed),
            _ => Err(DomainError::Validation(ValidationError::invalid_value(
                "status",
                &format!("unknown workshop status '{}'", s),
            ))),
        }
    }
}

/// Online meeting details. All parts are optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MeetingInfo {
    pub url: Option<String>,
    pub id: Option<String>,
    pub password: Option<String>,
}

impl MeetingInfo {
    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.id.is_none() && self.password.is_none()
    }

    fn validate(&self) -> DomainResult<()> {
        if let Some(url) = &self.url {
            ValidationBuilder::new("meeting_url", Some(url.clone()))
                .max_length(MAX_MEETING_URL_LENGTH)
                .url()
                .validate()?;
        }
        if let Some(id) = &self.id {
            ValidationBuilder::new("meeting_id", Some(id.clone()))
                .max_length(MAX_MEETING_FIELD_LENGTH)
                .validate()?;
        }
        if let Some(password) = &self.password {
            ValidationBuilder::new("meeting_password", Some(password.clone()))
                .max_length(MAX_MEETING_FIELD_LENGTH)
                .validate()?;
        }
        Ok(())
    }
}

/// Workshop entity - a scheduled, priced, capacity-limited online session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workshop {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub short_description: Option<String>,
    pub category_id: Option<Uuid>,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    pub duration_hours: Decimal,
    pub meeting: MeetingInfo,
    pub max_participants: i64,
    pub min_participants: i64,
    pub price: Decimal,
    pub materials_included: bool,
    pub requirements: Option<String>,
    pub what_to_bring: Option<String>,
    pub status: WorkshopStatus,
    pub is_active: bool,
    pub featured: bool,
    pub instructor_name: String,
    pub instructor_bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workshop {
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.start_datetime > now
    }

    /// Whether the workshop accepts booking attempts at all, before any
    /// seat arithmetic.
    pub fn booking_gate(&self, now: DateTime<Utc>) -> Result<(), WorkshopUnavailable> {
        match self.status {
            WorkshopStatus::Full => Err(WorkshopUnavailable::SoldOut),
            WorkshopStatus::Cancelled => Err(WorkshopUnavailable::Cancelled),
            WorkshopStatus::Completed => Err(WorkshopUnavailable::AlreadyOccurred),
            _ if self.start_datetime <= now => Err(WorkshopUnavailable::AlreadyStarted),
            _ => Ok(()),
        }
    }

    /// Draft for an admin copy of this workshop: new title and slug, dates
    /// moved by `shift`, back to `upcoming`, not featured, no meeting details.
    /// `stamp` is the `%Y%m%d-%H%M%S` time of the copy; `suffix` tells copies
    /// made in the same second apart.
    pub fn duplicate_draft(&self, stamp: &str, suffix: Option<usize>, shift: Duration) -> NewWorkshop {
        NewWorkshop {
            title: copy_title(&self.title),
            slug: Some(copy_slug(&self.slug, stamp, suffix)),
            description: self.description.clone(),
            short_description: self.short_description.clone(),
            category_id: self.category_id,
            start_datetime: self.start_datetime + shift,
            end_datetime: self.end_datetime + shift,
            duration_hours: self.duration_hours,
            meeting: MeetingInfo::default(),
            max_participants: self.max_participants,
            min_participants: Some(self.min_participants),
            price: self.price,
            materials_included: Some(self.materials_included),
            requirements: self.requirements.clone(),
            what_to_bring: self.what_to_bring.clone(),
            status: Some(WorkshopStatus::Upcoming),
            is_active: Some(self.is_active),
            featured: Some(false),
            instructor_name: self.instructor_name.clone(),
            instructor_bio: self.instructor_bio.clone(),
        }
    }
}

fn copy_title(title: &str) -> String {
    let keep = MAX_TITLE_LENGTH - COPY_TITLE_SUFFIX.chars().count();
    let base: String = title.chars().take(keep).collect();
    format!("{}{}", base.trim_end(), COPY_TITLE_SUFFIX)
}

fn copy_slug(slug: &str, stamp: &str, suffix: Option<usize>) -> String {
    let tail = match suffix {
        Some(n) => format!("-copy-{}-{}", stamp, n),
        None => format!("-copy-{}", stamp),
    };
    let keep = MAX_SLUG_LENGTH.saturating_sub(tail.len());
    let base: String = slug.chars().take(keep).collect();
    format!("{}{}", base.trim_end_matches('-'), tail)
}

/// Field rules shared by create and update. Runs on the merged values so that
/// cross-field checks (end after start) see the final state.
struct WorkshopFields<'a> {
    title: &'a str,
    slug: &'a str,
    description: &'a str,
    short_description: Option<&'a str>,
    start_datetime: DateTime<Utc>,
    end_datetime: DateTime<Utc>,
    duration_hours: Decimal,
    meeting: &'a MeetingInfo,
    max_participants: i64,
    min_participants: i64,
    price: Decimal,
    instructor_name: &'a str,
}

impl WorkshopFields<'_> {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("title", Some(self.title.to_string()))
            .not_blank()
            .max_length(MAX_TITLE_LENGTH)
            .validate()?;

        common::validate_slug(self.slug, MAX_SLUG_LENGTH)?;

        ValidationBuilder::new("description", Some(self.description.to_string()))
            .not_blank()
            .validate()?;

        if let Some(short) = self.short_description {
            ValidationBuilder::new("short_description", Some(short.to_string()))
                .max_length(MAX_SHORT_DESCRIPTION_LENGTH)
                .validate()?;
        }

        ValidationBuilder::new("end_datetime", Some(self.end_datetime))
            .after(self.start_datetime)
            .validate()?;

        ValidationBuilder::new("duration_hours", Some(self.duration_hours))
            .min(dec!(0.5))
            .max_decimal_places(1)
            .validate()?;

        self.meeting.validate()?;

        ValidationBuilder::new("max_participants", Some(self.max_participants))
            .range(1, MAX_PARTICIPANTS_LIMIT)
            .validate()?;

        ValidationBuilder::new("min_participants", Some(self.min_participants))
            .min(1)
            .validate()?;

        if self.min_participants > self.max_participants {
            return Err(DomainError::Validation(ValidationError::invalid_value(
                "min_participants",
                "cannot exceed max_participants",
            )));
        }

        common::validate_price(self.price, "price")?;

        ValidationBuilder::new("instructor_name", Some(self.instructor_name.to_string()))
            .not_blank()
            .max_length(MAX_INSTRUCTOR_NAME_LENGTH)
            .validate()
    }
}

/// NewWorkshop DTO - used when creating a new workshop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWorkshop {
    pub title: String,
    /// Derived from the title when absent
    pub slug: Option<String>,
    pub description: String,
    pub short_description: Option<String>,
    pub category_id: Option<Uuid>,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    pub duration_hours: Decimal,
    #[serde(default)]
    pub meeting: MeetingInfo,
    pub max_participants: i64,
    pub min_participants: Option<i64>,
    pub price: Decimal,
    pub materials_included: Option<bool>,
    pub requirements: Option<String>,
    pub what_to_bring: Option<String>,
    pub status: Option<WorkshopStatus>,
    pub is_active: Option<bool>,
    pub featured: Option<bool>,
    pub instructor_name: String,
    pub instructor_bio: Option<String>,
}

impl NewWorkshop {
    pub fn resolved_slug(&self) -> String {
        match &self.slug {
            Some(slug) if !slug.trim().is_empty() => slug.trim().to_string(),
            _ => normalize::slugify(&self.title),
        }
    }

    /// Not persisted yet, so no booking can hold a seat.
    pub fn available_spots(&self) -> i64 {
        self.max_participants.max(0)
    }
}

impl Validate for NewWorkshop {
    fn validate(&self) -> DomainResult<()> {
        if let Some(category_id) = self.category_id {
            ValidationBuilder::new("category_id", Some(category_id))
                .not_nil()
                .validate()?;
        }

        let slug = self.resolved_slug();
        WorkshopFields {
            title: &self.title,
            slug: &slug,
            description: &self.description,
            short_description: self.short_description.as_deref(),
            start_datetime: self.start_datetime,
            end_datetime: self.end_datetime,
            duration_hours: self.duration_hours,
            meeting: &self.meeting,
            max_participants: self.max_participants,
            min_participants: self.min_participants.unwrap_or(1),
            price: self.price,
            instructor_name: &self.instructor_name,
        }
        .validate()
    }
}

/// UpdateWorkshop DTO - used when updating an existing workshop.
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateWorkshop {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<Option<String>>,
    pub category_id: Option<Option<Uuid>>,
    pub start_datetime: Option<DateTime<Utc>>,
    pub end_datetime: Option<DateTime<Utc>>,
    pub duration_hours: Option<Decimal>,
    pub meeting_url: Option<Option<String>>,
    pub meeting_id: Option<Option<String>>,
    pub meeting_password: Option<Option<String>>,
    pub max_participants: Option<i64>,
    pub min_participants: Option<i64>,
    pub price: Option<Decimal>,
    pub materials_included: Option<bool>,
    pub requirements: Option<Option<String>>,
    pub what_to_bring: Option<Option<String>>,
    pub status: Option<WorkshopStatus>,
    pub is_active: Option<bool>,
    pub featured: Option<bool>,
    pub instructor_name: Option<String>,
    pub instructor_bio: Option<Option<String>>,
}

impl UpdateWorkshop {
    /// Apply the changes to a copy of `current`.
    pub fn merged_with(&self, current: &Workshop) -> Workshop {
        let mut merged = current.clone();
        macro_rules! merge {
            ($field:ident) => {
                if let Some(value) = &self.$field {
                    merged.$field = value.clone();
                }
            };
        }
        merge!(title);
        merge!(slug);
        merge!(description);
        merge!(short_description);
        merge!(category_id);
        merge!(start_datetime);
        merge!(end_datetime);
        merge!(duration_hours);
        merge!(max_participants);
        merge!(min_participants);
        merge!(price);
        merge!(materials_included);
        merge!(requirements);
        merge!(what_to_bring);
        merge!(status);
        merge!(is_active);
        merge!(featured);
        merge!(instructor_name);
        merge!(instructor_bio);
        if let Some(url) = &self.meeting_url {
            merged.meeting.url = url.clone();
        }
        if let Some(id) = &self.meeting_id {
            merged.meeting.id = id.clone();
        }
        if let Some(password) = &self.meeting_password {
            merged.meeting.password = password.clone();
        }
        merged
    }

    /// Validate the update against the workshop it will be applied to.
    pub fn validate_against(&self, current: &Workshop) -> DomainResult<()> {
        if let Some(Some(category_id)) = self.category_id {
            ValidationBuilder::new("category_id", Some(category_id))
                .not_nil()
                .validate()?;
        }
        self.merged_with(current).validate()
    }
}

impl Validate for Workshop {
    fn validate(&self) -> DomainResult<()> {
        WorkshopFields {
            title: &self.title,
            slug: &self.slug,
            description: &self.description,
            short_description: self.short_description.as_deref(),
            start_datetime: self.start_datetime,
            end_datetime: self.end_datetime,
            duration_hours: self.duration_hours,
            meeting: &self.meeting,
            max_participants: self.max_participants,
            min_participants: self.min_participants,
            price: self.price,
            instructor_name: &self.instructor_name,
        }
        .validate()
    }
}

/// WorkshopRow - SQLite row representation for mapping from database
#[derive(Debug, Clone, FromRow)]
pub struct WorkshopRow {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub short_description: Option<String>,
    pub category_id: Option<String>,
    pub start_datetime: String,
    pub end_datetime: String,
    pub duration_hours: String,
    pub meeting_url: Option<String>,
    pub meeting_id: Option<String>,
    pub meeting_password: Option<String>,
    pub max_participants: i64,
    pub min_participants: i64,
    pub price: String,
    pub materials_included: bool,
    pub requirements: Option<String>,
    pub what_to_bring: Option<String>,
    pub status: String,
    pub is_active: bool,
    pub featured: bool,
    pub instructor_name: String,
    pub instructor_bio: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl WorkshopRow {
    /// Convert database row to domain entity
    pub fn into_entity(self) -> DomainResult<Workshop> {
        Ok(Workshop {
            id: parse_db_uuid(&self.id, "workshops.id")?,
            title: self.title,
            slug: self.slug,
            description: self.description,
            short_description: self.short_description,
            category_id: parse_optional_uuid(&self.category_id, "workshops.category_id")?,
            start_datetime: parse_db_timestamp(&self.start_datetime, "workshops.start_datetime")?,
            end_datetime: parse_db_timestamp(&self.end_datetime, "workshops.end_datetime")?,
            duration_hours: parse_db_decimal(&self.duration_hours, "workshops.duration_hours")?,
            meeting: MeetingInfo {
                url: self.meeting_url,
                id: self.meeting_id,
                password: self.meeting_password,
            },
            max_participants: self.max_participants,
            min_participants: self.min_participants,
            price: parse_db_decimal(&self.price, "workshops.price")?,
            materials_included: self.materials_included,
            requirements: self.requirements,
            what_to_bring: self.what_to_bring,
            status: WorkshopStatus::from_str(&self.status)
                .map_err(|_| DomainError::Internal(format!("Invalid workshop status '{}' in DB", self.status)))?,
            is_active: self.is_active,
            featured: self.featured,
            instructor_name: self.instructor_name,
            instructor_bio: self.instructor_bio,
            created_at: parse_db_timestamp(&self.created_at, "workshops.created_at")?,
            updated_at: parse_db_timestamp(&self.updated_at, "workshops.updated_at")?,
        })
    }
}

/// Sort orders offered by the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkshopSort {
    /// Soonest first
    #[default]
    Date,
    PriceAsc,
    PriceDesc,
}

impl WorkshopSort {
    pub(crate) fn order_by(&self) -> &'static str {
        match self {
            WorkshopSort::Date => "w.start_datetime ASC",
            WorkshopSort::PriceAsc => "CAST(w.price AS REAL) ASC, w.start_datetime ASC",
            WorkshopSort::PriceDesc => "CAST(w.price AS REAL) DESC, w.start_datetime ASC",
        }
    }
}

/// Catalog filters
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkshopFilter {
    /// Case-insensitive match on title, descriptions and category name
    pub search: Option<String>,
    pub category_slug: Option<String>,
    pub status: Option<WorkshopStatus>,
    #[serde(default)]
    pub sort: WorkshopSort,
    /// Include inactive, cancelled and completed workshops (back office)
    #[serde(default)]
    pub include_archived: bool,
}

/// Workshop with its derived, read-time values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkshopResponse {
    #[serde(flatten)]
    pub workshop: Workshop,
    pub available_spots: i64,
    pub is_full: bool,
    pub is_upcoming: bool,
    pub category: Option<CategorySummary>,
    pub rating: RatingSummary,
}

impl WorkshopResponse {
    pub fn new(
        workshop: Workshop,
        available_spots: i64,
        category: Option<CategorySummary>,
        rating: RatingSummary,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            is_full: available_spots <= 0,
            is_upcoming: workshop.is_upcoming(now),
            available_spots,
            category,
            rating,
            workshop,
        }
    }
}

/// Headline numbers for the catalog landing page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CatalogStatistics {
    pub active_workshops: i64,
    pub categories: i64,
    pub instructors: i64,
    pub approved_reviews: i64,
    pub confirmed_bookings: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_workshop;

    #[test]
    fn test_status_round_trip_and_archive() {
        for status in ["upcoming", "active", "full", "cancelled", "completed"] {
            assert_eq!(WorkshopStatus::from_str(status).unwrap().as_str(), status);
        }
        assert!(WorkshopStatus::from_str("postponed").is_err());
        assert!(WorkshopStatus::Cancelled.is_archived());
        assert!(!WorkshopStatus::Full.is_archived());
    }

    #[test]
    fn test_new_workshop_validation() {
        let new = sample_workshop("intro-to-ai", 10);
        assert!(new.validate().is_ok());
        assert_eq!(new.available_spots(), 10);

        let mut bad = new.clone();
        bad.end_datetime = bad.start_datetime;
        assert!(bad.validate().is_err());

        let mut bad = new.clone();
        bad.duration_hours = dec!(0.25);
        assert!(bad.validate().is_err());

        let mut bad = new.clone();
        bad.max_participants = 501;
        assert!(bad.validate().is_err());

        let mut bad = new.clone();
        bad.price = dec!(12.345);
        assert!(bad.validate().is_err());

        let mut bad = new.clone();
        bad.meeting.url = Some("teams meeting".to_string());
        assert!(bad.validate().is_err());

        let mut bad = new;
        bad.instructor_name = " ".to_string();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_slug_defaults_to_title() {
        let mut new = sample_workshop("x", 10);
        new.slug = None;
        new.title = "ChatGPT for Teams".to_string();
        assert_eq!(new.resolved_slug(), "chatgpt-for-teams");
    }

    #[test]
    fn test_update_validated_on_merged_values() {
        let now = Utc::now();
        let workshop = crate::test_support::workshop_entity(now + Duration::days(3));

        // Moving only the start past the existing end must fail.
        let update = UpdateWorkshop {
            start_datetime: Some(now + Duration::days(4)),
            ..Default::default()
        };
        assert!(update.validate_against(&workshop).is_err());

        let update = UpdateWorkshop {
            meeting_url: Some(Some("https://teams.example.com/l/abc".into())),
            ..Default::default()
        };
        let merged = update.merged_with(&workshop);
        assert_eq!(merged.meeting.url.as_deref(), Some("https://teams.example.com/l/abc"));
        assert!(update.validate_against(&workshop).is_ok());
    }

    #[test]
    fn test_duplicate_draft() {
        let start = Utc::now() + Duration::days(2);
        let mut workshop = crate::test_support::workshop_entity(start);
        workshop.featured = true;
        workshop.status = WorkshopStatus::Full;
        workshop.meeting.url = Some("https://zoom.example.com/j/1".to_string());

        let draft = workshop.duplicate_draft("20251014-093000", None, Duration::days(7));
        assert_eq!(draft.title, format!("{} (Copy)", workshop.title));
        assert_eq!(draft.resolved_slug(), "intro-copy-20251014-093000");
        assert_eq!(draft.start_datetime, start + Duration::days(7));
        assert_eq!(draft.status, Some(WorkshopStatus::Upcoming));
        assert_eq!(draft.featured, Some(false));
        assert!(draft.meeting.is_empty());
        assert!(draft.validate().is_ok());

        let draft = workshop.duplicate_draft("20251014-093000", Some(2), Duration::days(7));
        assert_eq!(draft.resolved_slug(), "intro-copy-20251014-093000-2");
    }

    #[test]
    fn test_duplicate_draft_stays_within_limits() {
        let mut workshop = crate::test_support::workshop_entity(Utc::now());
        workshop.title = "T".repeat(MAX_TITLE_LENGTH);
        workshop.slug = "s".repeat(MAX_SLUG_LENGTH);

        let draft = workshop.duplicate_draft("20251014-093000", Some(12), Duration::days(7));
        assert!(draft.title.ends_with(" (Copy)"));
        assert_eq!(draft.title.chars().count(), MAX_TITLE_LENGTH);
        assert!(draft.resolved_slug().len() <= MAX_SLUG_LENGTH);
        assert!(draft.resolved_slug().ends_with("-copy-20251014-093000-12"));
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_booking_gate_order() {
        let now = Utc::now();
        let mut workshop = crate::test_support::workshop_entity(now + Duration::days(1));
        assert!(workshop.booking_gate(now).is_ok());

        workshop.status = WorkshopStatus::Full;
        assert_eq!(workshop.booking_gate(now), Err(WorkshopUnavailable::SoldOut));
        workshop.status = WorkshopStatus::Cancelled;
        assert_eq!(workshop.booking_gate(now), Err(WorkshopUnavailable::Cancelled));
        workshop.status = WorkshopStatus::Completed;
        assert_eq!(workshop.booking_gate(now), Err(WorkshopUnavailable::AlreadyOccurred));

        workshop.status = WorkshopStatus::Active;
        workshop.start_datetime = now;
        assert_eq!(workshop.booking_gate(now), Err(WorkshopUnavailable::AlreadyStarted));
    }
}

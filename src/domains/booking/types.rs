use crate::errors::{CapacityError, DomainError, DomainResult, ValidationError};
use crate::types::{
    parse_db_decimal, parse_db_timestamp, parse_db_uuid, parse_optional_timestamp, parse_optional_uuid,
};
use crate::validation::{common, normalize, Validate, ValidationBuilder};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Upper bound on participants in a single booking
pub const MAX_PARTICIPANTS_PER_BOOKING: i64 = 10;

const MAX_NAME_LENGTH: usize = 100;
const MAX_NOTES_LENGTH: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }

    /// Edges of the booking state machine. Staying in the same state is
    /// handled by the caller as a no-op and is not an edge.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Completed)
        )
    }

    /// Only confirmed bookings hold seats.
    pub fn holds_seats(&self) -> bool {
        *self == BookingStatus::Confirmed
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "completed" => Ok(BookingStatus::Completed),
            _ => Err(DomainError::Validation(ValidationError::invalid_value(
                "status",
                &format!("unknown booking status '{}'", s),
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "paid" => Ok(PaymentStatus::Paid),
            "refunded" => Ok(PaymentStatus::Refunded),
            _ => Err(DomainError::Validation(ValidationError::invalid_value(
                "payment_status",
                &format!("unknown payment status '{}'", s),
            ))),
        }
    }
}

/// Contact snapshot captured when the booking is made. Later edits to a user
/// account never touch it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ContactInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

impl ContactInfo {
    /// Build from a single "full name" form field. The name is split on the
    /// first space; a single word fills both first and last name.
    pub fn from_full_name(full_name: &str, email: &str, phone: &str) -> Self {
        let full_name = full_name.trim();
        let (first_name, last_name) = match full_name.split_once(' ') {
            Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
            None => (full_name.to_string(), full_name.to_string()),
        };

        Self {
            first_name,
            last_name,
            email: email.to_string(),
            phone: phone.to_string(),
        }
    }

    pub fn normalized(&self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: normalize::email(&self.email),
            phone: normalize::phone(&self.phone),
        }
    }
}

impl Validate for ContactInfo {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("first_name", Some(self.first_name.clone()))
            .not_blank()
            .max_length(MAX_NAME_LENGTH)
            .validate()?;

        ValidationBuilder::new("last_name", Some(self.last_name.clone()))
            .not_blank()
            .max_length(MAX_NAME_LENGTH)
            .validate()?;

        common::validate_email(&self.email, "email")?;

        ValidationBuilder::new("phone", Some(self.phone.clone()))
            .not_blank()
            .phone()
            .validate()
    }
}

/// NewBooking DTO - a booking request coming from the booking form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBooking {
    pub workshop_slug: String,
    /// Absent for guest bookings
    pub user_id: Option<Uuid>,
    pub number_of_participants: i64,
    pub contact: ContactInfo,
    pub participants_details: Option<JsonValue>,
    pub notes: Option<String>,
    /// Computed from the workshop price when absent
    pub total_price: Option<Decimal>,
}

impl Validate for NewBooking {
    fn validate(&self) -> DomainResult<()> {
        self.contact.validate()?;

        if let Some(user_id) = self.user_id {
            ValidationBuilder::new("user_id", Some(user_id))
                .not_nil()
                .validate()?;
        }

        if let Some(notes) = &self.notes {
            ValidationBuilder::new("notes", Some(notes.clone()))
                .max_length(MAX_NOTES_LENGTH)
                .validate()?;
        }

        if let Some(price) = self.total_price {
            common::validate_price(price, "total_price")?;
        }

        Ok(())
    }
}

/// Participant count rules, in the order their messages take priority.
///
/// The per-booking limit is a form-level rule and is reported before any
/// seat shortage: 11 requested with 5 seats left is a range error, not
/// "only 5 spots left".
pub fn check_participant_request(requested: i64, available: i64, max_participants: i64) -> DomainResult<()> {
    if requested < 1 {
        return Err(DomainError::Validation(ValidationError::custom(
            "A booking needs a minimum 1 participant",
        )));
    }
    if requested > MAX_PARTICIPANTS_PER_BOOKING {
        return Err(DomainError::Validation(ValidationError::range(
            "number_of_participants",
            1,
            MAX_PARTICIPANTS_PER_BOOKING,
        )));
    }
    if requested > available {
        return Err(if available <= 0 {
            CapacityError::SoldOut.into()
        } else {
            CapacityError::OnlyRemaining(available).into()
        });
    }
    if requested > max_participants {
        return Err(CapacityError::ExceedsWorkshopMaximum(max_participants).into());
    }
    Ok(())
}

/// Reference handed to the customer: the prefix followed by 32 random bits
/// as upper-case hex.
pub fn generate_reference(prefix: &str) -> String {
    format!("{}{}", prefix, hex::encode_upper(rand::random::<[u8; 4]>()))
}

/// Booking entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub workshop_id: Uuid,
    pub user_id: Option<Uuid>,
    pub number_of_participants: i64,
    pub contact: ContactInfo,
    pub participants_details: Option<JsonValue>,
    pub total_price: Decimal,
    pub payment_status: PaymentStatus,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub booking_reference: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Everything the insert needs once the workshop has been checked
#[derive(Debug, Clone)]
pub struct BookingInsert {
    pub workshop_id: Uuid,
    pub user_id: Option<Uuid>,
    pub number_of_participants: i64,
    pub contact: ContactInfo,
    pub participants_details: Option<JsonValue>,
    pub notes: Option<String>,
    pub total_price: Decimal,
    pub booking_reference: String,
}

/// BookingRow - SQLite row representation for mapping from database
#[derive(Debug, Clone, FromRow)]
pub struct BookingRow {
    pub id: String,
    pub workshop_id: String,
    pub user_id: Option<String>,
    pub number_of_participants: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub participants_details: Option<String>,
    pub total_price: String,
    pub payment_status: String,
    pub status: String,
    pub notes: Option<String>,
    pub booking_reference: String,
    pub created_at: String,
    pub updated_at: String,
    pub confirmed_at: Option<String>,
    pub cancelled_at: Option<String>,
}

impl BookingRow {
    /// Convert database row to domain entity
    pub fn into_entity(self) -> DomainResult<Booking> {
        let participants_details = self
            .participants_details
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| DomainError::Internal(format!("Invalid participants_details JSON: {}", e)))?;

        Ok(Booking {
            id: parse_db_uuid(&self.id, "bookings.id")?,
            workshop_id: parse_db_uuid(&self.workshop_id, "bookings.workshop_id")?,
            user_id: parse_optional_uuid(&self.user_id, "bookings.user_id")?,
            number_of_participants: self.number_of_participants,
            contact: ContactInfo {
                first_name: self.first_name,
                last_name: self.last_name,
                email: self.email,
                phone: self.phone,
            },
            participants_details,
            total_price: parse_db_decimal(&self.total_price, "bookings.total_price")?,
            payment_status: PaymentStatus::from_str(&self.payment_status)
                .map_err(|_| DomainError::Internal(format!("Invalid payment status '{}' in DB", self.payment_status)))?,
            status: BookingStatus::from_str(&self.status)
                .map_err(|_| DomainError::Internal(format!("Invalid booking status '{}' in DB", self.status)))?,
            notes: self.notes,
            booking_reference: self.booking_reference,
            created_at: parse_db_timestamp(&self.created_at, "bookings.created_at")?,
            updated_at: parse_db_timestamp(&self.updated_at, "bookings.updated_at")?,
            confirmed_at: parse_optional_timestamp(&self.confirmed_at, "bookings.confirmed_at")?,
            cancelled_at: parse_optional_timestamp(&self.cancelled_at, "bookings.cancelled_at")?,
        })
    }
}

use std::fmt;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Database errors
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Connection pool error: {0}")]
    ConnectionPool(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Database is locked")]
    Locked,

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Database error: {0}")]
    Other(String),
}

impl DbError {
    /// True when the underlying driver reported a UNIQUE constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DbError::Sqlx(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }

    /// Name of the violated column list as reported by SQLite ("table.column, ...").
    pub fn violated_columns(&self) -> Option<String> {
        match self {
            DbError::Sqlx(sqlx::Error::Database(db_err)) => db_err
                .message()
                .split_once("constraint failed: ")
                .map(|(_, cols)| cols.to_string()),
            _ => None,
        }
    }
}

impl serde::Serialize for DbError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("DbError", 2)?;
        let kind = match self {
            DbError::Sqlx(_) => "Sqlx",
            DbError::ConnectionPool(_) => "ConnectionPool",
            DbError::Transaction(_) => "Transaction",
            DbError::Locked => "Locked",
            DbError::Migration(_) => "Migration",
            DbError::Other(_) => "Other",
        };
        state.serialize_field("type", kind)?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Manual Clone implementation for DbError
impl Clone for DbError {
    fn clone(&self) -> Self {
        match self {
            DbError::Sqlx(err) => DbError::Other(format!("SQLx error: {}", err)),
            DbError::ConnectionPool(s) => DbError::ConnectionPool(s.clone()),
            DbError::Transaction(s) => DbError::Transaction(s.clone()),
            DbError::Locked => DbError::Locked,
            DbError::Migration(s) => DbError::Migration(s.clone()),
            DbError::Other(s) => DbError::Other(s.clone()),
        }
    }
}

/// Reasons a booking request does not fit in the remaining seats.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum CapacityError {
    #[error("This webinar is sold out")]
    SoldOut,

    #[error("Only {0} spots left")]
    OnlyRemaining(i64),

    #[error("Requested participants exceed the workshop maximum of {0}")]
    ExceedsWorkshopMaximum(i64),
}

/// Reasons a workshop does not accept bookings at all.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkshopUnavailable {
    #[error("This webinar is sold out")]
    SoldOut,

    #[error("This webinar has been cancelled")]
    Cancelled,

    #[error("This webinar has already taken place")]
    AlreadyOccurred,

    #[error("This webinar has already started or ended")]
    AlreadyStarted,
}

/// Domain-level errors
#[derive(Debug, Error, Clone, Serialize)]
pub enum DomainError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    CapacityExceeded(CapacityError),

    #[error("{0}")]
    InvalidWorkshopState(WorkshopUnavailable),

    #[error("User {user_id} already reviewed workshop {workshop_id}")]
    DuplicateReview {
        workshop_id: Uuid,
        user_id: Uuid,
    },

    #[error("{0} is already subscribed to the newsletter")]
    AlreadySubscribed(String),

    #[error("Invalid booking transition from {from} to {to}")]
    InvalidTransition {
        from: String,
        to: String,
    },

    #[error("Entity not found: {0} with ID {1}")]
    EntityNotFound(String, Uuid),

    #[error("Entity not found: {0} '{1}'")]
    NotFound(String, String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Errors the caller can show to the visitor and recover from without
    /// operator involvement.
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            DomainError::Validation(_)
                | DomainError::CapacityExceeded(_)
                | DomainError::InvalidWorkshopState(_)
                | DomainError::DuplicateReview { .. }
                | DomainError::AlreadySubscribed(_)
                | DomainError::EntityNotFound(_, _)
                | DomainError::NotFound(_, _)
        )
    }
}

impl From<CapacityError> for DomainError {
    fn from(error: CapacityError) -> Self {
        DomainError::CapacityExceeded(error)
    }
}

impl From<WorkshopUnavailable> for DomainError {
    fn from(error: WorkshopUnavailable) -> Self {
        DomainError::InvalidWorkshopState(error)
    }
}

/// Service-level errors (application specific)
#[derive(Debug, Error, Clone, Serialize)]
pub enum ServiceError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ServiceError {
    /// Message suitable for the presentation layer. Integrity and storage
    /// failures are collapsed into a generic message.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Domain(DomainError::Validation(e)) => e.to_string(),
            ServiceError::Domain(DomainError::CapacityExceeded(e)) => e.to_string(),
            ServiceError::Domain(DomainError::InvalidWorkshopState(e)) => e.to_string(),
            ServiceError::Domain(DomainError::DuplicateReview { .. }) => {
                "You have already reviewed this webinar".to_string()
            }
            ServiceError::Domain(DomainError::AlreadySubscribed(_)) => {
                "This email address is already subscribed to the newsletter".to_string()
            }
            ServiceError::Domain(DomainError::EntityNotFound(_, _))
            | ServiceError::Domain(DomainError::NotFound(_, _)) => "Not found".to_string(),
            _ => "Something went wrong, please try again later".to_string(),
        }
    }
}

/// Validation errors
#[derive(Debug, Error, Clone, Serialize)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required {
        field: String,
    },

    #[error("Field '{field}' cannot exceed {max} characters")]
    MaxLength {
        field: String,
        max: usize,
    },

    #[error("Field '{field}' must be between {min} and {max}")]
    Range {
        field: String,
        min: String,
        max: String,
    },

    #[error("Field '{field}' contains invalid format: {reason}")]
    Format {
        field: String,
        reason: String,
    },

    #[error("Field '{field}' must be unique")]
    Unique {
        field: String,
    },

    #[error("Field '{field}' contains an invalid value: {reason}")]
    InvalidValue {
        field: String,
        reason: String,
    },

    #[error("Relationship error: {0}")]
    Relationship(String),

    #[error("Validation error: {0}")]
    Custom(String),
}

impl ValidationError {
    pub fn required(field: &str) -> Self {
        Self::Required {
            field: field.to_string(),
        }
    }

    pub fn max_length(field: &str, max: usize) -> Self {
        Self::MaxLength {
            field: field.to_string(),
            max,
        }
    }

    pub fn range<T: fmt::Display>(field: &str, min: T, max: T) -> Self {
        Self::Range {
            field: field.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    pub fn format(field: &str, reason: &str) -> Self {
        Self::Format {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn unique(field: &str) -> Self {
        Self::Unique {
            field: field.to_string(),
        }
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn relationship(message: &str) -> Self {
        Self::Relationship(message.to_string())
    }

    pub fn custom(message: &str) -> Self {
        Self::Custom(message.to_string())
    }
}

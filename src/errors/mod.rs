mod error;

pub use error::{
    CapacityError, DbError, DomainError, ServiceError, ValidationError, WorkshopUnavailable,
};

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

use crate::errors::{DbError, DomainError, DomainResult, ValidationError};
use async_trait::async_trait;
use sqlx::SqliteConnection;
use uuid::Uuid;

/// Trait for finding entities by ID
#[async_trait]
pub trait FindById<T> {
    /// Find an entity by ID
    async fn find_by_id(&self, id: Uuid) -> DomainResult<T>;
}

/// Trait for entities that can be removed permanently. Dependent rows are
/// handled by the schema's foreign key actions (cascade or set null).
#[async_trait]
pub trait HardDeletable {
    /// The name of the entity table in the database (for logging)
    fn entity_name(&self) -> &'static str;

    /// Hard delete an entity by ID (standalone)
    async fn hard_delete(&self, id: Uuid) -> DomainResult<()>;

    /// Hard delete an entity by ID on a connection that already holds a transaction
    async fn hard_delete_with_conn(&self, id: Uuid, conn: &mut SqliteConnection) -> DomainResult<()>;
}

/// Turn a UNIQUE constraint failure into a field-level validation error.
/// Any other database error is passed through unchanged.
pub fn map_unique_violation(err: sqlx::Error) -> DomainError {
    let db_err = DbError::from(err);
    if !db_err.is_unique_violation() {
        return DomainError::Database(db_err);
    }

    let field = db_err
        .violated_columns()
        .and_then(|cols| {
            cols.split(',')
                .next()
                .map(|col| col.trim().rsplit('.').next().unwrap_or(col).to_string())
        })
        .unwrap_or_else(|| "record".to_string());

    DomainError::Validation(ValidationError::unique(&field))
}

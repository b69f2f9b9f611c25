use crate::errors::{DbError, DbResult};
use crate::types::to_db_timestamp;
use sqlx::SqlitePool;
use std::collections::HashSet;

// Embed all migration SQL files at compile time
const MIGRATION_CORE_SCHEMA: &str = include_str!("../migrations/20251001000000_core_schema.sql");
const MIGRATION_CONTENT_PAGES: &str = include_str!("../migrations/20251002000000_content_pages.sql");

// List of migrations with their names and SQL content
const MIGRATIONS: &[(&str, &str)] = &[
    ("20251001000000_core_schema.sql", MIGRATION_CORE_SCHEMA),
    ("20251002000000_content_pages.sql", MIGRATION_CONTENT_PAGES),
];

/// Bring the schema up to date. Safe to call on every start.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    log::info!("Starting database migration process");

    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    log::debug!("{} migrations already applied", applied.len());

    apply_pending_migrations(pool, &applied).await?;

    log::info!("Database migration process completed");
    Ok(())
}

/// Create migrations table if it doesn't exist
async fn create_migrations_table(pool: &SqlitePool) -> DbResult<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL
        )"
    )
    .execute(pool)
    .await
    .map_err(|e| DbError::Migration(format!("Failed to create migrations table: {}", e)))?;

    Ok(())
}

async fn get_applied_migrations(pool: &SqlitePool) -> DbResult<HashSet<String>> {
    let names = sqlx::query_scalar::<_, String>("SELECT name FROM migrations")
        .fetch_all(pool)
        .await
        .map_err(|e| DbError::Migration(format!("Failed to read applied migrations: {}", e)))?;

    Ok(names.into_iter().collect())
}

/// Apply pending migrations
async fn apply_pending_migrations(pool: &SqlitePool, applied: &HashSet<String>) -> DbResult<()> {
    let pending = get_pending_migrations(applied);

    if pending.is_empty() {
        log::debug!("No pending migrations to apply");
        return Ok(());
    }

    log::info!("Found {} pending migrations", pending.len());

    let mut tx = pool.begin().await
        .map_err(|e| DbError::Migration(format!("Failed to begin transaction: {}", e)))?;

    for (migration_name, migration_sql) in pending {
        log::info!("Applying migration: {}", migration_name);

        sqlx::query(migration_sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::Migration(format!("Failed to apply migration {}: {}", migration_name, e)))?;

        sqlx::query("INSERT INTO migrations (name, applied_at) VALUES (?, ?)")
            .bind(migration_name)
            .bind(to_db_timestamp(&chrono::Utc::now()))
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::Migration(format!("Failed to record migration {}: {}", migration_name, e)))?;
    }

    tx.commit().await
        .map_err(|e| DbError::Migration(format!("Failed to commit migrations: {}", e)))?;

    log::info!("All migrations applied and committed");
    Ok(())
}

/// Determine which migrations need to be applied
fn get_pending_migrations(applied: &HashSet<String>) -> Vec<(&'static str, &'static str)> {
    MIGRATIONS
        .iter()
        .filter(|(name, _)| !applied.contains(*name))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestDb;

    #[test]
    fn test_pending_skips_applied() {
        let mut applied = HashSet::new();
        assert_eq!(get_pending_migrations(&applied).len(), MIGRATIONS.len());

        applied.insert("20251001000000_core_schema.sql".to_string());
        let pending = get_pending_migrations(&applied);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].0, "20251002000000_content_pages.sql");
    }

    #[tokio::test]
    async fn test_rerun_is_noop() {
        let db = TestDb::new().await;
        run_migrations(&db.pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM migrations")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as i64);
    }
}

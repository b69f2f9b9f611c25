use std::str::FromStr;
use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use crate::config::DatabaseConfig;
use crate::errors::{DbError, DbResult};

/// Open the connection pool described by `config`.
pub async fn connect(config: &DatabaseConfig) -> DbResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| DbError::ConnectionPool(format!("Invalid database URL '{}': {}", config.url, e)))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .map_err(|e| DbError::ConnectionPool(format!("Database connection failed: {}", e)))
}

/// A write transaction started with `BEGIN IMMEDIATE`.
///
/// SQLite takes the reserved lock up front, so two of these never interleave
/// their reads and writes: the second one waits (up to the busy timeout) until
/// the first commits or rolls back. Capacity checks rely on this.
///
/// The guard must be finished with [`commit`](Self::commit) or
/// [`rollback`](Self::rollback). If it is dropped while still open the
/// underlying connection is detached from the pool and closed, which makes
/// SQLite discard the transaction.
pub struct ImmediateTx {
    conn: Option<PoolConnection<Sqlite>>,
}

impl ImmediateTx {
    pub async fn begin(pool: &SqlitePool) -> DbResult<Self> {
        let mut conn = pool
            .acquire()
            .await
            .map_err(|e| DbError::ConnectionPool(e.to_string()))?;

        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.message().contains("locked") => DbError::Locked,
                _ => DbError::Transaction(format!("Failed to begin immediate transaction: {}", e)),
            })?;

        Ok(Self { conn: Some(conn) })
    }

    /// Connection to run statements on while the transaction is open.
    pub fn conn(&mut self) -> DbResult<&mut SqliteConnection> {
        self.conn
            .as_deref_mut()
            .ok_or_else(|| DbError::Transaction("Transaction already finished".to_string()))
    }

    pub async fn commit(mut self) -> DbResult<()> {
        self.finish("COMMIT").await
    }

    pub async fn rollback(mut self) -> DbResult<()> {
        self.finish("ROLLBACK").await
    }

    /// Roll back on an error path. A failed rollback is logged and the
    /// connection is closed instead of returned to the pool.
    pub async fn abort(self) {
        if let Err(e) = self.rollback().await {
            log::warn!("Rollback failed: {}", e);
        }
    }

    async fn finish(&mut self, statement: &str) -> DbResult<()> {
        let mut conn = self
            .conn
            .take()
            .ok_or_else(|| DbError::Transaction("Transaction already finished".to_string()))?;

        match sqlx::query(statement).execute(&mut *conn).await {
            Ok(_) => Ok(()),
            Err(e) => {
                // Connection state is unknown now; never hand it back to the pool.
                drop(conn.detach());
                Err(DbError::Transaction(format!("{} failed: {}", statement, e)))
            }
        }
    }
}

impl Drop for ImmediateTx {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            log::warn!("Immediate transaction dropped while open; closing its connection");
            drop(conn.detach());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestDb;

    #[tokio::test]
    async fn test_commit_persists_and_rollback_discards() {
        let db = TestDb::new().await;

        let mut tx = ImmediateTx::begin(&db.pool).await.unwrap();
        sqlx::query("INSERT INTO content_pages (key, body, updated_at) VALUES ('about', 'kept', '2025-01-01T00:00:00.000000Z')")
            .execute(tx.conn().unwrap())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = ImmediateTx::begin(&db.pool).await.unwrap();
        sqlx::query("INSERT INTO content_pages (key, body, updated_at) VALUES ('terms', 'gone', '2025-01-01T00:00:00.000000Z')")
            .execute(tx.conn().unwrap())
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        let keys: Vec<String> = sqlx::query_scalar("SELECT key FROM content_pages ORDER BY key")
            .fetch_all(&db.pool)
            .await
            .unwrap();
        assert_eq!(keys, vec!["about".to_string()]);
    }

    #[tokio::test]
    async fn test_abort_survives_failed_rollback() {
        let db = TestDb::new().await;

        let mut tx = ImmediateTx::begin(&db.pool).await.unwrap();
        sqlx::query("INSERT INTO content_pages (key, body, updated_at) VALUES ('contact', 'x', '2025-01-01T00:00:00.000000Z')")
            .execute(tx.conn().unwrap())
            .await
            .unwrap();
        tx.abort().await;

        // Ending the transaction underneath the guard makes its own ROLLBACK fail.
        let mut tx = ImmediateTx::begin(&db.pool).await.unwrap();
        sqlx::query("ROLLBACK").execute(tx.conn().unwrap()).await.unwrap();
        tx.abort().await;

        let tx = ImmediateTx::begin(&db.pool).await.unwrap();
        tx.commit().await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM content_pages")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_dropped_transaction_is_discarded() {
        let db = TestDb::new().await;

        {
            let mut tx = ImmediateTx::begin(&db.pool).await.unwrap();
            sqlx::query("INSERT INTO content_pages (key, body, updated_at) VALUES ('privacy', 'x', '2025-01-01T00:00:00.000000Z')")
                .execute(tx.conn().unwrap())
                .await
                .unwrap();
        }

        // A fresh writer must be able to take the lock again.
        let tx = ImmediateTx::begin(&db.pool).await.unwrap();
        tx.rollback().await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM content_pages")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}

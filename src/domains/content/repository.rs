use crate::domains::content::types::{
    effective_content, ContentPage, ContentPageRow, InhouseTrainingPage, InhouseTrainingPageRow,
    UpdateInhouseTrainingPage, DEFAULT_BANNER_BUTTON_TEXT, DEFAULT_BANNER_DESCRIPTION,
    DEFAULT_BANNER_TITLE, DEFAULT_INHOUSE_CONTENT,
};
use crate::errors::{DbError, DomainError, DomainResult};
use crate::types::to_db_timestamp;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query, query_as, SqlitePool};

const INHOUSE_PAGE_ID: i64 = 1;

/// Trait defining content page repository operations
#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn find_page(&self, key: &str) -> DomainResult<ContentPage>;

    /// Insert or replace the page body
    async fn upsert_page(&self, key: &str, body: &str) -> DomainResult<ContentPage>;

    /// Read the in-house training page, creating it with defaults first if
    /// it does not exist yet
    async fn get_or_create_inhouse(&self) -> DomainResult<InhouseTrainingPage>;

    async fn update_inhouse(&self, update: &UpdateInhouseTrainingPage) -> DomainResult<InhouseTrainingPage>;
}

/// SQLite implementation for ContentRepository
#[derive(Debug, Clone)]
pub struct SqliteContentRepository {
    pool: SqlitePool,
}

impl SqliteContentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentRepository for SqliteContentRepository {
    async fn find_page(&self, key: &str) -> DomainResult<ContentPage> {
        let row = query_as::<_, ContentPageRow>("SELECT key, body, updated_at FROM content_pages WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| DomainError::NotFound("ContentPage".to_string(), key.to_string()))?;

        row.into_entity()
    }

    async fn upsert_page(&self, key: &str, body: &str) -> DomainResult<ContentPage> {
        query(
            "INSERT INTO content_pages (key, body, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(body)
        .bind(to_db_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        self.find_page(key).await
    }

    async fn get_or_create_inhouse(&self) -> DomainResult<InhouseTrainingPage> {
        query(
            "INSERT OR IGNORE INTO inhouse_training_page (
                id, content, banner_title, banner_description, banner_button_text, is_active, updated_at
             ) VALUES (?, ?, ?, ?, ?, 1, ?)",
        )
        .bind(INHOUSE_PAGE_ID)
        .bind(DEFAULT_INHOUSE_CONTENT)
        .bind(DEFAULT_BANNER_TITLE)
        .bind(DEFAULT_BANNER_DESCRIPTION)
        .bind(DEFAULT_BANNER_BUTTON_TEXT)
        .bind(to_db_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        let row = query_as::<_, InhouseTrainingPageRow>(
            "SELECT content, banner_title, banner_description, banner_button_text, is_active, updated_at
             FROM inhouse_training_page WHERE id = ?",
        )
        .bind(INHOUSE_PAGE_ID)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;

        row.into_entity()
    }

    async fn update_inhouse(&self, update: &UpdateInhouseTrainingPage) -> DomainResult<InhouseTrainingPage> {
        let current = self.get_or_create_inhouse().await?;

        let content = update.content.as_deref().unwrap_or(&current.content);
        query(
            "UPDATE inhouse_training_page
             SET content = ?, banner_title = ?, banner_description = ?, banner_button_text = ?,
                 is_active = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(effective_content(content))
        .bind(update.banner_title.as_deref().unwrap_or(&current.banner_title))
        .bind(update.banner_description.as_deref().unwrap_or(&current.banner_description))
        .bind(update.banner_button_text.as_deref().unwrap_or(&current.banner_button_text))
        .bind(update.is_active.unwrap_or(current.is_active))
        .bind(to_db_timestamp(&Utc::now()))
        .bind(INHOUSE_PAGE_ID)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        self.get_or_create_inhouse().await
    }
}

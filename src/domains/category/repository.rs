use crate::domains::category::types::{
    Category, CategoryRow, CategoryWithCount, NewCategory, UpdateCategory,
};
use crate::domains::core::repository::{map_unique_violation, FindById, HardDeletable};
use crate::domains::workshop::types::VISIBLE_WORKSHOP_CONDITION;
use crate::errors::{DbError, DomainError, DomainResult};
use crate::types::to_db_timestamp;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteArguments;
use sqlx::{query, query_as, query_scalar, Arguments, FromRow, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Trait defining category repository operations
#[async_trait]
pub trait CategoryRepository: FindById<Category> + HardDeletable + Send + Sync {
    async fn create(&self, new_category: &NewCategory) -> DomainResult<Category>;

    async fn update(&self, id: Uuid, update_data: &UpdateCategory) -> DomainResult<Category>;

    async fn find_by_slug(&self, slug: &str) -> DomainResult<Category>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> DomainResult<Vec<Category>>;

    /// All categories ordered by name, each with its visible workshop count
    async fn find_all_with_counts(&self) -> DomainResult<Vec<CategoryWithCount>>;

    async fn count(&self) -> DomainResult<i64>;
}

#[derive(Debug, FromRow)]
struct CategoryCountRow {
    #[sqlx(flatten)]
    category: CategoryRow,
    active_workshop_count: i64,
}

/// SQLite implementation for CategoryRepository
#[derive(Debug, Clone)]
pub struct SqliteCategoryRepository {
    pool: SqlitePool,
}

impl SqliteCategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_row_to_entity(row: CategoryRow) -> DomainResult<Category> {
        row.into_entity()
            .map_err(|e| DomainError::Internal(format!("Failed to map row to entity: {}", e)))
    }
}

#[async_trait]
impl FindById<Category> for SqliteCategoryRepository {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Category> {
        let row = query_as::<_, CategoryRow>("SELECT * FROM categories WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| DomainError::EntityNotFound("Category".to_string(), id))?;

        Self::map_row_to_entity(row)
    }
}

#[async_trait]
impl HardDeletable for SqliteCategoryRepository {
    fn entity_name(&self) -> &'static str {
        "categories"
    }

    async fn hard_delete_with_conn(&self, id: Uuid, conn: &mut SqliteConnection) -> DomainResult<()> {
        // workshops.category_id is ON DELETE SET NULL
        let result = query("DELETE FROM categories WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *conn)
            .await
            .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            Err(DomainError::EntityNotFound("Category".to_string(), id))
        } else {
            Ok(())
        }
    }

    async fn hard_delete(&self, id: Uuid) -> DomainResult<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        let result = self.hard_delete_with_conn(id, &mut tx).await;
        match result {
            Ok(()) => {
                tx.commit().await.map_err(DbError::from)?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    log::warn!("Rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl CategoryRepository for SqliteCategoryRepository {
    async fn create(&self, new_category: &NewCategory) -> DomainResult<Category> {
        let id = Uuid::new_v4();
        let now_str = to_db_timestamp(&Utc::now());

        query(
            "INSERT INTO categories (id, name, slug, description, icon, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(new_category.name.trim())
        .bind(new_category.resolved_slug())
        .bind(&new_category.description)
        .bind(new_category.resolved_icon())
        .bind(&now_str)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        self.find_by_id(id).await
    }

    async fn update(&self, id: Uuid, update_data: &UpdateCategory) -> DomainResult<Category> {
        let mut set_clauses = Vec::new();
        let mut args = SqliteArguments::default();

        if let Some(name) = &update_data.name {
            set_clauses.push("name = ?");
            let _ = args.add(name.trim().to_string());
        }
        if let Some(slug) = &update_data.slug {
            set_clauses.push("slug = ?");
            let _ = args.add(slug.clone());
        }
        if let Some(description) = &update_data.description {
            set_clauses.push("description = ?");
            let _ = args.add(description.clone());
        }
        if let Some(icon) = &update_data.icon {
            set_clauses.push("icon = ?");
            let _ = args.add(icon.clone());
        }

        if set_clauses.is_empty() {
            return self.find_by_id(id).await;
        }

        let query_str = format!("UPDATE categories SET {} WHERE id = ?", set_clauses.join(", "));
        let _ = args.add(id.to_string());

        let result = sqlx::query_with(&query_str, args)
            .execute(&self.pool)
            .await
            .map_err(map_unique_violation)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::EntityNotFound("Category".to_string(), id));
        }

        self.find_by_id(id).await
    }

    async fn find_by_slug(&self, slug: &str) -> DomainResult<Category> {
        let row = query_as::<_, CategoryRow>("SELECT * FROM categories WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| DomainError::NotFound("Category".to_string(), slug.to_string()))?;

        Self::map_row_to_entity(row)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> DomainResult<Vec<Category>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let query_str = format!("SELECT * FROM categories WHERE id IN ({})", placeholders);
        let mut select_query = query_as::<_, CategoryRow>(&query_str);
        for id in ids {
            select_query = select_query.bind(id.to_string());
        }

        let rows = select_query
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        rows.into_iter().map(Self::map_row_to_entity).collect()
    }

    async fn find_all_with_counts(&self) -> DomainResult<Vec<CategoryWithCount>> {
        let query_str = format!(
            "SELECT c.*,
                (SELECT COUNT(*) FROM workshops w WHERE w.category_id = c.id AND {}) AS active_workshop_count
             FROM categories c
             ORDER BY c.name",
            VISIBLE_WORKSHOP_CONDITION
        );

        let rows = query_as::<_, CategoryCountRow>(&query_str)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        rows.into_iter()
            .map(|row| {
                Ok(CategoryWithCount {
                    category: Self::map_row_to_entity(row.category)?,
                    active_workshop_count: row.active_workshop_count,
                })
            })
            .collect()
    }

    async fn count(&self) -> DomainResult<i64> {
        let total: i64 = query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(total)
    }
}

use crate::database::ImmediateTx;
use crate::domains::core::repository::{map_unique_violation, FindById, HardDeletable};
use crate::domains::workshop::capacity;
use crate::domains::workshop::types::{
    NewWorkshop, UpdateWorkshop, Workshop, WorkshopFilter, WorkshopRow, WorkshopStatus,
    VISIBLE_WORKSHOP_CONDITION,
};
use crate::errors::{DbError, DomainError, DomainResult};
use crate::types::{to_db_timestamp, PaginatedResult, PaginationParams};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteArguments;
use sqlx::{query, query_as, query_scalar, Arguments, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Trait defining workshop repository operations
#[async_trait]
pub trait WorkshopRepository: FindById<Workshop> + HardDeletable + Send + Sync {
    async fn create(&self, new_workshop: &NewWorkshop) -> DomainResult<Workshop>;

    /// Write the supplied fields and re-apply the derived status rule in the
    /// same write transaction.
    async fn update(&self, id: Uuid, update_data: &UpdateWorkshop) -> DomainResult<Workshop>;

    async fn update_with_conn(
        &self,
        id: Uuid,
        update_data: &UpdateWorkshop,
        conn: &mut SqliteConnection,
    ) -> DomainResult<Workshop>;

    async fn find_by_id_with_conn(&self, id: Uuid, conn: &mut SqliteConnection) -> DomainResult<Workshop>;

    async fn find_by_slug(&self, slug: &str) -> DomainResult<Workshop>;

    async fn find_by_slug_with_conn(&self, slug: &str, conn: &mut SqliteConnection) -> DomainResult<Workshop>;

    async fn find_all(
        &self,
        filter: &WorkshopFilter,
        params: PaginationParams,
    ) -> DomainResult<PaginatedResult<Workshop>>;

    /// Visible workshops, soonest first
    async fn find_featured(&self, limit: u32) -> DomainResult<Vec<Workshop>>;

    /// Visible workshops sharing the category, excluding the workshop itself
    async fn find_related(&self, workshop: &Workshop, limit: u32) -> DomainResult<Vec<Workshop>>;

    async fn slug_exists(&self, slug: &str) -> DomainResult<bool>;

    /// Recompute `full` from the live confirmed-seat sum and persist a change.
    /// Returns the new status when it changed.
    async fn refresh_derived_status_with_conn(
        &self,
        id: Uuid,
        allow_release: bool,
        conn: &mut SqliteConnection,
    ) -> DomainResult<Option<WorkshopStatus>>;

    async fn count_visible(&self) -> DomainResult<i64>;

    async fn count_visible_instructors(&self) -> DomainResult<i64>;
}

/// SQLite implementation for WorkshopRepository
#[derive(Debug, Clone)]
pub struct SqliteWorkshopRepository {
    pool: SqlitePool,
}

impl SqliteWorkshopRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_row_to_entity(row: WorkshopRow) -> DomainResult<Workshop> {
        row.into_entity()
            .map_err(|e| DomainError::Internal(format!("Failed to map row to entity: {}", e)))
    }

    fn map_rows(rows: Vec<WorkshopRow>) -> DomainResult<Vec<Workshop>> {
        rows.into_iter().map(Self::map_row_to_entity).collect()
    }
}

#[async_trait]
impl FindById<Workshop> for SqliteWorkshopRepository {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Workshop> {
        let row = query_as::<_, WorkshopRow>("SELECT * FROM workshops WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| DomainError::EntityNotFound("Workshop".to_string(), id))?;

        Self::map_row_to_entity(row)
    }
}

#[async_trait]
impl HardDeletable for SqliteWorkshopRepository {
    fn entity_name(&self) -> &'static str {
        "workshops"
    }

    async fn hard_delete_with_conn(&self, id: Uuid, conn: &mut SqliteConnection) -> DomainResult<()> {
        // Bookings and reviews cascade
        let result = query("DELETE FROM workshops WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *conn)
            .await
            .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            Err(DomainError::EntityNotFound("Workshop".to_string(), id))
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
impl WorkshopRepository for SqliteWorkshopRepository {
    async fn create(&self, new_workshop: &NewWorkshop) -> DomainResult<Workshop> {
        let id = Uuid::new_v4();
        let now_str = to_db_timestamp(&Utc::now());

        query(
            r#"
            INSERT INTO workshops (
                id, title, slug, description, short_description, category_id,
                start_datetime, end_datetime, duration_hours,
                meeting_url, meeting_id, meeting_password,
                max_participants, min_participants, price,
                materials_included, requirements, what_to_bring,
                status, is_active, featured,
                instructor_name, instructor_bio,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(new_workshop.title.trim())
        .bind(new_workshop.resolved_slug())
        .bind(&new_workshop.description)
        .bind(&new_workshop.short_description)
        .bind(new_workshop.category_id.map(|c| c.to_string()))
        .bind(to_db_timestamp(&new_workshop.start_datetime))
        .bind(to_db_timestamp(&new_workshop.end_datetime))
        .bind(new_workshop.duration_hours.to_string())
        .bind(&new_workshop.meeting.url)
        .bind(&new_workshop.meeting.id)
        .bind(&new_workshop.meeting.password)
        .bind(new_workshop.max_participants)
        .bind(new_workshop.min_participants.unwrap_or(1))
        .bind(new_workshop.price.to_string())
        .bind(new_workshop.materials_included.unwrap_or(true))
        .bind(&new_workshop.requirements)
        .bind(&new_workshop.what_to_bring)
        .bind(new_workshop.status.unwrap_or_default().as_str())
        .bind(new_workshop.is_active.unwrap_or(true))
        .bind(new_workshop.featured.unwrap_or(false))
        .bind(new_workshop.instructor_name.trim())
        .bind(&new_workshop.instructor_bio)
        .bind(&now_str)
        .bind(&now_str)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        self.find_by_id(id).await
    }

    async fn update(&self, id: Uuid, update_data: &UpdateWorkshop) -> DomainResult<Workshop> {
        let mut tx = ImmediateTx::begin(&self.pool).await?;
        let result = async {
            let conn = tx.conn()?;
            self.update_with_conn(id, update_data, conn).await?;
            self.refresh_derived_status_with_conn(id, false, conn).await?;
            self.find_by_id_with_conn(id, conn).await
        }
        .await;

        match result {
            Ok(workshop) => {
                tx.commit().await?;
                Ok(workshop)
            }
            Err(e) => {
                tx.abort().await;
                Err(e)
            }
        }
    }

    async fn update_with_conn(
        &self,
        id: Uuid,
        update_data: &UpdateWorkshop,
        conn: &mut SqliteConnection,
    ) -> DomainResult<Workshop> {
        let mut set_clauses: Vec<&str> = Vec::new();
        let mut args = SqliteArguments::default();

        macro_rules! add_update {
            ($column:literal, $value:expr) => {
                if let Some(val) = $value {
                    set_clauses.push(concat!($column, " = ?"));
                    let _ = args.add(val);
                }
            };
        }

        add_update!("title", update_data.title.as_ref().map(|t| t.trim().to_string()));
        add_update!("slug", update_data.slug.clone());
        add_update!("description", update_data.description.clone());
        add_update!("short_description", update_data.short_description.clone());
        add_update!("category_id", update_data.category_id.map(|c| c.map(|id| id.to_string())));
        add_update!("start_datetime", update_data.start_datetime.as_ref().map(to_db_timestamp));
        add_update!("end_datetime", update_data.end_datetime.as_ref().map(to_db_timestamp));
        add_update!("duration_hours", update_data.duration_hours.map(|d| d.to_string()));
        add_update!("meeting_url", update_data.meeting_url.clone());
        add_update!("meeting_id", update_data.meeting_id.clone());
        add_update!("meeting_password", update_data.meeting_password.clone());
        add_update!("max_participants", update_data.max_participants);
        add_update!("min_participants", update_data.min_participants);
        add_update!("price", update_data.price.map(|p| p.to_string()));
        add_update!("materials_included", update_data.materials_included);
        add_update!("requirements", update_data.requirements.clone());
        add_update!("what_to_bring", update_data.what_to_bring.clone());
        add_update!("status", update_data.status.map(|s| s.as_str()));
        add_update!("is_active", update_data.is_active);
        add_update!("featured", update_data.featured);
        add_update!("instructor_name", update_data.instructor_name.as_ref().map(|n| n.trim().to_string()));
        add_update!("instructor_bio", update_data.instructor_bio.clone());

        if set_clauses.is_empty() {
            return self.find_by_id_with_conn(id, conn).await;
        }

        set_clauses.push("updated_at = ?");
        let _ = args.add(to_db_timestamp(&Utc::now()));

        let query_str = format!("UPDATE workshops SET {} WHERE id = ?", set_clauses.join(", "));
        let _ = args.add(id.to_string());

        let result = sqlx::query_with(&query_str, args)
            .execute(&mut *conn)
            .await
            .map_err(map_unique_violation)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::EntityNotFound("Workshop".to_string(), id));
        }

        self.find_by_id_with_conn(id, conn).await
    }

    async fn find_by_id_with_conn(&self, id: Uuid, conn: &mut SqliteConnection) -> DomainResult<Workshop> {
        let row = query_as::<_, WorkshopRow>("SELECT * FROM workshops WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| DomainError::EntityNotFound("Workshop".to_string(), id))?;

        Self::map_row_to_entity(row)
    }

    async fn find_by_slug(&self, slug: &str) -> DomainResult<Workshop> {
        let row = query_as::<_, WorkshopRow>("SELECT * FROM workshops WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| DomainError::NotFound("Workshop".to_string(), slug.to_string()))?;

        Self::map_row_to_entity(row)
    }

    async fn find_by_slug_with_conn(&self, slug: &str, conn: &mut SqliteConnection) -> DomainResult<Workshop> {
        let row = query_as::<_, WorkshopRow>("SELECT * FROM workshops WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&mut *conn)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| DomainError::NotFound("Workshop".to_string(), slug.to_string()))?;

        Self::map_row_to_entity(row)
    }

    async fn find_all(
        &self,
        filter: &WorkshopFilter,
        params: PaginationParams,
    ) -> DomainResult<PaginatedResult<Workshop>> {
        let mut conditions: Vec<String> = Vec::new();
        let mut bind_values: Vec<String> = Vec::new();

        if !filter.include_archived {
            conditions.push(VISIBLE_WORKSHOP_CONDITION.to_string());
        }

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            conditions.push(
                "(LOWER(w.title) LIKE ? ESCAPE '\\'
                  OR LOWER(w.description) LIKE ? ESCAPE '\\'
                  OR LOWER(COALESCE(w.short_description, '')) LIKE ? ESCAPE '\\'
                  OR LOWER(COALESCE(c.name, '')) LIKE ? ESCAPE '\\')"
                    .to_string(),
            );
            let pattern = like_pattern(search);
            for _ in 0..4 {
                bind_values.push(pattern.clone());
            }
        }

        if let Some(category_slug) = &filter.category_slug {
            conditions.push("c.slug = ?".to_string());
            bind_values.push(category_slug.clone());
        }

        if let Some(status) = filter.status {
            conditions.push("w.status = ?".to_string());
            bind_values.push(status.as_str().to_string());
        }

        let where_clause = if conditions.is_empty() {
            "".to_string()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let from_clause = "FROM workshops w LEFT JOIN categories c ON c.id = w.category_id";

        // Get total count with filter
        let count_query_str = format!("SELECT COUNT(*) {} {}", from_clause, where_clause);
        let mut count_query = query_scalar(&count_query_str);
        for val in &bind_values {
            count_query = count_query.bind(val);
        }
        let total: i64 = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;

        // Fetch paginated rows with filter
        let select_query_str = format!(
            "SELECT w.* {} {} ORDER BY {} LIMIT ? OFFSET ?",
            from_clause,
            where_clause,
            filter.sort.order_by()
        );
        let mut select_query = query_as::<_, WorkshopRow>(&select_query_str);
        for val in &bind_values {
            select_query = select_query.bind(val);
        }
        select_query = select_query.bind(params.limit());
        select_query = select_query.bind(params.offset());

        let rows = select_query
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(PaginatedResult::new(Self::map_rows(rows)?, total as u64, params))
    }

    async fn find_featured(&self, limit: u32) -> DomainResult<Vec<Workshop>> {
        let query_str = format!(
            "SELECT w.* FROM workshops w WHERE {} ORDER BY w.start_datetime ASC LIMIT ?",
            VISIBLE_WORKSHOP_CONDITION
        );
        let rows = query_as::<_, WorkshopRow>(&query_str)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        Self::map_rows(rows)
    }

    async fn find_related(&self, workshop: &Workshop, limit: u32) -> DomainResult<Vec<Workshop>> {
        let Some(category_id) = workshop.category_id else {
            return Ok(Vec::new());
        };

        let query_str = format!(
            "SELECT w.* FROM workshops w
             WHERE w.category_id = ? AND w.id <> ? AND {}
             ORDER BY w.start_datetime ASC LIMIT ?",
            VISIBLE_WORKSHOP_CONDITION
        );
        let rows = query_as::<_, WorkshopRow>(&query_str)
            .bind(category_id.to_string())
            .bind(workshop.id.to_string())
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        Self::map_rows(rows)
    }

    async fn slug_exists(&self, slug: &str) -> DomainResult<bool> {
        let exists: i64 = query_scalar("SELECT EXISTS(SELECT 1 FROM workshops WHERE slug = ?)")
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(exists != 0)
    }

    async fn refresh_derived_status_with_conn(
        &self,
        id: Uuid,
        allow_release: bool,
        conn: &mut SqliteConnection,
    ) -> DomainResult<Option<WorkshopStatus>> {
        let workshop = self.find_by_id_with_conn(id, conn).await?;
        let available = capacity::available_spots(&mut *conn, &workshop).await?;

        let Some(next) = capacity::derived_status(workshop.status, available, allow_release) else {
            return Ok(None);
        };

        query("UPDATE workshops SET status = ?, updated_at = ? WHERE id = ?")
            .bind(next.as_str())
            .bind(to_db_timestamp(&Utc::now()))
            .bind(id.to_string())
            .execute(&mut *conn)
            .await
            .map_err(DbError::from)?;

        log::info!(
            "Workshop '{}' status {} -> {} ({} seats left)",
            workshop.slug, workshop.status, next, available
        );
        Ok(Some(next))
    }

    async fn count_visible(&self) -> DomainResult<i64> {
        let query_str = format!("SELECT COUNT(*) FROM workshops w WHERE {}", VISIBLE_WORKSHOP_CONDITION);
        let total: i64 = query_scalar(&query_str)
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(total)
    }

    async fn count_visible_instructors(&self) -> DomainResult<i64> {
        let query_str = format!(
            "SELECT COUNT(DISTINCT w.instructor_name) FROM workshops w WHERE {}",
            VISIBLE_WORKSHOP_CONDITION
        );
        let total: i64 = query_scalar(&query_str)
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(total)
    }
}

/// Lower-cased `%term%` with LIKE wildcards escaped.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

use crate::config::CatalogConfig;
use crate::domains::booking::repository::BookingRepository;
use crate::domains::category::repository::CategoryRepository;
use crate::domains::category::types::CategorySummary;
use crate::domains::core::repository::{FindById, HardDeletable};
use crate::domains::review::repository::ReviewRepository;
use crate::domains::workshop::capacity;
use crate::domains::workshop::repository::WorkshopRepository;
use crate::domains::workshop::types::{
    CatalogStatistics, NewWorkshop, UpdateWorkshop, Workshop, WorkshopFilter, WorkshopResponse,
};
use crate::errors::{DomainError, DomainResult, ServiceResult};
use crate::types::{PaginatedResult, PaginationParams};
use crate::validation::Validate;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

/// Slug candidates tried per copy before giving up
const MAX_DUPLICATE_SLUG_ATTEMPTS: usize = 20;

/// Trait defining workshop service operations
#[async_trait]
pub trait WorkshopService: Send + Sync {
    async fn create_workshop(&self, new_workshop: NewWorkshop) -> ServiceResult<WorkshopResponse>;

    /// Status may be edited by hand here. The derived `full` rule is applied
    /// again on every save.
    async fn update_workshop(&self, id: Uuid, update_data: UpdateWorkshop) -> ServiceResult<WorkshopResponse>;

    /// Removes the workshop together with its bookings and reviews
    async fn delete_workshop(&self, id: Uuid) -> ServiceResult<()>;

    async fn get_workshop(&self, slug: &str) -> ServiceResult<WorkshopResponse>;

    /// Catalog listing. Without `params` the configured page size is used.
    async fn list_workshops(
        &self,
        filter: WorkshopFilter,
        params: Option<PaginationParams>,
    ) -> ServiceResult<PaginatedResult<WorkshopResponse>>;

    async fn featured_workshops(&self, limit: Option<u32>) -> ServiceResult<Vec<WorkshopResponse>>;

    async fn related_workshops(&self, slug: &str, limit: Option<u32>) -> ServiceResult<Vec<WorkshopResponse>>;

    async fn duplicate_workshop(&self, id: Uuid) -> ServiceResult<Workshop>;

    async fn duplicate_workshops(&self, ids: &[Uuid]) -> ServiceResult<Vec<Workshop>>;

    async fn catalog_statistics(&self) -> ServiceResult<CatalogStatistics>;
}

#[derive(Clone)]
pub struct WorkshopServiceImpl {
    pool: SqlitePool,
    repo: Arc<dyn WorkshopRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    review_repo: Arc<dyn ReviewRepository>,
    booking_repo: Arc<dyn BookingRepository>,
    catalog: CatalogConfig,
}

impl WorkshopServiceImpl {
    pub fn new(
        pool: SqlitePool,
        repo: Arc<dyn WorkshopRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        review_repo: Arc<dyn ReviewRepository>,
        booking_repo: Arc<dyn BookingRepository>,
        catalog: CatalogConfig,
    ) -> Self {
        Self {
            pool,
            repo,
            category_repo,
            review_repo,
            booking_repo,
            catalog,
        }
    }

    /// Attach the read-time values (seats, category, rating) to a batch of
    /// workshops with one query per concern.
    async fn enrich_responses(&self, workshops: Vec<Workshop>) -> DomainResult<Vec<WorkshopResponse>> {
        if workshops.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = workshops.iter().map(|w| w.id).collect();
        let category_ids: Vec<Uuid> = workshops
            .iter()
            .filter_map(|w| w.category_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let confirmed = capacity::confirmed_totals(&self.pool, &ids).await?;
        let ratings = self.review_repo.rating_summaries(&ids).await?;
        let categories: HashMap<Uuid, CategorySummary> = self
            .category_repo
            .find_by_ids(&category_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, CategorySummary::from(c)))
            .collect();

        let now = Utc::now();
        Ok(workshops
            .into_iter()
            .map(|workshop| {
                let booked = confirmed.get(&workshop.id).copied().unwrap_or(0);
                let available = capacity::remaining_seats(workshop.max_participants, booked);
                let category = workshop.category_id.and_then(|id| categories.get(&id).cloned());
                let rating = ratings.get(&workshop.id).copied().unwrap_or_default();
                WorkshopResponse::new(workshop, available, category, rating, now)
            })
            .collect())
    }

    async fn enrich_response(&self, workshop: Workshop) -> DomainResult<WorkshopResponse> {
        let id = workshop.id;
        self.enrich_responses(vec![workshop])
            .await?
            .pop()
            .ok_or_else(|| DomainError::Internal(format!("Workshop {} lost while building response", id)))
    }

    async fn ensure_category_exists(&self, category_id: Option<Uuid>) -> DomainResult<()> {
        if let Some(id) = category_id {
            self.category_repo.find_by_id(id).await?;
        }
        Ok(())
    }

    async fn duplicate_one(&self, source: &Workshop, stamp: &str, index: Option<usize>) -> DomainResult<Workshop> {
        let shift = Duration::days(self.catalog.duplicate_shift_days);
        let mut suffix = index;

        for _ in 0..MAX_DUPLICATE_SLUG_ATTEMPTS {
            let draft = source.duplicate_draft(stamp, suffix, shift);
            if !self.repo.slug_exists(&draft.resolved_slug()).await? {
                draft.validate()?;
                let copy = self.repo.create(&draft).await?;
                log::info!("Duplicated workshop '{}' as '{}'", source.slug, copy.slug);
                return Ok(copy);
            }
            suffix = Some(suffix.map_or(1, |n| n + 1));
        }

        Err(DomainError::Internal(format!(
            "No free slug for a copy of '{}' after {} attempts",
            source.slug, MAX_DUPLICATE_SLUG_ATTEMPTS
        )))
    }
}

#[async_trait]
impl WorkshopService for WorkshopServiceImpl {
    async fn create_workshop(&self, new_workshop: NewWorkshop) -> ServiceResult<WorkshopResponse> {
        new_workshop.validate()?;
        self.ensure_category_exists(new_workshop.category_id).await?;

        let workshop = self.repo.create(&new_workshop).await?;
        log::info!("Created workshop '{}' ({})", workshop.slug, workshop.id);
        Ok(self.enrich_response(workshop).await?)
    }

    async fn update_workshop(&self, id: Uuid, update_data: UpdateWorkshop) -> ServiceResult<WorkshopResponse> {
        let current = self.repo.find_by_id(id).await?;
        update_data.validate_against(&current)?;
        if let Some(category_id) = update_data.category_id {
            self.ensure_category_exists(category_id).await?;
        }

        let workshop = self.repo.update(id, &update_data).await?;
        if workshop.status != current.status {
            log::info!("Workshop '{}' status {} -> {}", workshop.slug, current.status, workshop.status);
        }
        Ok(self.enrich_response(workshop).await?)
    }

    async fn delete_workshop(&self, id: Uuid) -> ServiceResult<()> {
        self.repo.hard_delete(id).await?;
        log::info!("Deleted workshop {} with its bookings and reviews", id);
        Ok(())
    }

    async fn get_workshop(&self, slug: &str) -> ServiceResult<WorkshopResponse> {
        let workshop = self.repo.find_by_slug(slug).await?;
        Ok(self.enrich_response(workshop).await?)
    }

    async fn list_workshops(
        &self,
        filter: WorkshopFilter,
        params: Option<PaginationParams>,
    ) -> ServiceResult<PaginatedResult<WorkshopResponse>> {
        let params = params
            .unwrap_or_else(|| PaginationParams::new(1, self.catalog.page_size))
            .normalized();

        let page = self.repo.find_all(&filter, params).await?;
        let total = page.total;
        let responses = self.enrich_responses(page.items).await?;
        Ok(PaginatedResult::new(responses, total, params))
    }

    async fn featured_workshops(&self, limit: Option<u32>) -> ServiceResult<Vec<WorkshopResponse>> {
        let workshops = self
            .repo
            .find_featured(limit.unwrap_or(self.catalog.featured_limit))
            .await?;
        Ok(self.enrich_responses(workshops).await?)
    }

    async fn related_workshops(&self, slug: &str, limit: Option<u32>) -> ServiceResult<Vec<WorkshopResponse>> {
        let workshop = self.repo.find_by_slug(slug).await?;
        let related = self
            .repo
            .find_related(&workshop, limit.unwrap_or(self.catalog.related_limit))
            .await?;
        Ok(self.enrich_responses(related).await?)
    }

    async fn duplicate_workshop(&self, id: Uuid) -> ServiceResult<Workshop> {
        let source = self.repo.find_by_id(id).await?;
        let stamp = Utc::now().format("%Y%m%d-%H%M%S").to_string();
        Ok(self.duplicate_one(&source, &stamp, None).await?)
    }

    async fn duplicate_workshops(&self, ids: &[Uuid]) -> ServiceResult<Vec<Workshop>> {
        let stamp = Utc::now().format("%Y%m%d-%H%M%S").to_string();
        let numbered = ids.len() > 1;

        let mut copies = Vec::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            let source = self.repo.find_by_id(*id).await?;
            let index = if numbered { Some(i + 1) } else { None };
            copies.push(self.duplicate_one(&source, &stamp, index).await?);
        }

        log::info!("Duplicated {} workshops", copies.len());
        Ok(copies)
    }

    async fn catalog_statistics(&self) -> ServiceResult<CatalogStatistics> {
        Ok(CatalogStatistics {
            active_workshops: self.repo.count_visible().await?,
            categories: self.category_repo.count().await?,
            instructors: self.repo.count_visible_instructors().await?,
            approved_reviews: self.review_repo.count_approved().await?,
            confirmed_bookings: self.booking_repo.count_confirmed().await?,
        })
    }
}

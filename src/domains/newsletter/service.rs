use crate::domains::core::repository::FindById;
use crate::domains::newsletter::repository::SubscriberRepository;
use crate::domains::newsletter::types::{Interests, Subscriber, SubscriberCsvRecord};
use crate::errors::{DomainError, ServiceResult};
use crate::types::{PaginatedResult, PaginationParams};
use crate::validation::{common, normalize, Validate};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Trait defining newsletter service operations
#[async_trait]
pub trait NewsletterService: Send + Sync {
    /// Subscribe an email address. Subscriptions are confirmed right away.
    /// An inactive subscriber with the same email is reactivated.
    async fn subscribe(&self, email: &str, first_name: Option<String>) -> ServiceResult<Subscriber>;

    async fn activate(&self, id: Uuid) -> ServiceResult<Subscriber>;

    async fn deactivate(&self, id: Uuid) -> ServiceResult<Subscriber>;

    async fn activate_subscribers(&self, ids: &[Uuid]) -> ServiceResult<u64>;

    async fn deactivate_subscribers(&self, ids: &[Uuid]) -> ServiceResult<u64>;

    async fn set_interests(&self, id: Uuid, interests: Vec<String>) -> ServiceResult<Subscriber>;

    async fn list_subscribers(
        &self,
        active_only: bool,
        params: PaginationParams,
    ) -> ServiceResult<PaginatedResult<Subscriber>>;

    async fn export_active_emails(&self) -> ServiceResult<Vec<String>>;

    /// Active subscribers as CSV with a header row
    async fn export_active_csv(&self) -> ServiceResult<Vec<u8>>;
}

#[derive(Clone)]
pub struct NewsletterServiceImpl {
    repo: Arc<dyn SubscriberRepository>,
}

impl NewsletterServiceImpl {
    pub fn new(repo: Arc<dyn SubscriberRepository>) -> Self {
        Self { repo }
    }

    async fn toggle(&self, id: Uuid, active: bool) -> ServiceResult<Subscriber> {
        let changed = self.repo.set_active(&[id], active).await?;
        let subscriber = self.repo.find_by_id(id).await?;
        if changed > 0 {
            log::info!(
                "Subscriber {} {}",
                subscriber.email,
                if active { "reactivated" } else { "unsubscribed" }
            );
        }
        Ok(subscriber)
    }
}

#[async_trait]
impl NewsletterService for NewsletterServiceImpl {
    async fn subscribe(&self, email: &str, first_name: Option<String>) -> ServiceResult<Subscriber> {
        let email = normalize::email(email);
        common::validate_email(&email, "email")?;
        let first_name = normalize::optional_text(first_name);

        match self.repo.upsert_active(&email, first_name.as_deref()).await? {
            Some(subscriber) => {
                log::info!("Newsletter subscription for {}", subscriber.email);
                Ok(subscriber)
            }
            None => {
                log::debug!("{} is already subscribed", email);
                Err(DomainError::AlreadySubscribed(email).into())
            }
        }
    }

    async fn activate(&self, id: Uuid) -> ServiceResult<Subscriber> {
        self.toggle(id, true).await
    }

    async fn deactivate(&self, id: Uuid) -> ServiceResult<Subscriber> {
        self.toggle(id, false).await
    }

    async fn activate_subscribers(&self, ids: &[Uuid]) -> ServiceResult<u64> {
        let changed = self.repo.set_active(ids, true).await?;
        log::info!("Activated {} of {} subscribers", changed, ids.len());
        Ok(changed)
    }

    async fn deactivate_subscribers(&self, ids: &[Uuid]) -> ServiceResult<u64> {
        let changed = self.repo.set_active(ids, false).await?;
        log::info!("Deactivated {} of {} subscribers", changed, ids.len());
        Ok(changed)
    }

    async fn set_interests(&self, id: Uuid, interests: Vec<String>) -> ServiceResult<Subscriber> {
        let interests = Interests::normalized(interests);
        interests.validate()?;
        Ok(self.repo.set_interests(id, &interests).await?)
    }

    async fn list_subscribers(
        &self,
        active_only: bool,
        params: PaginationParams,
    ) -> ServiceResult<PaginatedResult<Subscriber>> {
        Ok(self.repo.find_all(active_only, params.normalized()).await?)
    }

    async fn export_active_emails(&self) -> ServiceResult<Vec<String>> {
        let subscribers = self.repo.find_active().await?;
        Ok(subscribers.into_iter().map(|s| s.email).collect())
    }

    async fn export_active_csv(&self) -> ServiceResult<Vec<u8>> {
        let subscribers = self.repo.find_active().await?;

        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
        for subscriber in &subscribers {
            writer
                .serialize(SubscriberCsvRecord::from(subscriber))
                .map_err(|e| DomainError::Internal(format!("CSV export failed: {}", e)))?;
        }
        if subscribers.is_empty() {
            writer
                .write_record(["email", "first_name", "last_name", "subscribed_at", "interests"])
                .map_err(|e| DomainError::Internal(format!("CSV export failed: {}", e)))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| DomainError::Internal(format!("CSV export failed: {}", e)))?;
        log::info!("Exported {} active subscribers", subscribers.len());
        Ok(bytes)
    }
}

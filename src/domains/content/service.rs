use crate::domains::content::repository::ContentRepository;
use crate::domains::content::types::{
    validate_page_key, ContentPage, InhouseTrainingPage, UpdateInhouseTrainingPage,
};
use crate::errors::ServiceResult;
use crate::validation::Validate;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait defining static content operations
#[async_trait]
pub trait ContentService: Send + Sync {
    async fn get_page(&self, key: &str) -> ServiceResult<ContentPage>;

    async fn put_page(&self, key: &str, body: String) -> ServiceResult<ContentPage>;

    async fn inhouse_training_page(&self) -> ServiceResult<InhouseTrainingPage>;

    async fn update_inhouse_training_page(
        &self,
        update: UpdateInhouseTrainingPage,
    ) -> ServiceResult<InhouseTrainingPage>;
}

#[derive(Clone)]
pub struct ContentServiceImpl {
    repo: Arc<dyn ContentRepository>,
}

impl ContentServiceImpl {
    pub fn new(repo: Arc<dyn ContentRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl ContentService for ContentServiceImpl {
    async fn get_page(&self, key: &str) -> ServiceResult<ContentPage> {
        Ok(self.repo.find_page(key.trim()).await?)
    }

    async fn put_page(&self, key: &str, body: String) -> ServiceResult<ContentPage> {
        let key = key.trim();
        validate_page_key(key)?;
        let page = self.repo.upsert_page(key, &body).await?;
        log::info!("Saved content page '{}'", page.key);
        Ok(page)
    }

    async fn inhouse_training_page(&self) -> ServiceResult<InhouseTrainingPage> {
        Ok(self.repo.get_or_create_inhouse().await?)
    }

    async fn update_inhouse_training_page(
        &self,
        update: UpdateInhouseTrainingPage,
    ) -> ServiceResult<InhouseTrainingPage> {
        update.validate()?;
        let page = self.repo.update_inhouse(&update).await?;
        log::info!("Updated in-house training page");
        Ok(page)
    }
}

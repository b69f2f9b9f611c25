use crate::domains::category::repository::CategoryRepository;
use crate::domains::category::types::{Category, CategoryWithCount, NewCategory, UpdateCategory};
use crate::errors::ServiceResult;
use crate::validation::Validate;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Trait defining category service operations
#[async_trait]
pub trait CategoryService: Send + Sync {
    async fn create_category(&self, new_category: NewCategory) -> ServiceResult<Category>;

    async fn update_category(&self, id: Uuid, update_data: UpdateCategory) -> ServiceResult<Category>;

    /// Removes the category. Its workshops stay, uncategorised.
    async fn delete_category(&self, id: Uuid) -> ServiceResult<()>;

    async fn get_category_by_slug(&self, slug: &str) -> ServiceResult<Category>;

    async fn list_categories_with_counts(&self) -> ServiceResult<Vec<CategoryWithCount>>;
}

#[derive(Clone)]
pub struct CategoryServiceImpl {
    repo: Arc<dyn CategoryRepository>,
}

impl CategoryServiceImpl {
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl CategoryService for CategoryServiceImpl {
    async fn create_category(&self, new_category: NewCategory) -> ServiceResult<Category> {
        new_category.validate()?;
        let category = self.repo.create(&new_category).await?;
        log::info!("Created category '{}' ({})", category.name, category.slug);
        Ok(category)
    }

    async fn update_category(&self, id: Uuid, update_data: UpdateCategory) -> ServiceResult<Category> {
        update_data.validate()?;
        Ok(self.repo.update(id, &update_data).await?)
    }

    async fn delete_category(&self, id: Uuid) -> ServiceResult<()> {
        self.repo.hard_delete(id).await?;
        log::info!("Deleted category {}", id);
        Ok(())
    }

    async fn get_category_by_slug(&self, slug: &str) -> ServiceResult<Category> {
        Ok(self.repo.find_by_slug(slug).await?)
    }

    async fn list_categories_with_counts(&self) -> ServiceResult<Vec<CategoryWithCount>> {
        Ok(self.repo.find_all_with_counts().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::category::repository::SqliteCategoryRepository;
    use crate::domains::workshop::types::WorkshopStatus;
    use crate::errors::{DomainError, ServiceError, ValidationError};
    use crate::test_support::{insert_workshop, sample_workshop, TestDb};

    fn service(db: &TestDb) -> CategoryServiceImpl {
        CategoryServiceImpl::new(Arc::new(SqliteCategoryRepository::new(db.pool.clone())))
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_a_unique_error() {
        let db = TestDb::new().await;
        let svc = service(&db);

        svc.create_category(NewCategory { name: "AI Basics".into(), ..Default::default() })
            .await
            .unwrap();
        let err = svc
            .create_category(NewCategory {
                name: "AI basics (2)".into(),
                slug: Some("ai-basics".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();

        match err {
            ServiceError::Domain(DomainError::Validation(ValidationError::Unique { field })) => {
                assert_eq!(field, "slug")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_keeps_workshops() {
        let db = TestDb::new().await;
        let svc = service(&db);
        let category = svc
            .create_category(NewCategory { name: "Prompting".into(), ..Default::default() })
            .await
            .unwrap();

        let mut new = sample_workshop("prompting-101", 10);
        new.category_id = Some(category.id);
        let workshop = insert_workshop(&db, new).await;

        svc.delete_category(category.id).await.unwrap();

        let category_id: Option<String> =
            sqlx::query_scalar("SELECT category_id FROM workshops WHERE id = ?")
                .bind(workshop.id.to_string())
                .fetch_one(&db.pool)
                .await
                .unwrap();
        assert!(category_id.is_none());
        assert!(svc.get_category_by_slug("prompting").await.is_err());
    }

    #[tokio::test]
    async fn test_counts_only_visible_workshops() {
        let db = TestDb::new().await;
        let svc = service(&db);
        let category = svc
            .create_category(NewCategory { name: "Automation".into(), ..Default::default() })
            .await
            .unwrap();
        svc.create_category(NewCategory { name: "Agents".into(), ..Default::default() })
            .await
            .unwrap();

        for (slug, status, active) in [
            ("visible", WorkshopStatus::Upcoming, true),
            ("full-one", WorkshopStatus::Full, true),
            ("cancelled-one", WorkshopStatus::Cancelled, true),
            ("completed-one", WorkshopStatus::Completed, true),
            ("hidden", WorkshopStatus::Active, false),
        ] {
            let mut new = sample_workshop(slug, 10);
            new.category_id = Some(category.id);
            new.status = Some(status);
            new.is_active = Some(active);
            insert_workshop(&db, new).await;
        }

        let listed = svc.list_categories_with_counts().await.unwrap();
        let names: Vec<_> = listed.iter().map(|c| c.category.name.as_str()).collect();
        assert_eq!(names, vec!["Agents", "Automation"]);
        assert_eq!(listed[0].active_workshop_count, 0);
        assert_eq!(listed[1].active_workshop_count, 2);
    }
}

use crate::errors::DomainResult;
use crate::types::{parse_db_timestamp, parse_db_uuid};
use crate::validation::{common, normalize, Validate, ValidationBuilder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Icon tag used when none is given.
pub const DEFAULT_CATEGORY_ICON: &str = "bi-lightbulb";

const MAX_NAME_LENGTH: usize = 100;
const MAX_SLUG_LENGTH: usize = 100;
const MAX_ICON_LENGTH: usize = 50;

/// Category entity - groups workshops in the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon: String,
    pub created_at: DateTime<Utc>,
}

/// NewCategory DTO - used when creating a new category
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewCategory {
    pub name: String,
    /// Derived from the name when absent
    pub slug: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

impl NewCategory {
    pub fn resolved_slug(&self) -> String {
        match &self.slug {
            Some(slug) if !slug.trim().is_empty() => slug.trim().to_string(),
            _ => normalize::slugify(&self.name),
        }
    }

    pub fn resolved_icon(&self) -> String {
        self.icon
            .as_deref()
            .map(str::trim)
            .filter(|icon| !icon.is_empty())
            .unwrap_or(DEFAULT_CATEGORY_ICON)
            .to_string()
    }
}

impl Validate for NewCategory {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("name", Some(self.name.clone()))
            .not_blank()
            .max_length(MAX_NAME_LENGTH)
            .validate()?;

        common::validate_slug(&self.resolved_slug(), MAX_SLUG_LENGTH)?;

        ValidationBuilder::new("icon", Some(self.resolved_icon()))
            .max_length(MAX_ICON_LENGTH)
            .validate()
    }
}

/// UpdateCategory DTO - only the supplied fields change
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<Option<String>>,
    pub icon: Option<String>,
}

impl Validate for UpdateCategory {
    fn validate(&self) -> DomainResult<()> {
        if let Some(name) = &self.name {
            ValidationBuilder::new("name", Some(name.clone()))
                .not_blank()
                .max_length(MAX_NAME_LENGTH)
                .validate()?;
        }

        if let Some(slug) = &self.slug {
            common::validate_slug(slug, MAX_SLUG_LENGTH)?;
        }

        if let Some(icon) = &self.icon {
            ValidationBuilder::new("icon", Some(icon.clone()))
                .not_blank()
                .max_length(MAX_ICON_LENGTH)
                .validate()?;
        }

        Ok(())
    }
}

/// CategoryRow - SQLite row representation for mapping from database
#[derive(Debug, Clone, FromRow)]
pub struct CategoryRow {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon: String,
    pub created_at: String,
}

impl CategoryRow {
    /// Convert database row to domain entity
    pub fn into_entity(self) -> DomainResult<Category> {
        Ok(Category {
            id: parse_db_uuid(&self.id, "categories.id")?,
            name: self.name,
            slug: self.slug,
            description: self.description,
            icon: self.icon,
            created_at: parse_db_timestamp(&self.created_at, "categories.created_at")?,
        })
    }
}

/// Category plus the number of workshops a visitor can currently see in it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryWithCount {
    #[serde(flatten)]
    pub category: Category,
    pub active_workshop_count: i64,
}

/// Basic category summary for nested responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub icon: String,
}

impl From<Category> for CategorySummary {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            slug: category.slug,
            icon: category.icon,
        }
    }
}

use crate::errors::DomainResult;
use crate::types::parse_db_timestamp;
use crate::validation::{Validate, ValidationBuilder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const MAX_PAGE_KEY_LENGTH: usize = 50;

pub const DEFAULT_BANNER_TITLE: &str = "Op zoek naar opleidingen op maat voor jouw team?";
pub const DEFAULT_BANNER_DESCRIPTION: &str =
    "Ontdek onze inhouse trainingen: volledig aangepast aan de behoeften van jouw organisatie.";
pub const DEFAULT_BANNER_BUTTON_TEXT: &str = "Ontdek Inhouse Opleidingen";

/// Body used whenever the in-house training page is saved without content
pub const DEFAULT_INHOUSE_CONTENT: &str = r#"<div class="container mx-auto px-4 py-8">
    <h1 class="text-4xl font-bold mb-6">Inhouse Trainingen op Maat</h1>
    <p class="text-xl mb-8">Maatwerk opleidingen speciaal afgestemd op jouw organisatie.</p>
    <h2 class="text-2xl font-bold mb-4">Waarom kiezen voor inhouse training?</h2>
    <ul>
        <li>Op locatie of volledig online</li>
        <li>Inhoud afgestemd op jullie eigen processen en tools</li>
        <li>Flexibele planning voor het hele team</li>
    </ul>
</div>"#;

/// Free-form text page addressed by key (about, contact, privacy, ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentPage {
    pub key: String,
    pub body: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ContentPageRow {
    pub key: String,
    pub body: String,
    pub updated_at: String,
}

impl ContentPageRow {
    pub fn into_entity(self) -> DomainResult<ContentPage> {
        Ok(ContentPage {
            updated_at: parse_db_timestamp(&self.updated_at, "content_pages.updated_at")?,
            key: self.key,
            body: self.body,
        })
    }
}

/// Validates a page key before it is used for storage
pub fn validate_page_key(key: &str) -> DomainResult<()> {
    ValidationBuilder::new("key", Some(key.to_string()))
        .not_blank()
        .max_length(MAX_PAGE_KEY_LENGTH)
        .validate()
}

/// The single in-house training page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InhouseTrainingPage {
    pub content: String,
    pub banner_title: String,
    pub banner_description: String,
    pub banner_button_text: String,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateInhouseTrainingPage {
    pub content: Option<String>,
    pub banner_title: Option<String>,
    pub banner_description: Option<String>,
    pub banner_button_text: Option<String>,
    pub is_active: Option<bool>,
}

impl Validate for UpdateInhouseTrainingPage {
    fn validate(&self) -> DomainResult<()> {
        if let Some(title) = &self.banner_title {
            ValidationBuilder::new("banner_title", Some(title.clone()))
                .not_blank()
                .max_length(200)
                .validate()?;
        }

        if let Some(description) = &self.banner_description {
            ValidationBuilder::new("banner_description", Some(description.clone()))
                .not_blank()
                .validate()?;
        }

        if let Some(button) = &self.banner_button_text {
            ValidationBuilder::new("banner_button_text", Some(button.clone()))
                .not_blank()
                .max_length(100)
                .validate()?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct InhouseTrainingPageRow {
    pub content: String,
    pub banner_title: String,
    pub banner_description: String,
    pub banner_button_text: String,
    pub is_active: bool,
    pub updated_at: String,
}

impl InhouseTrainingPageRow {
    pub fn into_entity(self) -> DomainResult<InhouseTrainingPage> {
        Ok(InhouseTrainingPage {
            updated_at: parse_db_timestamp(&self.updated_at, "inhouse_training_page.updated_at")?,
            content: self.content,
            banner_title: self.banner_title,
            banner_description: self.banner_description,
            banner_button_text: self.banner_button_text,
            is_active: self.is_active,
        })
    }
}

/// Content as stored: blank bodies fall back to the default page
pub fn effective_content(content: &str) -> &str {
    if content.trim().is_empty() {
        DEFAULT_INHOUSE_CONTENT
    } else {
        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_key_validation() {
        assert!(validate_page_key("privacy").is_ok());
        assert!(validate_page_key("  ").is_err());
        assert!(validate_page_key(&"k".repeat(MAX_PAGE_KEY_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_effective_content() {
        assert_eq!(effective_content(""), DEFAULT_INHOUSE_CONTENT);
        assert_eq!(effective_content(" \n"), DEFAULT_INHOUSE_CONTENT);
        assert_eq!(effective_content("<p>Hi</p>"), "<p>Hi</p>");
    }

    #[test]
    fn test_update_rejects_blank_banner() {
        let update = UpdateInhouseTrainingPage {
            banner_title: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
        assert!(UpdateInhouseTrainingPage::default().validate().is_ok());
    }
}

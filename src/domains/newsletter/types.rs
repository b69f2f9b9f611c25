use crate::errors::{DomainError, DomainResult};
use crate::types::{parse_db_timestamp, parse_db_uuid, parse_optional_timestamp, to_db_timestamp};
use crate::validation::{Validate, ValidationBuilder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

const MAX_INTEREST_LENGTH: usize = 50;
const MAX_INTERESTS: usize = 20;

/// Newsletter subscriber. Emails are stored lower-cased and trimmed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscriber {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
    pub confirmed: bool,
    pub subscribed_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
    pub interests: Vec<String>,
}

/// Interest tags, trimmed, lower-cased and de-duplicated in input order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Interests(pub Vec<String>);

impl Interests {
    pub fn normalized(tags: Vec<String>) -> Self {
        let mut seen = Vec::with_capacity(tags.len());
        for tag in tags {
            let tag = tag.trim().to_lowercase();
            if !tag.is_empty() && !seen.contains(&tag) {
                seen.push(tag);
            }
        }
        Self(seen)
    }

    pub fn to_json(&self) -> DomainResult<String> {
        serde_json::to_string(&self.0)
            .map_err(|e| DomainError::Internal(format!("Failed to serialize interests: {}", e)))
    }
}

impl Validate for Interests {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("interests", Some(self.0.len() as i64))
            .max(MAX_INTERESTS as i64)
            .validate()?;

        for tag in &self.0 {
            ValidationBuilder::new("interests", Some(tag.clone()))
                .max_length(MAX_INTEREST_LENGTH)
                .validate()?;
        }
        Ok(())
    }
}

/// One line of the subscriber CSV export
#[derive(Debug, Serialize)]
pub struct SubscriberCsvRecord<'a> {
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub subscribed_at: String,
    pub interests: String,
}

impl<'a> From<&'a Subscriber> for SubscriberCsvRecord<'a> {
    fn from(subscriber: &'a Subscriber) -> Self {
        Self {
            email: &subscriber.email,
            first_name: subscriber.first_name.as_deref().unwrap_or(""),
            last_name: subscriber.last_name.as_deref().unwrap_or(""),
            subscribed_at: to_db_timestamp(&subscriber.subscribed_at),
            interests: subscriber.interests.join(";"),
        }
    }
}

/// SubscriberRow - SQLite row representation for mapping from database
#[derive(Debug, Clone, FromRow)]
pub struct SubscriberRow {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
    pub confirmed: bool,
    pub subscribed_at: String,
    pub unsubscribed_at: Option<String>,
    pub interests: Option<String>,
}

impl SubscriberRow {
    /// Convert database row to domain entity
    pub fn into_entity(self) -> DomainResult<Subscriber> {
        let interests = match self.interests.as_deref() {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw)
                .map_err(|e| DomainError::Internal(format!("Invalid interests JSON: {}", e)))?,
            _ => Vec::new(),
        };

        Ok(Subscriber {
            id: parse_db_uuid(&self.id, "newsletter_subscribers.id")?,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            is_active: self.is_active,
            confirmed: self.confirmed,
            subscribed_at: parse_db_timestamp(&self.subscribed_at, "newsletter_subscribers.subscribed_at")?,
            unsubscribed_at: parse_optional_timestamp(&self.unsubscribed_at, "newsletter_subscribers.unsubscribed_at")?,
            interests,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interests_normalized() {
        let interests = Interests::normalized(vec![
            " ChatGPT ".to_string(),
            "chatgpt".to_string(),
            "".to_string(),
            "Automation".to_string(),
        ]);
        assert_eq!(interests.0, vec!["chatgpt", "automation"]);
        assert_eq!(interests.to_json().unwrap(), r#"["chatgpt","automation"]"#);
        assert!(interests.validate().is_ok());

        let too_long = Interests::normalized(vec!["x".repeat(MAX_INTEREST_LENGTH + 1)]);
        assert!(too_long.validate().is_err());
    }
}

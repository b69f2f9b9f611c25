use crate::errors::{ValidationError, DomainResult, DomainError};
use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use std::sync::OnceLock;
use uuid::Uuid;

/// A trait that entities should implement for validation.
pub trait Validate {
    /// Validates the entity and returns an error if validation fails.
    fn validate(&self) -> DomainResult<()>;
}

// Common regex patterns
fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap())
}

fn phone_regex() -> &'static Regex {
    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    PHONE_REGEX.get_or_init(|| Regex::new(r"^\+?[0-9]{8,15}$").unwrap())
}

fn slug_regex() -> &'static Regex {
    static SLUG_REGEX: OnceLock<Regex> = OnceLock::new();
    SLUG_REGEX.get_or_init(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap())
}

fn url_regex() -> &'static Regex {
    static URL_REGEX: OnceLock<Regex> = OnceLock::new();
    URL_REGEX.get_or_init(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").unwrap())
}

/// Struct for configuring validations in a fluent style
#[derive(Default)]
pub struct ValidationBuilder<T> {
    field_name: String,
    value: Option<T>,
    errors: Vec<ValidationError>,
}

/// Generic validation implementations
impl<T> ValidationBuilder<T> {
    pub fn new(field_name: &str, value: Option<T>) -> Self {
        Self {
            field_name: field_name.to_string(),
            value,
            errors: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self
    where T: Default + PartialEq {
        if self.value.is_none() || self.value == Some(T::default()) {
            self.errors.push(ValidationError::required(&self.field_name));
        }
        self
    }

    /// Complete validation and return result
    pub fn validate(self) -> DomainResult<()> {
        match self.errors.into_iter().next() {
            None => Ok(()),
            // Return the first error for simplicity
            Some(first) => Err(DomainError::Validation(first)),
        }
    }
}

/// String-specific validations
impl ValidationBuilder<String> {
    /// Like `required`, but whitespace-only strings count as missing.
    pub fn not_blank(mut self) -> Self {
        if self.value.as_deref().map(str::trim).unwrap_or("").is_empty() {
            self.errors.push(ValidationError::required(&self.field_name));
        }
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        if let Some(value) = &self.value {
            if value.chars().count() > max {
                self.errors.push(ValidationError::max_length(&self.field_name, max));
            }
        }
        self
    }

    pub fn matches_pattern(mut self, pattern: &Regex, message: &str) -> Self {
        if let Some(value) = &self.value {
            if !pattern.is_match(value) {
                self.errors.push(ValidationError::format(&self.field_name, message));
            }
        }
        self
    }

    pub fn email(self) -> Self {
        self.matches_pattern(email_regex(), "must be a valid email address")
    }

    pub fn phone(self) -> Self {
        self.matches_pattern(phone_regex(), "must be a valid phone number")
    }

    pub fn slug(self) -> Self {
        self.matches_pattern(slug_regex(), "may only contain lowercase letters, digits and single hyphens")
    }

    pub fn url(self) -> Self {
        self.matches_pattern(url_regex(), "must be a valid http(s) URL")
    }
}

/// Numeric validations
impl<T> ValidationBuilder<T>
where T: PartialOrd + Clone + std::fmt::Display
{
    pub fn min(mut self, min: T) -> Self {
        if let Some(value) = &self.value {
            if value < &min {
                self.errors.push(ValidationError::range(
                    &self.field_name,
                    min.to_string(),
                    "maximum".to_string()
                ));
            }
        }
        self
    }

    pub fn max(mut self, max: T) -> Self {
        if let Some(value) = &self.value {
            if value > &max {
                self.errors.push(ValidationError::range(
                    &self.field_name,
                    "minimum".to_string(),
                    max.to_string()
                ));
            }
        }
        self
    }

    pub fn range(mut self, min: T, max: T) -> Self {
        if let Some(value) = &self.value {
            if value < &min || value > &max {
                self.errors.push(ValidationError::range(
                    &self.field_name,
                    min.to_string(),
                    max.to_string()
                ));
            }
        }
        self
    }
}

/// Decimal validations
impl ValidationBuilder<Decimal> {
    pub fn non_negative(mut self) -> Self {
        if let Some(value) = &self.value {
            if value.is_sign_negative() && !value.is_zero() {
                self.errors.push(ValidationError::invalid_value(&self.field_name, "must be non-negative"));
            }
        }
        self
    }

    pub fn max_decimal_places(mut self, places: u32) -> Self {
        if let Some(value) = &self.value {
            if value.normalize().scale() > places {
                self.errors.push(ValidationError::invalid_value(
                    &self.field_name,
                    &format!("cannot have more than {} decimal places", places),
                ));
            }
        }
        self
    }
}

/// DateTime validation helpers
impl ValidationBuilder<DateTime<Utc>> {
    pub fn after(mut self, date: DateTime<Utc>) -> Self {
        if let Some(value) = &self.value {
            if value <= &date {
                self.errors.push(ValidationError::invalid_value(
                    &self.field_name,
                    &format!("must be after {}", date.to_rfc3339())
                ));
            }
        }
        self
    }
}

/// UUID validation helpers
impl ValidationBuilder<Uuid> {
    pub fn not_nil(mut self) -> Self {
        if let Some(value) = &self.value {
            if *value == Uuid::nil() {
                self.errors.push(ValidationError::invalid_value(
                    &self.field_name,
                    "cannot be a nil UUID"
                ));
            }
        }
        self
    }
}

/// Input normalisation shared by the booking and newsletter flows.
pub mod normalize {
    /// Lowercase and trim an email address.
    pub fn email(raw: &str) -> String {
        raw.trim().to_lowercase()
    }

    /// Strip spaces and dashes from a phone number.
    pub fn phone(raw: &str) -> String {
        raw.trim().chars().filter(|c| *c != ' ' && *c != '-').collect()
    }

    /// Turn a free-form title into a URL-safe slug.
    pub fn slugify(raw: &str) -> String {
        let mut slug = String::with_capacity(raw.len());
        let mut pending_dash = false;
        for c in raw.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(c.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }
        slug
    }

    /// Treat blank optional strings as absent.
    pub fn optional_text(value: Option<String>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
        })
    }
}

pub mod common {
    use super::*;

    pub fn validate_email(email: &str, field_name: &str) -> DomainResult<()> {
        ValidationBuilder::new(field_name, Some(email.to_string()))
            .not_blank()
            .max_length(254)
            .email()
            .validate()
    }

    pub fn validate_slug(slug: &str, max: usize) -> DomainResult<()> {
        ValidationBuilder::new("slug", Some(slug.to_string()))
            .not_blank()
            .max_length(max)
            .slug()
            .validate()
    }

    pub fn validate_price(price: Decimal, field_name: &str) -> DomainResult<()> {
        ValidationBuilder::new(field_name, Some(price))
            .non_negative()
            .max_decimal_places(2)
            .validate()
    }
}

// Test module with comprehensive validation tests
#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_email_validation() {
        assert!(email_regex().is_match("user@example.com"));
        assert!(email_regex().is_match("user.name+tag@example.co.uk"));
        assert!(!email_regex().is_match("user@"));
        assert!(!email_regex().is_match("@example.com"));
        assert!(!email_regex().is_match("user@example"));
    }

    #[test]
    fn test_phone_validation() {
        assert!(phone_regex().is_match("0123456789"));
        assert!(phone_regex().is_match("+32123456789"));
        assert!(!phone_regex().is_match("123"));
        assert!(!phone_regex().is_match("+32 123 45 67 89"));
    }

    #[test]
    fn test_slug_validation() {
        assert!(common::validate_slug("intro-to-ai", 200).is_ok());
        assert!(common::validate_slug("Intro To AI", 200).is_err());
        assert!(common::validate_slug("double--dash", 200).is_err());
        assert!(common::validate_slug("", 200).is_err());
    }

    #[test]
    fn test_normalization() {
        assert_eq!(normalize::email("  Jan.Janssens@Email.COM "), "jan.janssens@email.com");
        assert_eq!(normalize::phone("+32 123-45 67 89"), "+32123456789");
        assert_eq!(normalize::slugify("AI for Teams: Part 2!"), "ai-for-teams-part-2");
        assert_eq!(normalize::optional_text(Some("   ".to_string())), None);
    }

    #[test]
    fn test_price_validation() {
        assert!(common::validate_price(dec!(49.99), "price").is_ok());
        assert!(common::validate_price(dec!(0), "price").is_ok());
        assert!(common::validate_price(dec!(-1), "price").is_err());
        assert!(common::validate_price(dec!(1.999), "price").is_err());
        assert!(common::validate_price(dec!(10.500), "price").is_ok());
    }

    #[test]
    fn test_validation_builder() {
        let result = ValidationBuilder::new("name", Some("".to_string()))
            .required()
            .validate();
        assert!(result.is_err());

        let result = ValidationBuilder::new("name", Some("   ".to_string()))
            .not_blank()
            .validate();
        assert!(result.is_err());

        let result = ValidationBuilder::new("participants", Some(11))
            .range(1, 10)
            .validate();
        assert!(result.is_err());

        let result = ValidationBuilder::new("participants", Some(4))
            .range(1, 10)
            .validate();
        assert!(result.is_ok());

        let value: Option<String> = None;
        let result = ValidationBuilder::new("name", value)
            .required()
            .validate();
        assert!(result.is_err());
    }
}

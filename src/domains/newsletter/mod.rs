pub mod types;
pub mod repository;
pub mod service;

pub use types::{Interests, Subscriber, SubscriberRow};
pub use repository::{SqliteSubscriberRepository, SubscriberRepository};
pub use service::{NewsletterService, NewsletterServiceImpl};

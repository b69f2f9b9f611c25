pub mod types;
pub mod repository;
pub mod service;

pub use types::{NewReview, RatingSummary, Review, ReviewRow};
pub use repository::{ReviewRepository, SqliteReviewRepository};
pub use service::{ReviewService, ReviewServiceImpl};

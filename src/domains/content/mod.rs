pub mod types;
pub mod repository;
pub mod service;

pub use types::{ContentPage, InhouseTrainingPage, UpdateInhouseTrainingPage};
pub use repository::{ContentRepository, SqliteContentRepository};
pub use service::{ContentService, ContentServiceImpl};

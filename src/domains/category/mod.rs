pub mod types;
pub mod repository;
pub mod service;

pub use types::{
    Category, NewCategory, UpdateCategory, CategoryWithCount, CategorySummary, CategoryRow,
};
pub use repository::{CategoryRepository, SqliteCategoryRepository};
pub use service::{CategoryService, CategoryServiceImpl};

pub mod repository;

// Re-export the TRAITS, not specific implementations
pub use repository::{FindById, HardDeletable};

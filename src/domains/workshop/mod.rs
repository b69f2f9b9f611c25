pub mod types;
pub mod capacity;
pub mod repository;
pub mod service;

pub use types::{
    CatalogStatistics, MeetingInfo, NewWorkshop, UpdateWorkshop, Workshop, WorkshopFilter,
    WorkshopResponse, WorkshopRow, WorkshopSort, WorkshopStatus,
};
pub use repository::{SqliteWorkshopRepository, WorkshopRepository};
pub use service::{WorkshopService, WorkshopServiceImpl};

pub mod booking;
pub mod category;
pub mod content;
pub mod core;
pub mod newsletter;
pub mod review;
pub mod workshop;

pub use booking::{Booking, BookingService, BookingStatus};
pub use category::{Category, CategoryService};
pub use newsletter::{NewsletterService, Subscriber};
pub use review::{Review, ReviewService};
pub use workshop::{Workshop, WorkshopService, WorkshopStatus};

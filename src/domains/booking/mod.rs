pub mod types;
pub mod repository;
pub mod service;

pub use types::{
    Booking, BookingInsert, BookingRow, BookingStatus, ContactInfo, NewBooking, PaymentStatus,
    MAX_PARTICIPANTS_PER_BOOKING,
};
pub use repository::{BookingRepository, SqliteBookingRepository};
pub use service::{BookingService, BookingServiceImpl, BulkOutcome};

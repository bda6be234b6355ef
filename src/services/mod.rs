pub mod booking_service;
pub mod catalog_service;

pub use booking_service::{BookingService, CheckoutSummary};
pub use catalog_service::{CatalogService, SearchFilter};

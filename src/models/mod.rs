pub mod booking;
pub mod cart;
pub mod course;
pub mod schedule;

pub use booking::{Booking, BookingDetails};
pub use cart::CartEntry;
pub use course::Course;
pub use schedule::Schedule;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Course, Schedule};

/// A committed booking linking a user to a schedule. Bookings are only ever
/// appended and later flagged cancelled, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Store-assigned push id, filled in from the record key after a read.
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub user_email: String,
    pub schedule_id: i64,
    #[serde(default)]
    pub course_id: i64,
    /// RFC3339 creation timestamp.
    pub booking_date: String,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub cancelled_at: Option<String>,
    /// Commit token of the checkout that wrote this booking.
    #[serde(default)]
    pub checkout_id: Option<Uuid>,
}

/// A booking joined to its schedule and course for history views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub schedule: Schedule,
    pub course: Course,
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Collection queries come back as a map keyed by record id, or JSON null
/// when nothing matches.
pub type QueryResponse<T> = Option<BTreeMap<String, T>>;

/// Response to an append; `name` is the generated record id.
#[derive(Debug, Deserialize)]
pub struct PushResponse {
    pub name: String,
}

/// Booking record as written at checkout. The store assigns the id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub user_id: String,
    pub user_email: String,
    pub schedule_id: i64,
    pub course_id: i64,
    pub booking_date: String,
    pub checkout_id: Uuid,
}

/// Field-level update flipping a booking to cancelled.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationPatch {
    pub cancelled: bool,
    pub cancelled_at: String,
}

/// Field-level update of a schedule's enrollment counter.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentPatch {
    pub current_enrollment: u32,
}

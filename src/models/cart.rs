use serde::{Deserialize, Serialize};

use super::{Course, Schedule};

/// A selected (course, schedule) pair staged for checkout. Entries hold
/// snapshots taken at selection time; availability is re-checked against the
/// remote store when the booking is committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartEntry {
    pub course: Course,
    pub schedule: Schedule,
}

use serde::{Deserialize, Serialize};

/// One dated occurrence of a course. The enrollment counter is the only
/// field this service ever writes, and only through booking/cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(default)]
    pub id: i64,
    /// Class date, "YYYY-MM-DD".
    pub date: String,
    pub teacher: String,
    #[serde(default)]
    pub comments: Option<String>,
    pub yoga_course_id: i64,
    pub current_enrollment: u32,
    #[serde(default)]
    pub is_cancelled: bool,
}

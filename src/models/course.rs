use serde::{Deserialize, Serialize};

/// A weekly recurring class definition. Courses are administered by an
/// external back-office process; this service only ever reads them.
///
/// Field names follow the stored camelCase shapes so a record round-trips
/// unchanged through the remote store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    /// Record key in the remote store; absent inside the stored value and
    /// filled in from the key after a read.
    #[serde(default)]
    pub id: i64,
    pub day_of_week: String,
    /// Time of day the class starts, "HH:MM".
    pub time: String,
    pub price: f64,
    pub capacity: u32,
    /// Class length in minutes.
    pub duration: u32,
    #[serde(rename = "type")]
    pub course_type: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub equipment: Option<String>,
}

pub mod dto;

use std::collections::BTreeMap;
use std::env;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::AppError;
use crate::models::{Booking, Course, Schedule};
use self::dto::{CancellationPatch, EnrollmentPatch, NewBooking, PushResponse, QueryResponse};

#[derive(Clone, Debug)]
pub struct FirebaseConfig {
    pub database_url: String,
    pub auth_token: Option<String>,
}

impl FirebaseConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let database_url = env::var("FIREBASE_DATABASE_URL")
            .map_err(|_| AppError::BadRequest("FIREBASE_DATABASE_URL is not set".to_string()))?;
        let auth_token = env::var("FIREBASE_AUTH_TOKEN").ok();

        Ok(Self {
            database_url,
            auth_token,
        })
    }
}

/// Outcome of the guarded enrollment increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentUpdate {
    /// Seat reserved; carries the new enrollment count.
    Updated(u32),
    /// Enrollment already at or above capacity, nothing written.
    Full,
    /// The schedule record no longer exists.
    Gone,
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn active_courses(&self) -> Result<Vec<Course>, AppError>;
    async fn courses_by_day(&self, day_of_week: &str) -> Result<Vec<Course>, AppError>;
    async fn course(&self, course_id: i64) -> Result<Option<Course>, AppError>;
    async fn schedules_for_course(&self, course_id: i64) -> Result<Vec<Schedule>, AppError>;
    async fn schedule(&self, schedule_id: i64) -> Result<Option<Schedule>, AppError>;
    async fn push_booking(&self, booking: &NewBooking) -> Result<String, AppError>;
    async fn bookings_for_user(&self, user_id: &str) -> Result<Vec<Booking>, AppError>;
    /// Atomically bump the enrollment counter iff it is still below
    /// `capacity`. The capacity check and the write happen as one unit.
    async fn increment_enrollment_if_below(
        &self,
        schedule_id: i64,
        capacity: u32,
    ) -> Result<EnrollmentUpdate, AppError>;
    async fn set_enrollment(&self, schedule_id: i64, current_enrollment: u32) -> Result<(), AppError>;
    async fn mark_booking_cancelled(&self, booking_id: &str, cancelled_at: &str) -> Result<(), AppError>;
}

pub struct FirebaseRestClient {
    client: Client,
    config: FirebaseConfig,
}

/// Bounded optimistic retries for the ETag-guarded enrollment update.
const ENROLLMENT_RETRY_ATTEMPTS: u32 = 3;

impl FirebaseRestClient {
    pub fn new(config: FirebaseConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Remote(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.config.database_url.trim_end_matches('/'), path)
    }

    fn auth_query(&self) -> Vec<(String, String)> {
        match &self.config.auth_token {
            Some(token) => vec![("auth".to_string(), token.clone())],
            None => Vec::new(),
        }
    }

    /// Equality-filtered collection query. `orderBy`/`equalTo` take
    /// JSON-literal values, quotes included for strings.
    async fn query_collection<T: DeserializeOwned>(
        &self,
        collection: &str,
        order_by: &str,
        equal_to: serde_json::Value,
    ) -> Result<BTreeMap<String, T>, AppError> {
        let mut query = self.auth_query();
        query.push(("orderBy".to_string(), format!("\"{}\"", order_by)));
        query.push(("equalTo".to_string(), equal_to.to_string()));

        let response = self
            .client
            .get(self.url(collection))
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::Remote(format!("Firebase request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Remote(format!("Firebase error {}: {}", status, body)));
        }

        let records: QueryResponse<T> = response
            .json()
            .await
            .map_err(|e| AppError::Remote(format!("Failed to parse Firebase response: {}", e)))?;

        Ok(records.unwrap_or_default())
    }

    /// Point read; a stored null means the record is absent.
    async fn read_record<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, AppError> {
        let response = self
            .client
            .get(self.url(path))
            .query(&self.auth_query())
            .send()
            .await
            .map_err(|e| AppError::Remote(format!("Firebase request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Remote(format!("Firebase error {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Remote(format!("Failed to parse Firebase response: {}", e)))
    }

    async fn patch_record<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<(), AppError> {
        let response = self
            .client
            .patch(self.url(path))
            .query(&self.auth_query())
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Remote(format!("Firebase request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Remote(format!("Firebase error {}: {}", status, body)));
        }

        Ok(())
    }
}

fn parse_key(key: &str) -> i64 {
    key.parse().unwrap_or_default()
}

#[async_trait]
impl RemoteStore for FirebaseRestClient {
    async fn active_courses(&self) -> Result<Vec<Course>, AppError> {
        let records = self
            .query_collection::<Course>("courses", "isActive", serde_json::Value::Bool(true))
            .await?;

        Ok(records
            .into_iter()
            .map(|(key, mut course)| {
                course.id = parse_key(&key);
                course
            })
            .collect())
    }

    async fn courses_by_day(&self, day_of_week: &str) -> Result<Vec<Course>, AppError> {
        let records = self
            .query_collection::<Course>(
                "courses",
                "dayOfWeek",
                serde_json::Value::String(day_of_week.to_string()),
            )
            .await?;

        Ok(records
            .into_iter()
            .map(|(key, mut course)| {
                course.id = parse_key(&key);
                course
            })
            .collect())
    }

    async fn course(&self, course_id: i64) -> Result<Option<Course>, AppError> {
        let course = self
            .read_record::<Course>(&format!("courses/{}", course_id))
            .await?;

        Ok(course.map(|mut c| {
            c.id = course_id;
            c
        }))
    }

    async fn schedules_for_course(&self, course_id: i64) -> Result<Vec<Schedule>, AppError> {
        let records = self
            .query_collection::<Schedule>("schedules", "yogaCourseId", serde_json::json!(course_id))
            .await?;

        Ok(records
            .into_iter()
            .map(|(key, mut schedule)| {
                schedule.id = parse_key(&key);
                schedule
            })
            .collect())
    }

    async fn schedule(&self, schedule_id: i64) -> Result<Option<Schedule>, AppError> {
        let schedule = self
            .read_record::<Schedule>(&format!("schedules/{}", schedule_id))
            .await?;

        Ok(schedule.map(|mut s| {
            s.id = schedule_id;
            s
        }))
    }

    async fn push_booking(&self, booking: &NewBooking) -> Result<String, AppError> {
        let response = self
            .client
            .post(self.url("bookings"))
            .query(&self.auth_query())
            .json(booking)
            .send()
            .await
            .map_err(|e| AppError::Remote(format!("Firebase request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Remote(format!("Failed to create booking: {} {}", status, body)));
        }

        let created: PushResponse = response
            .json()
            .await
            .map_err(|e| AppError::Remote(format!("Failed to parse Firebase response: {}", e)))?;

        Ok(created.name)
    }

    async fn bookings_for_user(&self, user_id: &str) -> Result<Vec<Booking>, AppError> {
        let records = self
            .query_collection::<Booking>(
                "bookings",
                "userId",
                serde_json::Value::String(user_id.to_string()),
            )
            .await?;

        Ok(records
            .into_iter()
            .map(|(key, mut booking)| {
                booking.id = key;
                booking
            })
            .collect())
    }

    async fn increment_enrollment_if_below(
        &self,
        schedule_id: i64,
        capacity: u32,
    ) -> Result<EnrollmentUpdate, AppError> {
        let path = format!("schedules/{}/currentEnrollment", schedule_id);

        for attempt in 1..=ENROLLMENT_RETRY_ATTEMPTS {
            let response = self
                .client
                .get(self.url(&path))
                .query(&self.auth_query())
                .header("X-Firebase-ETag", "true")
                .send()
                .await
                .map_err(|e| AppError::Remote(format!("Firebase request failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::Remote(format!("Firebase error {}: {}", status, body)));
            }

            let etag = response
                .headers()
                .get("ETag")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
                .ok_or_else(|| AppError::Remote("Firebase response missing ETag".to_string()))?;

            let current: Option<u32> = response
                .json()
                .await
                .map_err(|e| AppError::Remote(format!("Failed to parse Firebase response: {}", e)))?;

            let Some(current) = current else {
                return Ok(EnrollmentUpdate::Gone);
            };
            if current >= capacity {
                return Ok(EnrollmentUpdate::Full);
            }

            let put = self
                .client
                .put(self.url(&path))
                .query(&self.auth_query())
                .header("if-match", etag)
                .json(&(current + 1))
                .send()
                .await
                .map_err(|e| AppError::Remote(format!("Firebase request failed: {}", e)))?;

            if put.status() == StatusCode::PRECONDITION_FAILED {
                // Lost the race; re-read and try again.
                debug!(
                    "Enrollment write for schedule {} contended (attempt {}/{})",
                    schedule_id, attempt, ENROLLMENT_RETRY_ATTEMPTS
                );
                continue;
            }
            if !put.status().is_success() {
                let status = put.status();
                let body = put.text().await.unwrap_or_default();
                return Err(AppError::Remote(format!("Firebase error {}: {}", status, body)));
            }

            return Ok(EnrollmentUpdate::Updated(current + 1));
        }

        Err(AppError::Remote(format!(
            "Enrollment update for schedule {} still contended after {} attempts",
            schedule_id, ENROLLMENT_RETRY_ATTEMPTS
        )))
    }

    async fn set_enrollment(&self, schedule_id: i64, current_enrollment: u32) -> Result<(), AppError> {
        self.patch_record(
            &format!("schedules/{}", schedule_id),
            &EnrollmentPatch { current_enrollment },
        )
        .await
    }

    async fn mark_booking_cancelled(&self, booking_id: &str, cancelled_at: &str) -> Result<(), AppError> {
        self.patch_record(
            &format!("bookings/{}", booking_id),
            &CancellationPatch {
                cancelled: true,
                cancelled_at: cancelled_at.to_string(),
            },
        )
        .await
    }
}

/// In-memory store with the same contract, for tests and offline runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    courses: BTreeMap<i64, Course>,
    schedules: BTreeMap<i64, Schedule>,
    bookings: BTreeMap<String, Booking>,
    next_booking: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_course(&self, course: Course) {
        self.inner.lock().unwrap().courses.insert(course.id, course);
    }

    pub fn insert_schedule(&self, schedule: Schedule) {
        self.inner.lock().unwrap().schedules.insert(schedule.id, schedule);
    }

    pub fn insert_booking(&self, booking: Booking) {
        self.inner.lock().unwrap().bookings.insert(booking.id.clone(), booking);
    }

    pub fn booking(&self, booking_id: &str) -> Option<Booking> {
        self.inner.lock().unwrap().bookings.get(booking_id).cloned()
    }

    pub fn bookings(&self) -> Vec<Booking> {
        self.inner.lock().unwrap().bookings.values().cloned().collect()
    }

    pub fn enrollment(&self, schedule_id: i64) -> Option<u32> {
        self.inner
            .lock()
            .unwrap()
            .schedules
            .get(&schedule_id)
            .map(|s| s.current_enrollment)
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn active_courses(&self) -> Result<Vec<Course>, AppError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .courses
            .values()
            .filter(|c| c.is_active)
            .cloned()
            .collect())
    }

    async fn courses_by_day(&self, day_of_week: &str) -> Result<Vec<Course>, AppError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .courses
            .values()
            .filter(|c| c.day_of_week == day_of_week)
            .cloned()
            .collect())
    }

    async fn course(&self, course_id: i64) -> Result<Option<Course>, AppError> {
        Ok(self.inner.lock().unwrap().courses.get(&course_id).cloned())
    }

    async fn schedules_for_course(&self, course_id: i64) -> Result<Vec<Schedule>, AppError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .schedules
            .values()
            .filter(|s| s.yoga_course_id == course_id)
            .cloned()
            .collect())
    }

    async fn schedule(&self, schedule_id: i64) -> Result<Option<Schedule>, AppError> {
        Ok(self.inner.lock().unwrap().schedules.get(&schedule_id).cloned())
    }

    async fn push_booking(&self, booking: &NewBooking) -> Result<String, AppError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_booking += 1;
        let id = format!("-B{:06}", inner.next_booking);

        inner.bookings.insert(
            id.clone(),
            Booking {
                id: id.clone(),
                user_id: booking.user_id.clone(),
                user_email: booking.user_email.clone(),
                schedule_id: booking.schedule_id,
                course_id: booking.course_id,
                booking_date: booking.booking_date.clone(),
                cancelled: false,
                cancelled_at: None,
                checkout_id: Some(booking.checkout_id),
            },
        );

        Ok(id)
    }

    async fn bookings_for_user(&self, user_id: &str) -> Result<Vec<Booking>, AppError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn increment_enrollment_if_below(
        &self,
        schedule_id: i64,
        capacity: u32,
    ) -> Result<EnrollmentUpdate, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(schedule) = inner.schedules.get_mut(&schedule_id) else {
            return Ok(EnrollmentUpdate::Gone);
        };
        if schedule.current_enrollment >= capacity {
            return Ok(EnrollmentUpdate::Full);
        }
        schedule.current_enrollment += 1;
        Ok(EnrollmentUpdate::Updated(schedule.current_enrollment))
    }

    async fn set_enrollment(&self, schedule_id: i64, current_enrollment: u32) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(schedule) = inner.schedules.get_mut(&schedule_id) else {
            return Err(AppError::NotFound);
        };
        schedule.current_enrollment = current_enrollment;
        Ok(())
    }

    async fn mark_booking_cancelled(&self, booking_id: &str, cancelled_at: &str) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(booking) = inner.bookings.get_mut(booking_id) else {
            return Err(AppError::NotFound);
        };
        booking.cancelled = true;
        booking.cancelled_at = Some(cancelled_at.to_string());
        Ok(())
    }
}

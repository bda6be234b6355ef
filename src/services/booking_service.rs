use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Identity;
use crate::db::cart_store;
use crate::error::AppError;
use crate::firebase::dto::NewBooking;
use crate::firebase::{EnrollmentUpdate, RemoteStore};
use crate::models::{BookingDetails, Schedule};

/// Commits staged cart entries as bookings and serves booking history.
pub struct BookingService {
    db: SqlitePool,
    store: Arc<dyn RemoteStore>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSummary {
    pub checkout_id: Uuid,
    pub booked: usize,
    pub booking_ids: Vec<String>,
    pub total_price: f64,
}

/// A booking counts as upcoming while its class date is still ahead and the
/// occurrence has not been called off. Everything else, unparseable dates
/// included, is past.
pub fn is_upcoming(schedule: &Schedule, today: NaiveDate) -> bool {
    match NaiveDate::parse_from_str(&schedule.date, "%Y-%m-%d") {
        Ok(date) => date > today && !schedule.is_cancelled,
        Err(_) => false,
    }
}

impl BookingService {
    pub fn new(db: SqlitePool, store: Arc<dyn RemoteStore>) -> Self {
        Self { db, store }
    }

    /// Commit every staged entry, one at a time in cart order. Each entry is
    /// re-validated against the authoritative schedule record before its
    /// seat is reserved and its booking appended. A failure stops the
    /// sequence; earlier commits stay in place and the cart is kept so the
    /// user can retry what remains.
    pub async fn checkout(&self, identity: Option<&Identity>) -> Result<CheckoutSummary, AppError> {
        let identity = identity.ok_or(AppError::NotAuthenticated)?;

        let entries = cart_store::cart_entries(&self.db).await;
        let total_price = cart_store::cart_total(&entries);
        let checkout_id = Uuid::new_v4();

        info!(
            "Starting checkout {} for {} ({} entries)",
            checkout_id,
            identity.user_id,
            entries.len()
        );

        let mut booking_ids = Vec::with_capacity(entries.len());

        for entry in &entries {
            let schedule = self
                .store
                .schedule(entry.schedule.id)
                .await?
                .ok_or_else(|| AppError::ScheduleGone(entry.course.course_type.clone()))?;

            match self
                .store
                .increment_enrollment_if_below(schedule.id, entry.course.capacity)
                .await?
            {
                EnrollmentUpdate::Updated(enrollment) => {
                    info!(
                        "Checkout {}: reserved seat {}/{} on schedule {}",
                        checkout_id, enrollment, entry.course.capacity, schedule.id
                    );
                }
                EnrollmentUpdate::Full => {
                    return Err(AppError::CapacityExceeded(entry.course.course_type.clone()));
                }
                EnrollmentUpdate::Gone => {
                    return Err(AppError::ScheduleGone(entry.course.course_type.clone()));
                }
            }

            let booking = NewBooking {
                user_id: identity.user_id.clone(),
                user_email: identity.email.clone(),
                schedule_id: entry.schedule.id,
                course_id: entry.course.id,
                booking_date: Utc::now().to_rfc3339(),
                checkout_id,
            };
            booking_ids.push(self.store.push_booking(&booking).await?);
        }

        cart_store::clear_cart(&self.db).await;
        info!(
            "Checkout {} completed: {} bookings",
            checkout_id,
            booking_ids.len()
        );

        Ok(CheckoutSummary {
            checkout_id,
            booked: booking_ids.len(),
            booking_ids,
            total_price,
        })
    }

    /// Release one seat and flag the booking cancelled. Both writes go out
    /// together; nothing ties them into a transaction.
    pub async fn cancel(&self, booking_id: &str, schedule_id: i64) -> Result<(), AppError> {
        let schedule = self
            .store
            .schedule(schedule_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let decremented = schedule.current_enrollment.saturating_sub(1);
        let cancelled_at = Utc::now().to_rfc3339();

        tokio::try_join!(
            self.store.set_enrollment(schedule_id, decremented),
            self.store.mark_booking_cancelled(booking_id, &cancelled_at),
        )?;

        info!("Cancelled booking {} on schedule {}", booking_id, schedule_id);
        Ok(())
    }

    /// The user's bookings joined to their schedules and courses, most
    /// recent class first. Rows whose schedule or course has vanished are
    /// skipped.
    pub async fn user_bookings(&self, identity: &Identity) -> Result<Vec<BookingDetails>, AppError> {
        let bookings = self.store.bookings_for_user(&identity.user_id).await?;
        let mut detailed = Vec::with_capacity(bookings.len());

        for booking in bookings {
            let Some(schedule) = self.store.schedule(booking.schedule_id).await? else {
                warn!(
                    "Skipping booking {}: schedule {} no longer exists",
                    booking.id, booking.schedule_id
                );
                continue;
            };
            let Some(course) = self.store.course(schedule.yoga_course_id).await? else {
                warn!(
                    "Skipping booking {}: course {} no longer exists",
                    booking.id, schedule.yoga_course_id
                );
                continue;
            };
            detailed.push(BookingDetails {
                booking,
                schedule,
                course,
            });
        }

        detailed.sort_by(|a, b| b.schedule.date.cmp(&a.schedule.date));
        Ok(detailed)
    }

    pub async fn upcoming_bookings(&self, identity: &Identity) -> Result<Vec<BookingDetails>, AppError> {
        let today = Local::now().date_naive();
        Ok(self
            .user_bookings(identity)
            .await?
            .into_iter()
            .filter(|b| is_upcoming(&b.schedule, today))
            .collect())
    }

    pub async fn past_bookings(&self, identity: &Identity) -> Result<Vec<BookingDetails>, AppError> {
        let today = Local::now().date_naive();
        Ok(self
            .user_bookings(identity)
            .await?
            .into_iter()
            .filter(|b| !is_upcoming(&b.schedule, today))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(date: &str, cancelled: bool) -> Schedule {
        Schedule {
            id: 1,
            date: date.to_string(),
            teacher: "Asha".to_string(),
            comments: None,
            yoga_course_id: 1,
            current_enrollment: 0,
            is_cancelled: cancelled,
        }
    }

    #[test]
    fn test_yesterday_is_past() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        assert!(!is_upcoming(&schedule("2026-08-04", false), today));
    }

    #[test]
    fn test_tomorrow_is_upcoming() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        assert!(is_upcoming(&schedule("2026-08-06", false), today));
    }

    #[test]
    fn test_cancellation_overrides_future_date() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        assert!(!is_upcoming(&schedule("2026-08-06", true), today));
    }

    #[test]
    fn test_unparseable_date_is_past() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        assert!(!is_upcoming(&schedule("next Tuesday", false), today));
    }
}

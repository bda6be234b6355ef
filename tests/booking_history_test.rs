use std::sync::Arc;

use chrono::{Days, Local};
use sqlx::SqlitePool;

use yogabook_backend::auth::Identity;
use yogabook_backend::firebase::MemoryStore;
use yogabook_backend::models::{Booking, Course, Schedule};
use yogabook_backend::services::BookingService;

async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite://:memory:")
        .await
        .expect("Failed to create test db");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

fn identity() -> Identity {
    Identity {
        user_id: "uid-1".to_string(),
        email: "student@example.com".to_string(),
    }
}

fn course(id: i64) -> Course {
    Course {
        id,
        day_of_week: "Monday".to_string(),
        time: "09:00".to_string(),
        price: 12.5,
        capacity: 10,
        duration: 60,
        course_type: "Hatha".to_string(),
        description: None,
        is_active: true,
        difficulty: None,
        equipment: None,
    }
}

fn schedule(id: i64, date: String, cancelled: bool) -> Schedule {
    Schedule {
        id,
        date,
        teacher: "Asha".to_string(),
        comments: None,
        yoga_course_id: 1,
        current_enrollment: 1,
        is_cancelled: cancelled,
    }
}

fn booking(id: &str, user_id: &str, schedule_id: i64) -> Booking {
    Booking {
        id: id.to_string(),
        user_id: user_id.to_string(),
        user_email: "student@example.com".to_string(),
        schedule_id,
        course_id: 1,
        booking_date: "2026-08-01T10:00:00Z".to_string(),
        cancelled: false,
        cancelled_at: None,
        checkout_id: None,
    }
}

fn ymd(date: chrono::NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn seeded_store() -> Arc<MemoryStore> {
    let today = Local::now().date_naive();
    let yesterday = today.checked_sub_days(Days::new(1)).expect("yesterday");
    let tomorrow = today.checked_add_days(Days::new(1)).expect("tomorrow");

    let store = Arc::new(MemoryStore::new());
    store.insert_course(course(1));
    store.insert_schedule(schedule(11, ymd(yesterday), false));
    store.insert_schedule(schedule(12, ymd(tomorrow), false));
    store.insert_schedule(schedule(13, ymd(tomorrow), true));
    store.insert_booking(booking("-B1", "uid-1", 11));
    store.insert_booking(booking("-B2", "uid-1", 12));
    store.insert_booking(booking("-B3", "uid-1", 13));
    store
}

#[tokio::test]
async fn test_history_is_partitioned_by_date_and_cancellation() {
    let pool = setup_test_db().await;
    let service = BookingService::new(pool, seeded_store());

    let me = identity();
    let upcoming = service.upcoming_bookings(&me).await.expect("upcoming");
    let past = service.past_bookings(&me).await.expect("past");

    // Only tomorrow's live occurrence is upcoming; yesterday's class and the
    // called-off one land in the past list.
    let upcoming_ids: Vec<&str> = upcoming.iter().map(|b| b.booking.id.as_str()).collect();
    assert_eq!(upcoming_ids, vec!["-B2"]);

    let mut past_ids: Vec<&str> = past.iter().map(|b| b.booking.id.as_str()).collect();
    past_ids.sort_unstable();
    assert_eq!(past_ids, vec!["-B1", "-B3"]);
}

#[tokio::test]
async fn test_history_is_sorted_most_recent_class_first() {
    let pool = setup_test_db().await;
    let service = BookingService::new(pool, seeded_store());

    let all = service.user_bookings(&identity()).await.expect("history");
    assert_eq!(all.len(), 3);
    for pair in all.windows(2) {
        assert!(pair[0].schedule.date >= pair[1].schedule.date);
    }
}

#[tokio::test]
async fn test_history_only_returns_the_callers_bookings() {
    let pool = setup_test_db().await;
    let store = seeded_store();
    store.insert_booking(booking("-B9", "uid-2", 12));

    let service = BookingService::new(pool, store);
    let all = service.user_bookings(&identity()).await.expect("history");
    assert!(all.iter().all(|b| b.booking.user_id == "uid-1"));
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_bookings_with_vanished_schedules_are_skipped() {
    let pool = setup_test_db().await;
    let store = seeded_store();
    store.insert_booking(booking("-B4", "uid-1", 99));

    let service = BookingService::new(pool, store);
    let all = service.user_bookings(&identity()).await.expect("history");
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|b| b.booking.id != "-B4"));
}

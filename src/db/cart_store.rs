use sqlx::SqlitePool;
use tracing::warn;

use crate::error::AppError;
use crate::models::{CartEntry, Course, Schedule};

// The cart lives under one fixed key as a whole serialized snapshot:
// every mutation loads the full sequence, transforms it, and writes the
// full result back. There is no partial update.
const CART_SLOT: i64 = 0;

/// Ordered cart contents. Read failures and unreadable snapshots degrade
/// to an empty cart.
pub async fn cart_entries(db: &SqlitePool) -> Vec<CartEntry> {
    let row: Result<Option<(String,)>, sqlx::Error> =
        sqlx::query_as("SELECT items FROM cart WHERE slot = ?")
            .bind(CART_SLOT)
            .fetch_optional(db)
            .await;

    match row {
        Ok(Some((items,))) => serde_json::from_str(&items).unwrap_or_else(|e| {
            warn!("Discarding unreadable cart snapshot: {}", e);
            Vec::new()
        }),
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!("Failed to load cart: {}", e);
            Vec::new()
        }
    }
}

async fn save_entries(db: &SqlitePool, entries: &[CartEntry]) -> Result<(), AppError> {
    let items = serde_json::to_string(entries)
        .map_err(|e| AppError::BadRequest(format!("Failed to serialize cart: {}", e)))?;

    sqlx::query("INSERT OR REPLACE INTO cart (slot, items) VALUES (?, ?)")
        .bind(CART_SLOT)
        .bind(items)
        .execute(db)
        .await?;

    Ok(())
}

/// Stage a (course, schedule) pair for checkout. Rejects a schedule already
/// in the cart, and any entry sitting on the same date as an existing one
/// when the incoming course runs at the same time of day.
pub async fn add_to_cart(db: &SqlitePool, course: Course, schedule: Schedule) -> Result<(), AppError> {
    let mut entries = cart_entries(db).await;

    if entries.iter().any(|e| e.schedule.id == schedule.id) {
        return Err(AppError::DuplicateSchedule);
    }

    let conflict = entries
        .iter()
        .any(|e| e.schedule.date == schedule.date && e.course.time == course.time);
    if conflict {
        return Err(AppError::ScheduleConflict);
    }

    entries.push(CartEntry { course, schedule });
    save_entries(db, &entries).await
}

pub async fn remove_from_cart(db: &SqlitePool, schedule_id: i64) {
    let mut entries = cart_entries(db).await;
    entries.retain(|e| e.schedule.id != schedule_id);

    if let Err(e) = save_entries(db, &entries).await {
        warn!("Failed to remove schedule {} from cart: {}", schedule_id, e);
    }
}

pub async fn clear_cart(db: &SqlitePool) {
    if let Err(e) = sqlx::query("DELETE FROM cart WHERE slot = ?")
        .bind(CART_SLOT)
        .execute(db)
        .await
    {
        warn!("Failed to clear cart: {}", e);
    }
}

pub async fn is_in_cart(db: &SqlitePool, schedule_id: i64) -> bool {
    cart_entries(db)
        .await
        .iter()
        .any(|e| e.schedule.id == schedule_id)
}

/// Price sum over the staged entries.
pub fn cart_total(entries: &[CartEntry]) -> f64 {
    entries.iter().map(|e| e.course.price).sum()
}

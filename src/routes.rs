use axum::Json;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Router, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::auth::Identity;
use crate::db::cart_store;
use crate::error::AppError;
use crate::models::{BookingDetails, CartEntry, Course, Schedule};
use crate::services::{BookingService, CatalogService, CheckoutSummary, SearchFilter};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/courses", get(list_courses))
        .route("/courses/search", get(search_courses))
        .route("/courses/{id}/schedules", get(list_schedules))
        .route("/cart", get(get_cart).post(add_to_cart).delete(clear_cart))
        .route("/cart/{schedule_id}", get(cart_contains).delete(remove_from_cart))
        .route("/checkout", post(checkout))
        .route("/bookings", get(list_bookings))
        .route("/bookings/{id}/cancel", post(cancel_booking))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>, AppError> {
    let courses = CatalogService::new(state.store.clone())
        .list_active_courses()
        .await?;
    Ok(Json(courses))
}

async fn search_courses(
    State(state): State<AppState>,
    Query(filter): Query<SearchFilter>,
) -> Result<Json<Vec<Course>>, AppError> {
    let courses = CatalogService::new(state.store.clone()).search(&filter).await?;
    Ok(Json(courses))
}

async fn list_schedules(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Schedule>>, AppError> {
    let schedules = CatalogService::new(state.store.clone())
        .schedules_for_course(id)
        .await?;
    Ok(Json(schedules))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CartView {
    entries: Vec<CartEntry>,
    total_price: f64,
}

async fn get_cart(State(state): State<AppState>) -> Json<CartView> {
    let entries = cart_store::cart_entries(&state.db).await;
    let total_price = cart_store::cart_total(&entries);
    Json(CartView {
        entries,
        total_price,
    })
}

async fn add_to_cart(
    State(state): State<AppState>,
    Json(entry): Json<CartEntry>,
) -> Result<StatusCode, AppError> {
    cart_store::add_to_cart(&state.db, entry.course, entry.schedule).await?;
    Ok(StatusCode::CREATED)
}

async fn clear_cart(State(state): State<AppState>) -> StatusCode {
    cart_store::clear_cart(&state.db).await;
    StatusCode::NO_CONTENT
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CartMembership {
    in_cart: bool,
}

async fn cart_contains(
    State(state): State<AppState>,
    Path(schedule_id): Path<i64>,
) -> Json<CartMembership> {
    let in_cart = cart_store::is_in_cart(&state.db, schedule_id).await;
    Json(CartMembership { in_cart })
}

async fn remove_from_cart(
    State(state): State<AppState>,
    Path(schedule_id): Path<i64>,
) -> StatusCode {
    cart_store::remove_from_cart(&state.db, schedule_id).await;
    StatusCode::NO_CONTENT
}

async fn checkout(
    State(state): State<AppState>,
    identity: Option<Identity>,
) -> Result<Json<CheckoutSummary>, AppError> {
    let service = BookingService::new(state.db.clone(), state.store.clone());
    let summary = service.checkout(identity.as_ref()).await?;
    Ok(Json(summary))
}

#[derive(Deserialize, Default, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum BookingScope {
    #[default]
    All,
    Upcoming,
    Past,
}

#[derive(Deserialize)]
struct BookingQueryParams {
    #[serde(default)]
    scope: BookingScope,
}

async fn list_bookings(
    State(state): State<AppState>,
    identity: Identity,
    Query(params): Query<BookingQueryParams>,
) -> Result<Json<Vec<BookingDetails>>, AppError> {
    let service = BookingService::new(state.db.clone(), state.store.clone());
    let bookings = match params.scope {
        BookingScope::All => service.user_bookings(&identity).await?,
        BookingScope::Upcoming => service.upcoming_bookings(&identity).await?,
        BookingScope::Past => service.past_bookings(&identity).await?,
    };
    Ok(Json(bookings))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelBookingRequest {
    schedule_id: i64,
}

async fn cancel_booking(
    State(state): State<AppState>,
    _identity: Identity,
    Path(id): Path<String>,
    Json(req): Json<CancelBookingRequest>,
) -> Result<StatusCode, AppError> {
    let service = BookingService::new(state.db.clone(), state.store.clone());
    service.cancel(&id, req.schedule_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

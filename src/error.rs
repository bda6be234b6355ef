use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("User not authenticated")]
    NotAuthenticated,

    #[error("This class is already in your cart")]
    DuplicateSchedule,

    #[error("You have another class scheduled at this time")]
    ScheduleConflict,

    #[error("Class {0} is no longer available")]
    ScheduleGone(String),

    #[error("Class {0} is now full")]
    CapacityExceeded(String),

    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            err @ AppError::NotAuthenticated => (StatusCode::UNAUTHORIZED, err.to_string()),
            err @ (AppError::DuplicateSchedule
            | AppError::ScheduleConflict
            | AppError::CapacityExceeded(_)) => (StatusCode::CONFLICT, err.to_string()),
            err @ AppError::ScheduleGone(_) => (StatusCode::GONE, err.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Remote(msg) => {
                error!("remote store error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg)
            }
            AppError::Database(e) => {
                error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: error_message,
        });

        (status, body).into_response()
    }
}

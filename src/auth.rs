use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use serde::Serialize;

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// The signed-in user as asserted by the mobile client. Token verification
/// belongs to the identity provider; this service only needs the uid/email
/// pair to gate checkout and stamp bookings.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
}

impl Identity {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let user_id = headers.get(USER_ID_HEADER)?.to_str().ok()?.to_string();
        if user_id.is_empty() {
            return None;
        }
        let email = headers
            .get(USER_EMAIL_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        Some(Self { user_id, email })
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Identity::from_headers(&parts.headers).ok_or(AppError::NotAuthenticated)
    }
}

impl<S: Send + Sync> OptionalFromRequestParts<S> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(Identity::from_headers(&parts.headers))
    }
}

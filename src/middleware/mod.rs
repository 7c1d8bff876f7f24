use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

use crate::ids::normalize_id;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity taken from the `X-User-Id` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: String,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let user_id = normalize_id(raw);
        if user_id.is_empty() {
            return Err(StatusCode::UNAUTHORIZED);
        }
        Ok(CurrentUser { user_id })
    }
}

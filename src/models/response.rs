use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Envelope every API response is wrapped in.
#[derive(Debug, Serialize)]
pub struct ResponseMessage<T> {
    pub status_code: u16,
    pub status_message: String,
    pub payload: Option<T>,
    pub timestamp: DateTime<Utc>,
    pub path: String,
}

impl<T> ResponseMessage<T> {
    pub fn new(status: StatusCode, message: impl Into<String>, payload: Option<T>, path: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            status_message: message.into(),
            payload,
            timestamp: Utc::now(),
            path: path.into(),
        }
    }

    pub fn success(path: impl Into<String>, payload: T) -> Self {
        Self::new(StatusCode::OK, "success", Some(payload), path)
    }

    pub fn empty(status: StatusCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(status, message, None, path)
    }
}

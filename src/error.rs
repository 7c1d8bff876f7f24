use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::models::ResponseMessage;
use crate::persistence::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl AppError {
    pub fn user_not_found(id: &str) -> Self {
        AppError::NotFound { entity: "User", id: id.to_string() }
    }

    pub fn event_not_found(id: &str) -> Self {
        AppError::NotFound { entity: "Event", id: id.to_string() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// An error paired with the request path, rendered as the standard envelope.
#[derive(Debug)]
pub struct ApiError {
    pub error: AppError,
    pub path: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.error.status();
        let message = match &self.error {
            AppError::Repository(e) => {
                error!(path = %self.path, error = %e, "request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body: ResponseMessage<()> = ResponseMessage::empty(status, message, self.path);
        (status, Json(body)).into_response()
    }
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::db::StoreError;
use crate::jobs::JobError;
use crate::models::ErrorBody;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Queue(#[from] JobError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(_) | ApiError::Queue(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Unauthorized(message) | ApiError::NotFound(message) => message.clone(),
            ApiError::Store(e) => {
                tracing::error!(error = %e, "Report query failed");
                "Failed to load report data".to_string()
            }
            ApiError::Queue(e) => {
                tracing::error!(error = %e, "Job queue rejected request");
                "Failed to queue job".to_string()
            }
        };
        let error = status.canonical_reason().unwrap_or("Error");

        (status, Json(ErrorBody::new(status.as_u16(), error, message))).into_response()
    }
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::models::{ConflictReport, SessionError};
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Insufficient credits")]
    InsufficientCredits,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("That time slot is already booked")]
    SlotConflict(ConflictReport),

    #[error("storage temporarily unavailable")]
    Unavailable,

    #[error("storage error: {0}")]
    Store(StoreError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout => AppError::Unavailable,
            StoreError::SlotTaken => {
                AppError::Conflict("That time slot is already booked".to_string())
            }
            other => AppError::Store(other),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InsufficientCredits => AppError::InsufficientCredits,
            SessionError::IndexOutOfRange { .. } => AppError::Validation(err.to_string()),
            SessionError::InvalidTransition { .. } => AppError::Conflict(err.to_string()),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InsufficientCredits => StatusCode::PAYMENT_REQUIRED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::SlotConflict(_) => StatusCode::CONFLICT,
            AppError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Server faults are logged in full and reported generically.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            if matches!(self, AppError::Unavailable) {
                self.to_string()
            } else {
                "internal server error".to_string()
            }
        } else {
            self.to_string()
        };

        let mut body = serde_json::json!({ "error": message });
        if let AppError::SlotConflict(report) = &self {
            body["conflict"] = serde_json::to_value(report).unwrap_or_default();
        }
        (status, axum::Json(body)).into_response()
    }
}

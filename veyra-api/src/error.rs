use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    NotFoundError(String),
    ConflictError(String),
    BusyError(String),
    InternalServerError(String),
}

impl From<veyra_core::Error> for AppError {
    fn from(err: veyra_core::Error) -> Self {
        match err {
            veyra_core::Error::NotFound(msg) => AppError::NotFoundError(msg),
            veyra_core::Error::Conflict(msg) => AppError::ConflictError(msg),
            veyra_core::Error::Busy(msg) => AppError::BusyError(msg),
            veyra_core::Error::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            // Retryable: contention on the session lock, or a fail-closed
            // lock backend outage. Everything under 409 is terminal.
            AppError::BusyError(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use glow_core::CoreError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    /// A write could not commit; the client may retry.
    ServiceUnavailable(String),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ServiceUnavailable(msg) => {
                tracing::warn!("Transaction failed: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Unable to complete the request, please retry".to_string(),
                )
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Unauthenticated => AppError::AuthenticationError(err.to_string()),
            CoreError::Forbidden(_) => AppError::AuthorizationError(err.to_string()),
            CoreError::NotFound(_) => AppError::NotFoundError(err.to_string()),
            CoreError::ValidationError(_) => AppError::ValidationError(err.to_string()),
            CoreError::TransactionFailure(_) => AppError::ServiceUnavailable(err.to_string()),
            CoreError::InternalError(_) => AppError::InternalServerError(err.to_string()),
        }
    }
}

impl From<glow_order::OrderError> for AppError {
    fn from(err: glow_order::OrderError) -> Self {
        CoreError::from(err).into()
    }
}

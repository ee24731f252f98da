use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use orderly_core::{OrderError, Outcome};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    Order(OrderError),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Order(err) => match err.outcome() {
                Outcome::BadRequest => (StatusCode::BAD_REQUEST, err.to_string()),
                Outcome::NotFound => (StatusCode::NOT_FOUND, err.to_string()),
                Outcome::ServiceUnavailable => {
                    tracing::warn!("Dependency unavailable: {}", err);
                    (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
                }
                Outcome::BadGateway => {
                    tracing::warn!("Bad gateway: {}", err);
                    (StatusCode::BAD_GATEWAY, err.to_string())
                }
                Outcome::InternalError | Outcome::Success => {
                    tracing::error!("Internal Server Error: {}", err);
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
                }
            },
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

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        Self::Order(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::ValidationError(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(_: PathRejection) -> Self {
        Self::ValidationError("Invalid ID".to_string())
    }
}

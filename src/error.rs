use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid rating: {0} (must be an integer from 1 to 5)")]
    InvalidRating(i16),

    #[error("Unknown interaction kind: {0}")]
    UnknownInteractionKind(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Malformed engine response: {0}")]
    MalformedGatewayResponse(String),

    #[error("Recommendation engine unavailable: {0}")]
    GatewayUnavailable(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::GatewayUnavailable(format!("engine request timed out: {}", err))
        } else {
            AppError::GatewayUnavailable(err.to_string())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotAuthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidRating(_) | AppError::UnknownInteractionKind(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::Persistence(_) | AppError::Cache(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::MalformedGatewayResponse(_) | AppError::GatewayUnavailable(_) => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors returned by the ops endpoints
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Metrics(_) => "METRICS_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            AppError::Metrics(_) | AppError::Internal(_) => "Internal server error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let log_message = self.to_string();
        let client_message = if is_production() {
            self.public_message().to_string()
        } else {
            log_message.clone()
        };

        // Always log the detailed error server-side
        tracing::error!(
            code = %self.code(),
            status = %status.as_u16(),
            message = %log_message,
            "API error"
        );

        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code().to_string(),
                message: client_message,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

//! Application-wide error types using thiserror
//!
//! All errors that can surface from the public REST/WebSocket surface are
//! wrapped in `AppError`, which carries an `ErrorKind` so callers can match
//! on the taxonomy instead of parsing display strings.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;

use crate::engine::EngineError;

/// Stable error taxonomy shared by REST error bodies and WS `ERROR` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    UnknownSymbol,
    InvalidOrder,
    InsufficientBalance,
    NotFound,
    Forbidden,
    FokUnfillable,
    RateLimited,
    Malformed,
    UnknownMessageType,
    Internal,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::UnknownSymbol | ErrorKind::InvalidOrder | ErrorKind::Malformed => {
                StatusCode::BAD_REQUEST
            }
            ErrorKind::InsufficientBalance | ErrorKind::FokUnfillable => {
                StatusCode::PAYMENT_REQUIRED
            }
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::UnknownMessageType => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::UnknownSymbol => "UNKNOWN_SYMBOL",
            ErrorKind::InvalidOrder => "INVALID_ORDER",
            ErrorKind::InsufficientBalance => "INSUFFICIENT_BALANCE",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::FokUnfillable => "FOK_UNFILLABLE",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::Malformed => "MALFORMED",
            ErrorKind::UnknownMessageType => "UNKNOWN_MESSAGE_TYPE",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{kind:?}: {message}")]
    Api { kind: ErrorKind, message: String },
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Engine(e) => e.kind(),
            AppError::Config(_) => ErrorKind::Internal,
            AppError::Serialization(_) => ErrorKind::Malformed,
            AppError::Io(_) => ErrorKind::Internal,
            AppError::Api { kind, .. } => *kind,
        }
    }

    pub fn api(kind: ErrorKind, message: impl Into<String>) -> Self {
        AppError::Api {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let body = ErrorBody {
            error: self.to_string(),
            kind: kind.as_str(),
        };
        (kind.status(), Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_converts_to_app_error() {
        let engine_err = EngineError::NotFound("order missing".into());
        let app_err: AppError = engine_err.into();
        assert_eq!(app_err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_serde_error_converts_to_app_error() {
        let serde_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let app_err: AppError = serde_err.into();
        assert_eq!(app_err.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn test_config_error_display() {
        let err = AppError::Config("missing symbols".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing symbols");
    }

    #[test]
    fn test_error_kind_status_codes() {
        assert_eq!(ErrorKind::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorKind::InsufficientBalance.status(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(ErrorKind::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}

//! Application error taxonomy and its HTTP mapping.
//!
//! Every orchestrator maps collaborator failures into one of these classes at
//! its boundary. The transport layer is the only place that turns a class into
//! a status code.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::domain::captcha::CaptchaRejection;

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

/// Serializable error payload returned to API clients.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Bad input. The caller's fault, never retried.
    #[error("{message}")]
    Validation { message: String, details: Value },

    /// Entity absent, or filtered out by soft-delete or expiry.
    #[error("{message}")]
    NotFound { message: String, details: Value },

    /// Credential used past one of its TTL boundaries.
    #[error("{message}")]
    Expired { message: String, details: Value },

    /// Uniqueness race. Safe to retry once.
    #[error("{message}")]
    Conflict { message: String, details: Value },

    /// Identity provider or captcha service failure.
    #[error("{message}")]
    Upstream { message: String, details: Value },

    /// Storage or codec failure.
    #[error("{message}")]
    Internal { message: String, details: Value },

    /// Missing or malformed credentials on a protected route.
    #[error("{message}")]
    Unauthorized { message: String, details: Value },

    #[error("captcha invalid ({reason})")]
    CaptchaInvalid { reason: CaptchaRejection },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }
    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }
    pub fn expired(message: impl Into<String>, details: Value) -> Self {
        Self::Expired {
            message: message.into(),
            details,
        }
    }
    pub fn conflict(message: impl Into<String>, details: Value) -> Self {
        Self::Conflict {
            message: message.into(),
            details,
        }
    }
    pub fn upstream(message: impl Into<String>, details: Value) -> Self {
        Self::Upstream {
            message: message.into(),
            details,
        }
    }
    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }
    pub fn unauthorized(message: impl Into<String>, details: Value) -> Self {
        Self::Unauthorized {
            message: message.into(),
            details,
        }
    }

    /// Returns true for credential failures: unknown, revoked or expired.
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Expired { .. })
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation { .. } => (StatusCode::BAD_REQUEST, "validation_error"),
            Self::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            Self::Expired { .. } => (StatusCode::UNAUTHORIZED, "expired"),
            Self::Conflict { .. } => (StatusCode::CONFLICT, "conflict"),
            Self::Upstream { .. } => (StatusCode::BAD_GATEWAY, "upstream_error"),
            Self::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            Self::Unauthorized { .. } => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::CaptchaInvalid { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "captcha_invalid"),
        }
    }

    /// Builds the client-facing payload.
    ///
    /// Upstream and internal failures are opaque: their details stay in the logs.
    /// Captcha rejections all collapse into one message.
    pub fn to_error_info(&self) -> ErrorInfo {
        let (_, code) = self.status_and_code();

        let (message, details) = match self {
            Self::Validation { message, details }
            | Self::NotFound { message, details }
            | Self::Expired { message, details }
            | Self::Conflict { message, details }
            | Self::Unauthorized { message, details } => (message.clone(), details.clone()),
            Self::Upstream { .. } => ("Upstream service failure".to_string(), json!({})),
            Self::Internal { .. } => ("Internal server error".to_string(), json!({})),
            Self::CaptchaInvalid { .. } => ("Captcha invalid".to_string(), json!({})),
        };

        ErrorInfo {
            code,
            message,
            details,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, _) = self.status_and_code();

        match &self {
            Self::Internal { message, details } | Self::Upstream { message, details } => {
                tracing::error!(%message, %details, "request failed");
            }
            Self::CaptchaInvalid { reason } => {
                tracing::info!(%reason, "captcha rejected");
            }
            _ => {}
        }

        let body = ErrorBody {
            error: self.to_error_info(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db) = e.as_database_error()
            && db.is_unique_violation()
        {
            return AppError::conflict(
                "Unique constraint violation",
                json!({ "constraint": db.constraint() }),
            );
        }

        AppError::internal("Database error", json!({ "reason": e.to_string() }))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::bad_request("Request validation failed", json!({ "fields": e.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_details_are_not_exposed() {
        let err = AppError::internal("Database error", json!({ "reason": "connection reset" }));
        let info = err.to_error_info();

        assert_eq!(info.code, "internal_error");
        assert_eq!(info.message, "Internal server error");
        assert_eq!(info.details, json!({}));
    }

    #[test]
    fn test_captcha_reasons_collapse_to_one_message() {
        for reason in [
            CaptchaRejection::Unsuccessful,
            CaptchaRejection::ActionInvalid,
            CaptchaRejection::NotHuman,
        ] {
            let info = AppError::CaptchaInvalid { reason }.to_error_info();
            assert_eq!(info.code, "captcha_invalid");
            assert_eq!(info.message, "Captcha invalid");
        }
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::bad_request("x", json!({})), StatusCode::BAD_REQUEST),
            (AppError::not_found("x", json!({})), StatusCode::NOT_FOUND),
            (AppError::expired("x", json!({})), StatusCode::UNAUTHORIZED),
            (AppError::conflict("x", json!({})), StatusCode::CONFLICT),
            (AppError::upstream("x", json!({})), StatusCode::BAD_GATEWAY),
            (
                AppError::internal("x", json!({})),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_credential_failure_classes() {
        assert!(AppError::not_found("x", json!({})).is_credential_failure());
        assert!(AppError::expired("x", json!({})).is_credential_failure());
        assert!(!AppError::internal("x", json!({})).is_credential_failure());
    }
}

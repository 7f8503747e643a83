//! API error handling
//!
//! Translates service errors into HTTP responses. This is the only place
//! where authentication failures are given a status code.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in the response
#[derive(Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl ApiError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Auth(e) => e.code(),
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(e) => match e {
                AuthError::InvalidRequest(_)
                | AuthError::MissingFields
                | AuthError::MalformedMessage(_) => StatusCode::BAD_REQUEST,

                AuthError::DomainMismatch
                | AuthError::StatementMismatch
                | AuthError::VersionMismatch
                | AuthError::AddressMismatch
                | AuthError::InvalidSignature(_)
                | AuthError::NonceInvalidOrExpired => StatusCode::UNAUTHORIZED,

                AuthError::ChallengePersistenceFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
                AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(error = %message, code = %error_code, "Server error occurred");
        } else {
            tracing::debug!(error = %message, code = %error_code, "Client error occurred");
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code: error_code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid JSON: {}", rejection.body_text()))
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SignatureError;
    use crate::nonce::StoreError;
    use std::time::Duration;

    fn timeout() -> StoreError {
        StoreError::Timeout(Duration::from_millis(100))
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (AuthError::InvalidRequest("x".to_string()), StatusCode::BAD_REQUEST),
            (AuthError::MissingFields, StatusCode::BAD_REQUEST),
            (
                AuthError::MalformedMessage(crate::auth::MessageError::Empty),
                StatusCode::BAD_REQUEST,
            ),
            (AuthError::DomainMismatch, StatusCode::UNAUTHORIZED),
            (AuthError::StatementMismatch, StatusCode::UNAUTHORIZED),
            (AuthError::VersionMismatch, StatusCode::UNAUTHORIZED),
            (AuthError::AddressMismatch, StatusCode::UNAUTHORIZED),
            (
                AuthError::InvalidSignature(SignatureError::RecoveryFailed("x".to_string())),
                StatusCode::UNAUTHORIZED,
            ),
            (AuthError::NonceInvalidOrExpired, StatusCode::UNAUTHORIZED),
            (
                AuthError::ChallengePersistenceFailed(timeout()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (AuthError::Internal(timeout()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }

        assert_eq!(
            ApiError::BadRequest("test".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ApiError::from(AuthError::DomainMismatch).error_code(),
            "DOMAIN_MISMATCH"
        );
        assert_eq!(
            ApiError::BadRequest("test".to_string()).error_code(),
            "BAD_REQUEST"
        );
    }

    #[tokio::test]
    async fn test_response_body() {
        let response = ApiError::from(AuthError::Internal(timeout())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "error": {
                    "code": "INTERNAL_ERROR",
                    "message": "Internal authentication error"
                }
            })
        );
    }
}

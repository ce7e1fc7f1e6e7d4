//! Gateway error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl.
//! Error messages returned to clients are intentionally generic to avoid
//! leaking internal details. Actual errors are logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Gateway error type.
///
/// Maps to HTTP status codes:
/// - InvalidToken, SignatureMismatch: 401 Unauthorized
/// - Forbidden: 403 Forbidden
/// - FeatureDisabled, NotFound: 404 Not Found
/// - BadRequest: 400 Bad Request
/// - UpstreamFetch: 503 Service Unavailable
/// - Database, Internal: 500 Internal Server Error
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Missing or invalid bearer token.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Authenticated, but the role is not allowed on this route.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The route family is switched off by its feature flag.
    ///
    /// Renders exactly like an unmatched route so the kill-switch is not
    /// observable from outside.
    #[error("Feature disabled")]
    FeatureDisabled,

    /// The remote key set could not be fetched, so tokens cannot be evaluated.
    #[error("Upstream fetch failed: {0}")]
    UpstreamFetch(String),

    /// Webhook signature header missing or not matching the payload.
    #[error("Webhook signature mismatch")]
    SignatureMismatch,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error")]
    Internal,
}

impl GatewayError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::InvalidToken(_) | GatewayError::SignatureMismatch => 401,
            GatewayError::Forbidden(_) => 403,
            GatewayError::FeatureDisabled | GatewayError::NotFound(_) => 404,
            GatewayError::BadRequest(_) => 400,
            GatewayError::UpstreamFetch(_) => 503,
            GatewayError::Database(_) | GatewayError::Internal => 500,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            GatewayError::InvalidToken(reason) => {
                (StatusCode::UNAUTHORIZED, "INVALID_TOKEN", reason.clone())
            }
            GatewayError::Forbidden(reason) => (StatusCode::FORBIDDEN, "FORBIDDEN", reason.clone()),
            GatewayError::FeatureDisabled => {
                // Same shape as the router fallback: bare 404, empty body
                return StatusCode::NOT_FOUND.into_response();
            }
            GatewayError::UpstreamFetch(reason) => {
                tracing::warn!(target: "gateway.availability", reason = %reason, "Upstream dependency unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Service temporarily unavailable".to_string(),
                )
            }
            GatewayError::SignatureMismatch => (
                StatusCode::UNAUTHORIZED,
                "INVALID_SIGNATURE",
                "Webhook signature is missing or invalid".to_string(),
            ),
            GatewayError::NotFound(resource) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone())
            }
            GatewayError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
            GatewayError::Database(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(target: "gateway.database", error = %err, "Database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
            GatewayError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        // Bearer challenge only for token failures; webhooks are not bearer-authenticated
        if matches!(self, GatewayError::InvalidToken(_)) {
            if let Ok(header_value) =
                "Bearer realm=\"platform-api\", error=\"invalid_token\"".parse()
            {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        GatewayError::Database(err.to_string())
    }
}

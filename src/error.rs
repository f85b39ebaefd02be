//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code. Authentication failures render the
//! bare status the getwork convention expects (no body, plus the Basic
//! challenge header when credentials were missing); every other variant
//! renders a structured JSON error response.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// Non-authentication errors follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 3001,
///     "message": "no upstream pool available"
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`GatewayError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category           | HTTP Status      |
/// |-----------|--------------------|------------------|
/// | 1000–1999 | Validation         | 400 Bad Request  |
/// | 2000–2999 | Authentication     | 401 Unauthorized |
/// | 3000–3999 | Session Resolution | 503 / 429 / 409  |
/// | 4000–4999 | Upstream / Server  | 502 / 500        |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The request carried no usable `Authorization: Basic` header.
    #[error("missing or malformed credentials")]
    MissingCredentials {
        /// Realm advertised in the `WWW-Authenticate` challenge.
        realm: String,
    },

    /// The upstream pool rejected the supplied credentials.
    #[error("authorization failed for {username}")]
    AuthorizationFailed {
        /// Username the upstream refused.
        username: String,
    },

    /// No upstream pool can accept a new worker right now.
    #[error("no upstream pool available")]
    NoPoolAvailable,

    /// The upstream worker limit has been reached.
    #[error("worker limit exceeded")]
    WorkerLimitExceeded,

    /// The bound session cannot apply an extranonce change on rebind.
    #[error("extranonce change not supported by this session")]
    ExtranonceChangeUnsupported,

    /// Request validation failed (malformed getwork payload).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The upstream pool session failed mid-operation.
    #[error("upstream pool failure: {0}")]
    Upstream(String),

    /// Internal server error. The message is logged, never sent to clients.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::MissingCredentials { .. } => 2001,
            Self::AuthorizationFailed { .. } => 2002,
            Self::NoPoolAvailable => 3001,
            Self::WorkerLimitExceeded => 3002,
            Self::ExtranonceChangeUnsupported => 3003,
            Self::Upstream(_) => 4001,
            Self::Internal(_) => 4000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::MissingCredentials { .. } | Self::AuthorizationFailed { .. } => {
                StatusCode::UNAUTHORIZED
            }
            Self::NoPoolAvailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::WorkerLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::ExtranonceChangeUnsupported => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            Self::MissingCredentials { realm } => {
                let challenge = format!("Basic realm=\"{realm}\"");
                let challenge = HeaderValue::from_str(&challenge)
                    .unwrap_or_else(|_| HeaderValue::from_static("Basic"));
                (status, [(header::WWW_AUTHENTICATE, challenge)]).into_response()
            }
            Self::AuthorizationFailed { .. } => status.into_response(),
            Self::Internal(detail) => {
                tracing::error!(%detail, "internal error");
                let body = ErrorResponse {
                    error: ErrorBody {
                        code: 4000,
                        message: "internal error".to_string(),
                    },
                };
                (status, axum::Json(body)).into_response()
            }
            other => {
                let body = ErrorResponse {
                    error: ErrorBody {
                        code: other.error_code(),
                        message: other.to_string(),
                    },
                };
                (status, axum::Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_are_distinct_per_resolution_failure() {
        assert_eq!(
            GatewayError::NoPoolAvailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            GatewayError::WorkerLimitExceeded.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            GatewayError::ExtranonceChangeUnsupported.status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn missing_credentials_renders_challenge() {
        let err = GatewayError::MissingCredentials {
            realm: "getwork-gateway".to_string(),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let challenge = response.headers().get(header::WWW_AUTHENTICATE);
        let Some(challenge) = challenge else {
            panic!("expected WWW-Authenticate header");
        };
        assert_eq!(challenge, "Basic realm=\"getwork-gateway\"");
    }

    #[test]
    fn authorization_failed_has_no_challenge() {
        let err = GatewayError::AuthorizationFailed {
            username: "alice".to_string(),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn internal_error_hides_detail() {
        let err = GatewayError::Internal("connection string leaked".to_string());
        assert_eq!(err.error_code(), 4000);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

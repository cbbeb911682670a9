//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.
//!
//! Expected scan denials are not errors: they are returned as a
//! [`crate::models::outcome::ScanOutcome`] with status 200.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from ledger or directory queries
/// - **Authentication Errors**: Missing or invalid bearer tokens, unknown hosts
/// - **Authorization Errors**: Fest not owned by the authenticated host
/// - **Validation Errors**: Invalid request data
/// - **Upstream Errors**: The identity provider failed to answer
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// This wraps any sqlx::Error using the `#[from]` attribute, which
    /// automatically implements `From<sqlx::Error> for AppError`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Bearer token is missing, malformed, or rejected by the identity provider.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid token")]
    Unauthorized,

    /// Token is valid but no active host profile matches it.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Host profile not found")]
    HostNotRegistered,

    /// The fest does not exist or belongs to another host.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Not your event")]
    FestNotOwned,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The identity provider could not be reached or answered unexpectedly.
    ///
    /// Returns HTTP 502 Bad Gateway.
    #[error("Identity provider error: {0}")]
    IdentityProvider(String),
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "success": false,
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `Unauthorized` → 401 Unauthorized
/// - `HostNotRegistered` / `FestNotOwned` → 403 Forbidden
/// - `InvalidRequest` → 400 Bad Request
/// - `IdentityProvider` → 502 Bad Gateway
/// - `Database` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "invalid_token", self.to_string()),
            AppError::HostNotRegistered => (
                StatusCode::FORBIDDEN,
                "host_not_registered",
                self.to_string(),
            ),
            AppError::FestNotOwned => (StatusCode::FORBIDDEN, "not_your_event", self.to_string()),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::IdentityProvider(ref msg) => {
                tracing::error!(error = %msg, "Identity provider failure");
                (
                    StatusCode::BAD_GATEWAY,
                    "identity_provider_error",
                    "Could not verify credentials".to_string(),
                )
            }
            AppError::Database(ref e) => {
                tracing::error!(error = ?e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

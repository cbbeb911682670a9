//! Host authentication middleware.
//!
//! Hosts authenticate with the identity provider's ID token sent as a bearer
//! token. The token is checked with the provider, then tied to an active host
//! profile. Handlers receive the result as an [`AuthContext`] extension.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

/// Authenticated host attached to the request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Host profile id; recorded as `scanned_by` and used for fest ownership checks.
    pub host_id: Uuid,

    /// Identity provider user id.
    pub uid: String,

    /// Raw bearer token, forwarded to the ticket authority.
    pub token: String,
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
fn bearer_token(value: &str) -> Option<&str> {
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <token>` header from request
/// 2. Verify the token with the identity provider
/// 3. Load the active host profile for the token's uid
/// 4. Inject `AuthContext` into the request and call the next handler
///
/// # Errors
///
/// - `Unauthorized` (401) when the header is missing or the token is rejected
/// - `HostNotRegistered` (403) when no active host profile matches the uid
/// - `IdentityProvider` (502) when the provider cannot be reached
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .ok_or(AppError::Unauthorized)?
        .to_string();

    let claims = state.identity.verify_token(&token).await?;

    let host = state
        .hosts
        .find_active_host(&claims.uid)
        .await?
        .ok_or_else(|| {
            tracing::warn!(uid = %claims.uid, "Authenticated user has no active host profile");
            AppError::HostNotRegistered
        })?;

    tracing::debug!(
        host_id = %host.id,
        uid = %claims.uid,
        email = ?claims.email.as_deref().or(host.email.as_deref()),
        "Host authenticated"
    );

    request.extensions_mut().insert(AuthContext {
        host_id: host.id,
        uid: claims.uid,
        token,
    });

    Ok(next.run(request).await)
}

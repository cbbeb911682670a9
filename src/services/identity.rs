//! Identity provider integration.
//!
//! Hosts sign in with the identity provider on the client side and send the
//! resulting ID token as a bearer token. This service only asks the provider
//! who the token belongs to; it never inspects the token itself.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{error::AppError, models::host::TokenClaims};

/// Verifies bearer tokens into identity claims.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Claims for a valid token.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the provider rejects the token
    /// - `IdentityProvider` if the provider cannot be reached
    async fn verify_token(&self, token: &str) -> Result<TokenClaims, AppError>;
}

/// Firebase Authentication over its REST `accounts:lookup` endpoint.
#[derive(Debug, Clone)]
pub struct FirebaseIdentity {
    client: Client,
    lookup_url: Url,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
}

impl FirebaseIdentity {
    /// Build a provider client for the given project web API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup URL cannot be built or the HTTP client
    /// cannot be initialized.
    pub fn new(base_url: &Url, api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut lookup_url = base_url.join("v1/accounts:lookup")?;
        lookup_url.query_pairs_mut().append_pair("key", api_key);

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, lookup_url })
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn verify_token(&self, token: &str) -> Result<TokenClaims, AppError> {
        let response = self
            .client
            .post(self.lookup_url.clone())
            .json(&LookupRequest { id_token: token })
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            // Expired, revoked and malformed tokens all come back as 400
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                return Err(AppError::Unauthorized);
            }
            status => {
                return Err(AppError::IdentityProvider(format!(
                    "lookup returned HTTP {}",
                    status.as_u16()
                )));
            }
        }

        let body = response
            .json::<LookupResponse>()
            .await
            .map_err(|e| AppError::IdentityProvider(e.to_string()))?;

        body.users
            .into_iter()
            .next()
            .map(|user| TokenClaims {
                uid: user.local_id,
                email: user.email,
            })
            .ok_or(AppError::Unauthorized)
    }
}

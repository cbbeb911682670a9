//! Client for the remote ticket authority (the ticket-issuing backend).
//!
//! The authority is the source of truth for ticket validity and usage. It is
//! reached over HTTP, may be slow, and rate limits aggressively, so every call
//! carries its own timeout and every failure is mapped to an
//! [`AuthorityError`] the verifier can turn into a scan outcome.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

use crate::models::remote_ticket::{MarkUsedRequest, RemoteTicketView, decode_ticket};

/// Failure talking to the ticket authority.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorityError {
    /// The authority answered 429 Too Many Requests.
    #[error("ticket authority is rate limiting requests")]
    RateLimited,

    /// The authority does not know this ticket (404).
    #[error("ticket not found")]
    NotFound,

    /// No answer within the per-call timeout.
    #[error("ticket authority timed out")]
    Timeout,

    /// Connection failure or any other transport error.
    #[error("ticket authority unreachable: {0}")]
    Unavailable(String),

    /// Any other non-success status.
    #[error("ticket authority returned HTTP {0}")]
    UnexpectedStatus(u16),

    /// The body could not be decoded into a ticket.
    #[error("invalid ticket authority response: {0}")]
    Decode(String),
}

/// Operations the check-in flow needs from the ticket authority.
///
/// `bearer` is the scanning host's token, forwarded as-is.
#[async_trait]
pub trait TicketAuthority: Send + Sync {
    /// `GET /tickets/by-ticket-id/:id`
    async fn fetch_ticket(
        &self,
        ticket_id: &str,
        bearer: &str,
    ) -> Result<RemoteTicketView, AuthorityError>;

    /// `PATCH /tickets/:id/mark-used`
    async fn mark_used(
        &self,
        ticket_id: &str,
        request: &MarkUsedRequest,
        bearer: &str,
    ) -> Result<(), AuthorityError>;
}

/// reqwest-based authority client.
///
/// # Timeout
///
/// The client is built once with the configured per-call timeout
/// (6 seconds by default), which bounds how long a scanner can be kept
/// waiting by a hung authority.
#[derive(Debug, Clone)]
pub struct HttpTicketAuthority {
    client: Client,
    base_url: Url,
}

impl HttpTicketAuthority {
    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base_url })
    }

    /// Append path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, AuthorityError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AuthorityError::Unavailable("authority base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Map a transport error into an authority error.
fn transport_error(error: reqwest::Error) -> AuthorityError {
    if error.is_timeout() {
        AuthorityError::Timeout
    } else {
        AuthorityError::Unavailable(error.to_string())
    }
}

/// Map a non-success HTTP status into an authority error.
fn status_error(status: StatusCode) -> AuthorityError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => AuthorityError::RateLimited,
        StatusCode::NOT_FOUND => AuthorityError::NotFound,
        other => AuthorityError::UnexpectedStatus(other.as_u16()),
    }
}

#[async_trait]
impl TicketAuthority for HttpTicketAuthority {
    async fn fetch_ticket(
        &self,
        ticket_id: &str,
        bearer: &str,
    ) -> Result<RemoteTicketView, AuthorityError> {
        let url = self.endpoint(&["tickets", "by-ticket-id", ticket_id])?;

        let response = self
            .client
            .get(url)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(status_error(response.status()));
        }

        let body = response.bytes().await.map_err(transport_error)?;

        decode_ticket(&body).map_err(|e| AuthorityError::Decode(e.to_string()))
    }

    async fn mark_used(
        &self,
        ticket_id: &str,
        request: &MarkUsedRequest,
        bearer: &str,
    ) -> Result<(), AuthorityError> {
        let url = self.endpoint(&["tickets", ticket_id, "mark-used"])?;

        let response = self
            .client
            .patch(url)
            .bearer_auth(bearer)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(status_error(response.status()));
        }

        Ok(())
    }
}

//! Ticket data as exposed by the remote ticket authority.
//!
//! The authority owns ticket issuance and usage state. This service only reads
//! its projection of a ticket and asks it to mark tickets used.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::scan_record::{GUEST_NAME, MAX_ATTENDEE_NAME_LEN};

/// The authority's projection of a ticket.
///
/// Every field is optional because the authority has shipped several
/// response shapes; missing data is handled by the verifier.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteTicketView {
    #[serde(default, alias = "festId")]
    pub fest_id: Option<Uuid>,

    /// Null until the ticket has been consumed
    #[serde(default, alias = "usedAt")]
    pub used_at: Option<DateTime<Utc>>,

    #[serde(default, alias = "attendeeName")]
    pub attendee_name: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub user: Option<RemoteTicketUser>,

    /// Set when the authority decided validity itself
    #[serde(default)]
    pub valid: Option<bool>,
}

/// Ticket owner as nested in some authority responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteTicketUser {
    #[serde(default)]
    pub name: Option<String>,
}

/// Decode the body of `GET /tickets/by-ticket-id/:id`.
///
/// Older authority builds wrap the ticket in `{"success": true, "ticket": {...}}`.
/// A body carrying a `ticket` key is always decoded as the wrapped shape, so a
/// malformed wrapped ticket is an error rather than an empty bare ticket.
pub fn decode_ticket(body: &[u8]) -> Result<RemoteTicketView, serde_json::Error> {
    let mut value: serde_json::Value = serde_json::from_slice(body)?;

    match value.get_mut("ticket") {
        Some(ticket) => serde_json::from_value(ticket.take()),
        None => serde_json::from_value(value),
    }
}

/// Body of `PATCH /tickets/:id/mark-used`.
#[derive(Debug, Clone, Serialize)]
pub struct MarkUsedRequest {
    pub used_at: DateTime<Utc>,
    pub scanned_by: Uuid,
}

type NameExtractor = fn(&RemoteTicketView) -> Option<&str>;

/// Sources tried, in this order, when resolving an attendee's display name.
///
/// 1. `attendee_name`
/// 2. `name`
/// 3. `user.name`
pub const ATTENDEE_NAME_EXTRACTORS: [NameExtractor; 3] =
    [explicit_attendee_name, generic_name, nested_user_name];

fn explicit_attendee_name(ticket: &RemoteTicketView) -> Option<&str> {
    ticket.attendee_name.as_deref()
}

fn generic_name(ticket: &RemoteTicketView) -> Option<&str> {
    ticket.name.as_deref()
}

fn nested_user_name(ticket: &RemoteTicketView) -> Option<&str> {
    ticket.user.as_ref().and_then(|user| user.name.as_deref())
}

impl RemoteTicketView {
    /// Display name for the ticket holder.
    ///
    /// The first non-blank value from [`ATTENDEE_NAME_EXTRACTORS`] wins,
    /// otherwise `"Guest"`. Names longer than the ledger column are cut to
    /// [`MAX_ATTENDEE_NAME_LEN`] characters.
    pub fn attendee_display_name(&self) -> String {
        let name = ATTENDEE_NAME_EXTRACTORS
            .iter()
            .filter_map(|extract| extract(self))
            .map(str::trim)
            .find(|name| !name.is_empty())
            .unwrap_or(GUEST_NAME);

        match name.char_indices().nth(MAX_ATTENDEE_NAME_LEN) {
            Some((cut, _)) => name[..cut].trim_end().to_string(),
            None => name.to_string(),
        }
    }
}

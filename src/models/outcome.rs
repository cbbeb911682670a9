//! Result of a check-in verification.
//!
//! A `ScanOutcome` separates expected denials (`valid: false` with a reason,
//! served as 200) from conditions the scanner should retry (`retryable: true`,
//! served as 429 or 503). Internal failures never become an outcome; they are
//! raised as [`crate::error::AppError`] and rendered with `success: false`.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::scan_record::ScanRecord;

/// Why a scan did not grant entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanReason {
    /// The ticket was consumed before (locally or according to the authority)
    AlreadyUsed,
    /// The ticket belongs to a different fest
    WrongEvent,
    /// The authority does not know the ticket
    NotFound,
    /// The authority rejected the ticket, or returned one it could not place
    Invalid,
    /// The authority kept rate limiting us after every retry
    ServerBusy,
    /// The authority timed out, could not be reached, or failed
    AuthorityUnavailable,
}

impl ScanReason {
    fn message(&self) -> &'static str {
        match self {
            ScanReason::AlreadyUsed => "Ticket already used",
            ScanReason::WrongEvent => "Ticket belongs to a different event",
            ScanReason::NotFound => "Ticket not found in system",
            ScanReason::Invalid => "Invalid ticket",
            ScanReason::ServerBusy => "Server busy, please scan again",
            ScanReason::AuthorityUnavailable => "Ticket service unavailable, please scan again",
        }
    }
}

/// Structured result of a verify call.
///
/// # JSON Example
///
/// ```json
/// {
///   "success": true,
///   "valid": false,
///   "reason": "already_used",
///   "record": { "ticket_id": "TKT-1", "status": "valid", "...": "..." },
///   "message": "Ticket already used"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub success: bool,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ScanReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ScanRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
    pub message: String,
}

impl ScanOutcome {
    /// Entry granted.
    pub fn granted(record: ScanRecord) -> Self {
        Self {
            success: true,
            valid: true,
            reason: None,
            record: Some(record),
            retryable: None,
            used_at: None,
            message: "Valid entry".to_string(),
        }
    }

    /// Expected denial.
    pub fn denied(reason: ScanReason, record: Option<ScanRecord>) -> Self {
        Self {
            success: true,
            valid: false,
            reason: Some(reason),
            record,
            retryable: None,
            used_at: None,
            message: reason.message().to_string(),
        }
    }

    /// The ticket was consumed before; `used_at` is known when the authority reported it.
    pub fn already_used(record: Option<ScanRecord>, used_at: Option<DateTime<Utc>>) -> Self {
        Self {
            used_at: used_at.or_else(|| record.as_ref().map(|r| r.scanned_at)),
            ..Self::denied(ScanReason::AlreadyUsed, record)
        }
    }

    /// No decision could be reached; the scanner should try again.
    pub fn retry_later(reason: ScanReason) -> Self {
        Self {
            retryable: Some(true),
            ..Self::denied(reason, None)
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable.unwrap_or(false)
    }

    /// HTTP status the outcome is served with.
    ///
    /// - Decided outcomes (granted or denied) → 200 OK
    /// - `server_busy` → 429 Too Many Requests
    /// - `authority_unavailable` → 503 Service Unavailable
    pub fn status_code(&self) -> StatusCode {
        match self.reason {
            Some(ScanReason::ServerBusy) => StatusCode::TOO_MANY_REQUESTS,
            Some(ScanReason::AuthorityUnavailable) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::OK,
        }
    }
}

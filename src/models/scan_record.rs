//! Scan ledger data models and API request types.
//!
//! This module defines:
//! - `ScanRecord`: Database entity representing one recorded scan decision
//! - `ScanStatus`: The closed set of decisions a scan can be recorded with
//! - `ScanStats`: Per-fest aggregate counts
//! - Request bodies for the scan endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Placeholder used when no attendee name can be resolved.
pub const GUEST_NAME: &str = "Guest";

/// Longest attendee name `scan_logs.attendee_name` holds, in characters.
pub const MAX_ATTENDEE_NAME_LEN: usize = 255;

/// Decision recorded for a scan attempt.
///
/// Stored as text in `scan_logs.status` (guarded by a CHECK constraint).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// Entry granted. At most one per (fest, ticket).
    Valid,
    /// Ticket had already been consumed when presented.
    AlreadyUsed,
    /// Entry refused (wrong event, unknown ticket, manual denial).
    Denied,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Valid => "valid",
            ScanStatus::AlreadyUsed => "already_used",
            ScanStatus::Denied => "denied",
        }
    }
}

impl TryFrom<String> for ScanStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "valid" => Ok(ScanStatus::Valid),
            "already_used" => Ok(ScanStatus::AlreadyUsed),
            "denied" => Ok(ScanStatus::Denied),
            other => Err(format!("unknown scan status '{other}'")),
        }
    }
}

/// Represents a scan record from the database.
///
/// # Database Table
///
/// Maps to the `scan_logs` table. Rows are append-only: this service never
/// updates or deletes them. A partial unique index on
/// `(fest_id, ticket_id) WHERE status = 'valid'` guarantees at most one
/// granted entry per ticket and fest.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Unique identifier for this record
    pub id: Uuid,

    /// Fest (event) the ticket was presented at
    pub fest_id: Uuid,

    /// Identifier of the presented ticket, as encoded in the QR code
    pub ticket_id: String,

    /// Best-effort display name, `"Guest"` when unresolved
    pub attendee_name: String,

    /// Decision taken for this scan
    #[sqlx(try_from = "String")]
    pub status: ScanStatus,

    /// Host account that performed the scan
    pub scanned_by: Uuid,

    /// When the decision was recorded. Never changes afterwards.
    pub scanned_at: DateTime<Utc>,
}

/// A scan decision about to be written to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct NewScanRecord {
    pub fest_id: Uuid,
    pub ticket_id: String,
    pub attendee_name: String,
    pub status: ScanStatus,
    pub scanned_by: Uuid,
}

/// Aggregate scan counts for one fest.
///
/// `valid + already_used + denied == total` always holds since the status
/// set is closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct ScanStats {
    pub valid: i64,
    pub denied: i64,
    pub already_used: i64,
    pub total: i64,
}

/// Request body for `POST /api/scan/verify`.
///
/// ```json
/// {
///   "ticketId": "TKT-5XQ2-91",
///   "festId": "550e8400-e29b-41d4-a716-446655440000"
/// }
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyScanRequest {
    pub ticket_id: String,
    pub fest_id: Uuid,
}

/// Request body for `POST /api/scan/log-denied`.
///
/// `attendeeName` is optional; the placeholder name is stored when missing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogDeniedRequest {
    pub ticket_id: String,
    pub fest_id: Uuid,
    #[serde(default)]
    pub attendee_name: Option<String>,
}

/// Query string for `GET /api/scan/recent-scans/{festId}`.
#[derive(Debug, Default, Deserialize)]
pub struct RecentScansQuery {
    pub limit: Option<i64>,
}

/// Response body for `GET /api/scan/fest-stats/{festId}`.
#[derive(Debug, Serialize)]
pub struct FestStatsResponse {
    pub success: bool,
    pub fest_id: Uuid,
    pub scans: ScanStats,
}

/// Response body for `GET /api/scan/recent-scans/{festId}`.
#[derive(Debug, Serialize)]
pub struct RecentScansResponse {
    pub success: bool,
    pub scans: Vec<ScanRecord>,
}

/// Response body for `POST /api/scan/log-denied`.
#[derive(Debug, Serialize)]
pub struct LogDeniedResponse {
    pub success: bool,
    pub record: ScanRecord,
}

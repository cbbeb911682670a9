//! Check-in verification - Core logic of the QR-scan flow.
//!
//! This service handles:
//! - Duplicate-scan absorption through the outcome cache
//! - Idempotency against the scan ledger
//! - Ticket verification against the remote ticket authority, with backoff
//! - Recording every decided scan in the ledger
//! - Propagating successful check-ins back to the authority
//!
//! # Verification Order
//!
//! 1. Outcome cache (no ledger or authority access on a hit)
//! 2. Ledger: an existing `valid` record means the ticket was already used
//! 3. Authority fetch, retried with backoff while rate limited
//! 4. Cross-checks: fest, usage, validity
//! 5. Compare-and-insert of the `valid` record
//! 6. Detached mark-used call to the authority
//!
//! # Upstream Failures
//!
//! The service fails closed: when the authority times out or cannot be
//! reached, the scan is neither admitted nor recorded, and the scanner gets a
//! retryable `authority_unavailable` outcome. A 404 is a decided denial.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        outcome::{ScanOutcome, ScanReason},
        remote_ticket::{MarkUsedRequest, RemoteTicketView},
        scan_record::{
            GUEST_NAME, MAX_ATTENDEE_NAME_LEN, NewScanRecord, ScanRecord, ScanStats, ScanStatus,
        },
    },
    services::{
        authority::{AuthorityError, TicketAuthority},
        backoff::BackoffPolicy,
        cache::{OutcomeCache, ScanKey},
        ledger::ScanLedger,
    },
};

/// Longest ticket identifier accepted from a scanner.
const MAX_TICKET_ID_LEN: usize = 128;

/// Default and maximum page sizes for recent scans.
pub const DEFAULT_RECENT_LIMIT: i64 = 20;
pub const MAX_RECENT_LIMIT: i64 = 100;

/// What the authority's view of a ticket means for this fest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Admit,
    Used(DateTime<Utc>),
    Deny(ScanReason),
}

/// Cross-check an authority ticket against the fest being checked into.
fn judge(fest_id: Uuid, ticket: &RemoteTicketView) -> Verdict {
    match ticket.fest_id {
        Some(ticket_fest) if ticket_fest != fest_id => return Verdict::Deny(ScanReason::WrongEvent),
        // A ticket that cannot be placed at any fest is not admitted anywhere
        None => return Verdict::Deny(ScanReason::Invalid),
        Some(_) => {}
    }

    if let Some(used_at) = ticket.used_at {
        return Verdict::Used(used_at);
    }

    if ticket.valid == Some(false) {
        return Verdict::Deny(ScanReason::Invalid);
    }

    Verdict::Admit
}

/// Trim and validate a scanned ticket identifier.
fn normalize_ticket_id(ticket_id: &str) -> Result<&str, AppError> {
    let ticket_id = ticket_id.trim();

    if ticket_id.is_empty() {
        return Err(AppError::InvalidRequest("ticketId is required".to_string()));
    }

    if ticket_id.len() > MAX_TICKET_ID_LEN {
        return Err(AppError::InvalidRequest(format!(
            "ticketId must be at most {MAX_TICKET_ID_LEN} characters"
        )));
    }

    Ok(ticket_id)
}

/// Decides whether a scanned ticket grants entry, exactly once.
///
/// All collaborators are injected so the verifier can run against the real
/// PostgreSQL ledger and HTTP authority, or against in-memory fakes.
pub struct ScanVerifier {
    ledger: Arc<dyn ScanLedger>,
    authority: Arc<dyn TicketAuthority>,
    cache: Arc<dyn OutcomeCache>,
    backoff: BackoffPolicy,
}

impl ScanVerifier {
    pub fn new(
        ledger: Arc<dyn ScanLedger>,
        authority: Arc<dyn TicketAuthority>,
        cache: Arc<dyn OutcomeCache>,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            ledger,
            authority,
            cache,
            backoff,
        }
    }

    /// Verify a scanned ticket for a fest.
    ///
    /// # Arguments
    ///
    /// * `fest_id` - Fest the attendee is entering
    /// * `ticket_id` - Identifier read from the QR code
    /// * `scanned_by` - Host performing the scan
    /// * `bearer` - Host credentials forwarded to the ticket authority
    ///
    /// # Returns
    ///
    /// A decided outcome (granted or denied) or a retryable one when the
    /// authority is busy or unavailable.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest`: ticket id is blank or too long
    /// - `Database`: the ledger could not be read or written; nothing is
    ///   reported as admitted without a durable record
    pub async fn verify(
        &self,
        fest_id: Uuid,
        ticket_id: &str,
        scanned_by: Uuid,
        bearer: &str,
    ) -> Result<ScanOutcome, AppError> {
        let ticket_id = normalize_ticket_id(ticket_id)?;

        self.decide(fest_id, ticket_id, scanned_by, bearer)
            .await
            .inspect_err(|error| {
                tracing::error!(
                    %fest_id,
                    ticket_id,
                    %scanned_by,
                    error = %error,
                    "Scan verification failed"
                );
            })
    }

    async fn decide(
        &self,
        fest_id: Uuid,
        ticket_id: &str,
        scanned_by: Uuid,
        bearer: &str,
    ) -> Result<ScanOutcome, AppError> {
        let key = ScanKey::new(fest_id, ticket_id);

        // Step 1: Duplicate scan within the cache window
        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!(%fest_id, ticket_id, "Scan answered from cache");
            return Ok(cached);
        }

        // Step 2: Entry already granted according to the ledger
        if let Some(existing) = self.ledger.find_valid(fest_id, ticket_id).await? {
            tracing::info!(%fest_id, ticket_id, "Ticket already checked in");
            let outcome = ScanOutcome::already_used(Some(existing), None);
            self.cache.put(key, outcome.clone()).await;
            return Ok(outcome);
        }

        // Step 3: Ask the authority
        let ticket = match self.fetch_with_backoff(ticket_id, bearer).await {
            Ok(ticket) => ticket,
            Err(AuthorityError::RateLimited) => {
                tracing::warn!(
                    %fest_id,
                    ticket_id,
                    attempts = self.backoff.max_attempts(),
                    "Ticket authority still rate limiting, giving up"
                );
                return Ok(ScanOutcome::retry_later(ScanReason::ServerBusy));
            }
            Err(AuthorityError::NotFound) => {
                let outcome = self
                    .record_denial(fest_id, ticket_id, GUEST_NAME, scanned_by, ScanReason::NotFound)
                    .await?;
                self.cache.put(key, outcome.clone()).await;
                return Ok(outcome);
            }
            Err(error) => {
                tracing::warn!(
                    %fest_id,
                    ticket_id,
                    error = %error,
                    "Ticket authority unavailable, scan not decided"
                );
                return Ok(ScanOutcome::retry_later(ScanReason::AuthorityUnavailable));
            }
        };

        // Step 4: Cross-checks
        let attendee_name = ticket.attendee_display_name();

        let outcome = match judge(fest_id, &ticket) {
            Verdict::Deny(reason) => {
                self.record_denial(fest_id, ticket_id, &attendee_name, scanned_by, reason)
                    .await?
            }
            Verdict::Used(used_at) => {
                let record = self
                    .ledger
                    .record_decision(&NewScanRecord {
                        fest_id,
                        ticket_id: ticket_id.to_string(),
                        attendee_name,
                        status: ScanStatus::AlreadyUsed,
                        scanned_by,
                    })
                    .await?;
                ScanOutcome::already_used(Some(record), Some(used_at))
            }
            Verdict::Admit => {
                return self
                    .admit(key, ticket_id, attendee_name, scanned_by, bearer)
                    .await;
            }
        };

        self.cache.put(key, outcome.clone()).await;
        Ok(outcome)
    }

    /// Commit a `valid` record and notify the authority.
    async fn admit(
        &self,
        key: ScanKey,
        ticket_id: &str,
        attendee_name: String,
        scanned_by: Uuid,
        bearer: &str,
    ) -> Result<ScanOutcome, AppError> {
        let fest_id = key.fest_id;

        let inserted = self
            .ledger
            .record_valid(&NewScanRecord {
                fest_id,
                ticket_id: ticket_id.to_string(),
                attendee_name,
                status: ScanStatus::Valid,
                scanned_by,
            })
            .await?;

        let Some(record) = inserted else {
            // A concurrent scan of the same ticket committed first
            tracing::info!(%fest_id, ticket_id, "Lost check-in race, ticket already used");
            let existing = self.ledger.find_valid(fest_id, ticket_id).await?;
            let outcome = ScanOutcome::already_used(existing, None);
            self.cache.put(key, outcome.clone()).await;
            return Ok(outcome);
        };

        tracing::info!(
            %fest_id,
            ticket_id,
            %scanned_by,
            attendee = %record.attendee_name,
            "Ticket checked in"
        );

        // Later scans of this ticket must see it as used
        self.cache
            .put(key, ScanOutcome::already_used(Some(record.clone()), None))
            .await;

        self.spawn_mark_used(&record, bearer);

        Ok(ScanOutcome::granted(record))
    }

    /// Record a denied scan and build the matching outcome.
    async fn record_denial(
        &self,
        fest_id: Uuid,
        ticket_id: &str,
        attendee_name: &str,
        scanned_by: Uuid,
        reason: ScanReason,
    ) -> Result<ScanOutcome, AppError> {
        tracing::info!(%fest_id, ticket_id, ?reason, "Entry denied");

        let record = self
            .ledger
            .record_decision(&NewScanRecord {
                fest_id,
                ticket_id: ticket_id.to_string(),
                attendee_name: attendee_name.to_string(),
                status: ScanStatus::Denied,
                scanned_by,
            })
            .await?;

        Ok(ScanOutcome::denied(reason, Some(record)))
    }

    /// Fetch a ticket, backing off while the authority answers 429.
    async fn fetch_with_backoff(
        &self,
        ticket_id: &str,
        bearer: &str,
    ) -> Result<RemoteTicketView, AuthorityError> {
        let mut attempt = 1;

        loop {
            match self.authority.fetch_ticket(ticket_id, bearer).await {
                Err(AuthorityError::RateLimited) if self.backoff.should_retry(attempt) => {
                    let delay = self.backoff.delay(attempt);
                    tracing::warn!(ticket_id, attempt, ?delay, "Ticket authority rate limited, backing off");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Tell the authority the ticket was used, without delaying the response.
    ///
    /// The ledger record is authoritative for entry; a failure here is only
    /// logged for reconciliation.
    fn spawn_mark_used(&self, record: &ScanRecord, bearer: &str) {
        let authority = Arc::clone(&self.authority);
        let fest_id = record.fest_id;
        let ticket_id = record.ticket_id.clone();
        let bearer = bearer.to_string();
        let request = MarkUsedRequest {
            used_at: record.scanned_at,
            scanned_by: record.scanned_by,
        };

        tokio::spawn(async move {
            if let Err(error) = authority.mark_used(&ticket_id, &request, &bearer).await {
                tracing::warn!(
                    %fest_id,
                    ticket_id,
                    error = %error,
                    "Failed to mark ticket used at authority, needs reconciliation"
                );
            }
        });
    }

    /// Record a manual denial.
    ///
    /// Always appends a `denied` record, whatever the ledger already holds
    /// for this ticket. Blank names fall back to the placeholder; names over
    /// [`MAX_ATTENDEE_NAME_LEN`] characters are rejected.
    pub async fn log_denied(
        &self,
        fest_id: Uuid,
        ticket_id: &str,
        attendee_name: Option<&str>,
        scanned_by: Uuid,
    ) -> Result<ScanRecord, AppError> {
        let ticket_id = normalize_ticket_id(ticket_id)?;
        let attendee_name = attendee_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(GUEST_NAME);

        if attendee_name.chars().count() > MAX_ATTENDEE_NAME_LEN {
            return Err(AppError::InvalidRequest(format!(
                "attendeeName must be at most {MAX_ATTENDEE_NAME_LEN} characters"
            )));
        }

        let record = self
            .ledger
            .record_decision(&NewScanRecord {
                fest_id,
                ticket_id: ticket_id.to_string(),
                attendee_name: attendee_name.to_string(),
                status: ScanStatus::Denied,
                scanned_by,
            })
            .await
            .inspect_err(|error| {
                tracing::error!(%fest_id, ticket_id, error = %error, "Failed to log denied entry");
            })?;

        tracing::info!(%fest_id, ticket_id, %scanned_by, "Denied entry logged");

        Ok(record)
    }

    /// Scan counts for a fest.
    pub async fn stats(&self, fest_id: Uuid) -> Result<ScanStats, AppError> {
        self.ledger.stats(fest_id).await
    }

    /// Most recent scans for a fest, newest first.
    ///
    /// `limit` defaults to 20 and is clamped to 1..=100.
    pub async fn recent(
        &self,
        fest_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<ScanRecord>, AppError> {
        let limit = limit
            .unwrap_or(DEFAULT_RECENT_LIMIT)
            .clamp(1, MAX_RECENT_LIMIT);

        self.ledger.recent(fest_id, limit).await
    }
}

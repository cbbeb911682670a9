//! Scan ledger: durable record of every scan decision.
//!
//! The ledger is the local idempotency boundary of the check-in flow. The
//! PostgreSQL implementation relies on the partial unique index
//! `scan_logs_one_valid_per_ticket` so that two concurrent check-ins of the
//! same ticket can never both be recorded as `valid`.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::scan_record::{NewScanRecord, ScanRecord, ScanStats, ScanStatus},
};

/// Storage operations needed by the check-in flow.
#[async_trait]
pub trait ScanLedger: Send + Sync {
    /// The `valid` record for this ticket at this fest, if entry was already granted.
    async fn find_valid(&self, fest_id: Uuid, ticket_id: &str)
    -> Result<Option<ScanRecord>, AppError>;

    /// Compare-and-insert a `valid` record.
    ///
    /// Returns `None` when another `valid` record for the same (fest, ticket)
    /// already exists, i.e. a concurrent check-in won the race.
    async fn record_valid(&self, scan: &NewScanRecord) -> Result<Option<ScanRecord>, AppError>;

    /// Unconditionally append a `denied` or `already_used` record.
    async fn record_decision(&self, scan: &NewScanRecord) -> Result<ScanRecord, AppError>;

    /// Counts per status for a fest.
    async fn stats(&self, fest_id: Uuid) -> Result<ScanStats, AppError>;

    /// Most recent records for a fest, newest first.
    async fn recent(&self, fest_id: Uuid, limit: i64) -> Result<Vec<ScanRecord>, AppError>;
}

/// PostgreSQL-backed ledger over the `scan_logs` table.
#[derive(Debug, Clone)]
pub struct PgScanLedger {
    pool: DbPool,
}

impl PgScanLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScanLedger for PgScanLedger {
    async fn find_valid(
        &self,
        fest_id: Uuid,
        ticket_id: &str,
    ) -> Result<Option<ScanRecord>, AppError> {
        let record = sqlx::query_as::<_, ScanRecord>(
            r#"
            SELECT id, fest_id, ticket_id, attendee_name, status, scanned_by, scanned_at
            FROM scan_logs
            WHERE fest_id = $1 AND ticket_id = $2 AND status = 'valid'
            LIMIT 1
            "#,
        )
        .bind(fest_id)
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn record_valid(&self, scan: &NewScanRecord) -> Result<Option<ScanRecord>, AppError> {
        // The conflict target matches the partial unique index, so a losing
        // concurrent insert returns no row instead of failing
        let record = sqlx::query_as::<_, ScanRecord>(
            r#"
            INSERT INTO scan_logs (fest_id, ticket_id, attendee_name, status, scanned_by)
            VALUES ($1, $2, $3, 'valid', $4)
            ON CONFLICT (fest_id, ticket_id) WHERE status = 'valid' DO NOTHING
            RETURNING id, fest_id, ticket_id, attendee_name, status, scanned_by, scanned_at
            "#,
        )
        .bind(scan.fest_id)
        .bind(&scan.ticket_id)
        .bind(&scan.attendee_name)
        .bind(scan.scanned_by)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn record_decision(&self, scan: &NewScanRecord) -> Result<ScanRecord, AppError> {
        if scan.status == ScanStatus::Valid {
            return Err(AppError::InvalidRequest(
                "valid scans must go through record_valid".to_string(),
            ));
        }

        let record = sqlx::query_as::<_, ScanRecord>(
            r#"
            INSERT INTO scan_logs (fest_id, ticket_id, attendee_name, status, scanned_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, fest_id, ticket_id, attendee_name, status, scanned_by, scanned_at
            "#,
        )
        .bind(scan.fest_id)
        .bind(&scan.ticket_id)
        .bind(&scan.attendee_name)
        .bind(scan.status.as_str())
        .bind(scan.scanned_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn stats(&self, fest_id: Uuid) -> Result<ScanStats, AppError> {
        // Single statement so the counts come from one snapshot
        let stats = sqlx::query_as::<_, ScanStats>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'valid') AS valid,
                COUNT(*) FILTER (WHERE status = 'denied') AS denied,
                COUNT(*) FILTER (WHERE status = 'already_used') AS already_used,
                COUNT(*) AS total
            FROM scan_logs
            WHERE fest_id = $1
            "#,
        )
        .bind(fest_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    async fn recent(&self, fest_id: Uuid, limit: i64) -> Result<Vec<ScanRecord>, AppError> {
        let records = sqlx::query_as::<_, ScanRecord>(
            r#"
            SELECT id, fest_id, ticket_id, attendee_name, status, scanned_by, scanned_at
            FROM scan_logs
            WHERE fest_id = $1
            ORDER BY scanned_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(fest_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

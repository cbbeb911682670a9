//! In-memory stand-ins for the ledger, the ticket authority, the identity
//! provider and the host directory, used by unit and router tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        host::{Host, TokenClaims},
        remote_ticket::{MarkUsedRequest, RemoteTicketView},
        scan_record::{MAX_ATTENDEE_NAME_LEN, NewScanRecord, ScanRecord, ScanStats, ScanStatus},
    },
    services::{
        authority::{AuthorityError, TicketAuthority},
        hosts::HostDirectory,
        identity::IdentityProvider,
        ledger::ScanLedger,
    },
};

/// An unused ticket for `fest_id`, as the authority would return it.
pub fn ticket_for(fest_id: Uuid) -> RemoteTicketView {
    RemoteTicketView {
        fest_id: Some(fest_id),
        attendee_name: Some("Asha Kumar".to_string()),
        ..Default::default()
    }
}

/// Ledger backed by a vector, with the same one-valid-per-ticket guarantee as
/// the partial unique index and the same attendee name column width.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    records: Mutex<Vec<ScanRecord>>,
    fail_writes: AtomicBool,
    reads: AtomicUsize,
}

impl InMemoryLedger {
    /// Make every subsequent write fail like an unreachable database.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn count(&self, status: ScanStatus) -> usize {
        self.lock().iter().filter(|r| r.status == status).count()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Number of read queries served.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ScanRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_writable(&self, scan: &NewScanRecord) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolClosed));
        }
        if scan.attendee_name.chars().count() > MAX_ATTENDEE_NAME_LEN {
            return Err(AppError::Database(sqlx::Error::Protocol(
                "value too long for type character varying(255)".to_string(),
            )));
        }
        Ok(())
    }

    fn build(scan: &NewScanRecord) -> ScanRecord {
        ScanRecord {
            id: Uuid::new_v4(),
            fest_id: scan.fest_id,
            ticket_id: scan.ticket_id.clone(),
            attendee_name: scan.attendee_name.clone(),
            status: scan.status,
            scanned_by: scan.scanned_by,
            scanned_at: Utc::now(),
        }
    }
}

#[async_trait]
impl ScanLedger for InMemoryLedger {
    async fn find_valid(
        &self,
        fest_id: Uuid,
        ticket_id: &str,
    ) -> Result<Option<ScanRecord>, AppError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .lock()
            .iter()
            .find(|r| {
                r.fest_id == fest_id && r.ticket_id == ticket_id && r.status == ScanStatus::Valid
            })
            .cloned())
    }

    async fn record_valid(&self, scan: &NewScanRecord) -> Result<Option<ScanRecord>, AppError> {
        self.check_writable(scan)?;

        let mut records = self.lock();
        let taken = records.iter().any(|r| {
            r.fest_id == scan.fest_id
                && r.ticket_id == scan.ticket_id
                && r.status == ScanStatus::Valid
        });
        if taken {
            return Ok(None);
        }

        let record = Self::build(&NewScanRecord {
            status: ScanStatus::Valid,
            ..scan.clone()
        });
        records.push(record.clone());
        Ok(Some(record))
    }

    async fn record_decision(&self, scan: &NewScanRecord) -> Result<ScanRecord, AppError> {
        self.check_writable(scan)?;

        let record = Self::build(scan);
        self.lock().push(record.clone());
        Ok(record)
    }

    async fn stats(&self, fest_id: Uuid) -> Result<ScanStats, AppError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let records = self.lock();
        let mut stats = ScanStats::default();

        for record in records.iter().filter(|r| r.fest_id == fest_id) {
            match record.status {
                ScanStatus::Valid => stats.valid += 1,
                ScanStatus::Denied => stats.denied += 1,
                ScanStatus::AlreadyUsed => stats.already_used += 1,
            }
            stats.total += 1;
        }

        Ok(stats)
    }

    async fn recent(&self, fest_id: Uuid, limit: i64) -> Result<Vec<ScanRecord>, AppError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let limit = usize::try_from(limit).unwrap_or(0);

        // Insertion order stands in for scanned_at
        Ok(self
            .lock()
            .iter()
            .rev()
            .filter(|r| r.fest_id == fest_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Authority that replays scripted fetch results, then a fixed fallback.
#[derive(Debug)]
pub struct ScriptedAuthority {
    script: Mutex<VecDeque<Result<RemoteTicketView, AuthorityError>>>,
    fallback: Result<RemoteTicketView, AuthorityError>,
    fail_mark_used: bool,
    fetch_calls: AtomicUsize,
    marked: Mutex<Vec<MarkUsedRequest>>,
}

impl ScriptedAuthority {
    /// Answer every fetch with `result`.
    pub fn always(result: Result<RemoteTicketView, AuthorityError>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: result,
            fail_mark_used: false,
            fetch_calls: AtomicUsize::new(0),
            marked: Mutex::new(Vec::new()),
        }
    }

    /// Answer the first fetches from `script` before falling back.
    pub fn with_script(self, script: Vec<Result<RemoteTicketView, AuthorityError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..self
        }
    }

    /// Make every mark-used call fail.
    pub fn failing_mark_used(self) -> Self {
        Self {
            fail_mark_used: true,
            ..self
        }
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn mark_used_calls(&self) -> usize {
        self.marked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn last_mark_used(&self) -> Option<MarkUsedRequest> {
        self.marked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

#[async_trait]
impl TicketAuthority for ScriptedAuthority {
    async fn fetch_ticket(
        &self,
        _ticket_id: &str,
        _bearer: &str,
    ) -> Result<RemoteTicketView, AuthorityError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    async fn mark_used(
        &self,
        _ticket_id: &str,
        request: &MarkUsedRequest,
        _bearer: &str,
    ) -> Result<(), AuthorityError> {
        self.marked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if self.fail_mark_used {
            return Err(AuthorityError::Timeout);
        }
        Ok(())
    }
}

/// Identity provider accepting a fixed set of tokens.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    tokens: HashMap<String, TokenClaims>,
}

impl StaticIdentity {
    pub fn with_token(mut self, token: &str, uid: &str) -> Self {
        self.tokens.insert(
            token.to_string(),
            TokenClaims {
                uid: uid.to_string(),
                email: Some(format!("{uid}@example.com")),
            },
        );
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn verify_token(&self, token: &str) -> Result<TokenClaims, AppError> {
        self.tokens.get(token).cloned().ok_or(AppError::Unauthorized)
    }
}

/// Host directory over fixed hosts and fest ownership pairs.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    hosts: Vec<Host>,
    fests: Vec<(Uuid, Uuid)>,
}

impl StaticDirectory {
    pub fn with_host(mut self, host_id: Uuid, uid: &str) -> Self {
        self.hosts.push(Host {
            id: host_id,
            firebase_uid: uid.to_string(),
            email: None,
            is_active: true,
        });
        self
    }

    pub fn with_fest(mut self, fest_id: Uuid, host_id: Uuid) -> Self {
        self.fests.push((fest_id, host_id));
        self
    }
}

#[async_trait]
impl HostDirectory for StaticDirectory {
    async fn find_active_host(&self, uid: &str) -> Result<Option<Host>, AppError> {
        Ok(self
            .hosts
            .iter()
            .find(|h| h.firebase_uid == uid && h.is_active)
            .cloned())
    }

    async fn fest_belongs_to(&self, fest_id: Uuid, host_id: Uuid) -> Result<bool, AppError> {
        Ok(self.fests.contains(&(fest_id, host_id)))
    }
}

//! Short-lived cache of scan outcomes.
//!
//! Absorbs bursts of duplicate scans of the same ticket (double taps,
//! several scanners at one gate) without touching the ledger or the ticket
//! authority. Entries expire by absolute age; there is no size-based eviction
//! since the working set is one entry per ticket scanned within the TTL.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::Instant;
use uuid::Uuid;

use crate::models::outcome::ScanOutcome;

/// Cache key: one entry per (fest, ticket).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanKey {
    pub fest_id: Uuid,
    pub ticket_id: String,
}

impl ScanKey {
    pub fn new(fest_id: Uuid, ticket_id: impl Into<String>) -> Self {
        Self {
            fest_id,
            ticket_id: ticket_id.into(),
        }
    }
}

/// Storage for recently decided outcomes.
///
/// Injected into the verifier so deployments can swap the in-process map for
/// a shared cache, and tests can disable caching with [`NoopCache`].
#[async_trait]
pub trait OutcomeCache: Send + Sync {
    /// Outcome stored for `key`, unless missing or expired.
    async fn get(&self, key: &ScanKey) -> Option<ScanOutcome>;

    /// Store `outcome` for `key`, replacing any previous entry wholesale.
    async fn put(&self, key: ScanKey, outcome: ScanOutcome);
}

#[derive(Debug)]
struct CachedOutcome {
    outcome: ScanOutcome,
    cached_at: Instant,
}

impl CachedOutcome {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() >= ttl
    }
}

/// In-process cache with a fixed time-to-live.
///
/// Entries are immutable once written and shared through `Arc`, so the lock
/// is only held long enough to clone a pointer or swap one in.
#[derive(Debug)]
pub struct TtlCache {
    ttl: Duration,
    entries: RwLock<HashMap<ScanKey, Arc<CachedOutcome>>>,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of entries currently held, expired ones included.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl OutcomeCache for TtlCache {
    async fn get(&self, key: &ScanKey) -> Option<ScanOutcome> {
        let entry = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()?;

        if entry.is_expired(self.ttl) {
            return None;
        }

        Some(entry.outcome.clone())
    }

    async fn put(&self, key: ScanKey, outcome: ScanOutcome) {
        let entry = Arc::new(CachedOutcome {
            outcome,
            cached_at: Instant::now(),
        });

        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        // Purge on write so expired entries do not accumulate
        entries.retain(|_, cached| !cached.is_expired(self.ttl));
        entries.insert(key, entry);
    }
}

/// Cache that never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

#[async_trait]
impl OutcomeCache for NoopCache {
    async fn get(&self, _key: &ScanKey) -> Option<ScanOutcome> {
        None
    }

    async fn put(&self, _key: ScanKey, _outcome: ScanOutcome) {}
}

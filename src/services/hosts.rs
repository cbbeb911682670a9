//! Host directory: who is signed in, and which fests they run.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{db::DbPool, error::AppError, models::host::Host};

/// Read access to host profiles and fest ownership.
#[async_trait]
pub trait HostDirectory: Send + Sync {
    /// Active host profile linked to an identity provider uid.
    async fn find_active_host(&self, uid: &str) -> Result<Option<Host>, AppError>;

    /// Whether `fest_id` exists and is run by `host_id`.
    async fn fest_belongs_to(&self, fest_id: Uuid, host_id: Uuid) -> Result<bool, AppError>;
}

/// PostgreSQL-backed directory over the `hosts` and `fests` tables.
#[derive(Debug, Clone)]
pub struct PgHostDirectory {
    pool: DbPool,
}

impl PgHostDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HostDirectory for PgHostDirectory {
    async fn find_active_host(&self, uid: &str) -> Result<Option<Host>, AppError> {
        let host = sqlx::query_as::<_, Host>(
            "SELECT id, firebase_uid, email, is_active
             FROM hosts
             WHERE firebase_uid = $1 AND is_active = true",
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(host)
    }

    async fn fest_belongs_to(&self, fest_id: Uuid, host_id: Uuid) -> Result<bool, AppError> {
        let owned: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM fests WHERE id = $1 AND host_id = $2)")
                .bind(fest_id)
                .bind(host_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(owned)
    }
}

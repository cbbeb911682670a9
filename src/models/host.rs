//! Host (event organizer) model used for authentication.
//!
//! Hosts sign in through the identity provider. The provider's user id is
//! stored as `firebase_uid` on the host profile, which is how an incoming
//! token is tied to a host account.

use uuid::Uuid;

/// Represents a host record from the database.
///
/// # Database Table
///
/// Maps to the `hosts` table (owned by the host management service, read-only here):
/// - `id`: Unique identifier (UUID)
/// - `firebase_uid`: Identity provider user id
/// - `email`: Sign-in email
/// - `is_active`: Whether the host may use the platform
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Host {
    pub id: Uuid,

    pub firebase_uid: String,

    pub email: Option<String>,

    /// Inactive hosts are rejected during authentication.
    pub is_active: bool,
}

/// Claims returned by the identity provider for a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub uid: String,
    pub email: Option<String>,
}

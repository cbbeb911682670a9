//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::services::backoff::BackoffPolicy;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `AUTHORITY_BASE_URL` (required): base URL of the ticket-issuing backend
/// - `IDENTITY_API_KEY` (required): web API key for the identity provider
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `AUTHORITY_TIMEOUT_SECS` (optional): per-call timeout towards the authority, defaults to 6
/// - `AUTHORITY_MAX_ATTEMPTS` (optional): attempts when rate limited, defaults to 3
/// - `AUTHORITY_BACKOFF_BASE_MS` / `AUTHORITY_BACKOFF_MAX_MS` (optional): 1000 / 3000
/// - `IDENTITY_TIMEOUT_SECS` (optional): per-call timeout towards the identity provider, defaults to 5
/// - `SCAN_CACHE_TTL_SECS` (optional): duplicate-scan cache lifetime, defaults to 300
/// - `REQUEST_TIMEOUT_SECS` (optional): overall request timeout, defaults to 30
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_true")]
    pub run_migrations: bool,

    pub authority_base_url: Url,

    #[serde(default = "default_authority_timeout_secs")]
    pub authority_timeout_secs: u64,

    #[serde(default = "default_authority_max_attempts")]
    pub authority_max_attempts: u32,

    #[serde(default = "default_backoff_base_ms")]
    pub authority_backoff_base_ms: u64,

    #[serde(default = "default_backoff_max_ms")]
    pub authority_backoff_max_ms: u64,

    #[serde(default = "default_cache_ttl_secs")]
    pub scan_cache_ttl_secs: u64,

    pub identity_api_key: String,

    #[serde(default = "default_identity_base_url")]
    pub identity_base_url: Url,

    #[serde(default = "default_identity_timeout_secs")]
    pub identity_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

fn default_authority_timeout_secs() -> u64 {
    6
}

fn default_authority_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_backoff_max_ms() -> u64 {
    3000
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_identity_base_url() -> Url {
    Url::parse("https://identitytoolkit.googleapis.com/").expect("static identity URL is valid")
}

fn default_identity_timeout_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }

    /// Timeout applied to every single call made to the ticket authority.
    pub fn authority_timeout(&self) -> Duration {
        Duration::from_secs(self.authority_timeout_secs)
    }

    /// Timeout applied to every token lookup at the identity provider.
    pub fn identity_timeout(&self) -> Duration {
        Duration::from_secs(self.identity_timeout_secs)
    }

    /// Timeout applied to a whole HTTP request, authority retries included.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn scan_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.scan_cache_ttl_secs)
    }

    /// Backoff used when the authority answers 429.
    pub fn authority_backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            self.authority_max_attempts,
            Duration::from_millis(self.authority_backoff_base_ms),
            Duration::from_millis(self.authority_backoff_max_ms),
        )
    }
}

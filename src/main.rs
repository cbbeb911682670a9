//! Fest Check-in Gateway - Main Application Entry Point
//!
//! REST gateway used by fest hosts at the gate. Scanners post ticket ids read
//! from QR codes; the gateway verifies them against the remote ticket
//! authority, records every decision, and grants entry at most once per ticket.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx, `scan_logs` ledger
//! - **Ticket Authority**: reqwest client with per-call timeout and 429 backoff
//! - **Authentication**: identity provider ID tokens tied to host profiles
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations (unless `RUN_MIGRATIONS=false`)
//! 4. Wire the verifier, identity provider and host directory
//! 5. Start server on configured port

mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
mod state;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use services::{
    authority::HttpTicketAuthority, cache::TtlCache, hosts::PgHostDirectory,
    identity::FirebaseIdentity, ledger::PgScanLedger, scan_service::ScanVerifier,
};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!(
        authority = %config.authority_base_url,
        cache_ttl_secs = config.scan_cache_ttl_secs,
        "Configuration loaded"
    );

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database pool created");

    if config.run_migrations {
        db::run_migrations(&pool).await?;
        tracing::info!("Database migrations complete");
    }

    let authority = HttpTicketAuthority::new(
        config.authority_base_url.clone(),
        config.authority_timeout(),
    )?;

    let verifier = ScanVerifier::new(
        Arc::new(PgScanLedger::new(pool.clone())),
        Arc::new(authority),
        Arc::new(TtlCache::new(config.scan_cache_ttl())),
        config.authority_backoff(),
    );

    let identity = FirebaseIdentity::new(
        &config.identity_base_url,
        &config.identity_api_key,
        config.identity_timeout(),
    )?;

    let state = AppState {
        pool: pool.clone(),
        verifier: Arc::new(verifier),
        identity: Arc::new(identity),
        hosts: Arc::new(PgHostDirectory::new(pool)),
    };

    let app = routes::router(state, config.request_timeout());

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

//! HTTP request handlers (route handlers).

/// Liveness and database connectivity
pub mod health;

/// Check-in endpoints
pub mod scans;

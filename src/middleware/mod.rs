//! HTTP middleware components.

/// Host authentication through the identity provider
pub mod auth;

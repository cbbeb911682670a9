//! Shared application state handed to every handler and middleware.

use std::sync::Arc;

use crate::{
    db::DbPool,
    services::{hosts::HostDirectory, identity::IdentityProvider, scan_service::ScanVerifier},
};

#[derive(Clone)]
pub struct AppState {
    /// Used directly only by the health check.
    pub pool: DbPool,
    pub verifier: Arc<ScanVerifier>,
    pub identity: Arc<dyn IdentityProvider>,
    pub hosts: Arc<dyn HostDirectory>,
}

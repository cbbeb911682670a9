//! Business logic services.
//!
//! The check-in flow lives in [`scan_service`]; the other modules are the
//! collaborators it is wired to (ledger, cache, ticket authority) plus the
//! identity and host lookups used by authentication.

pub mod authority;
pub mod backoff;
pub mod cache;
pub mod hosts;
pub mod identity;
pub mod ledger;
pub mod scan_service;

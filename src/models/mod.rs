//! Data models representing database entities and API payloads.
//!
//! This module contains all data structures that map to database tables,
//! remote service payloads, and request/response bodies.

/// Host profile and identity claims
pub mod host;
/// Verification result returned to scanners
pub mod outcome;
/// Ticket projection served by the ticket authority
pub mod remote_ticket;
/// Scan ledger records
pub mod scan_record;

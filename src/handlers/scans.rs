//! Check-in HTTP handlers.
//!
//! This module implements the scan endpoints used by gate staff:
//! - POST /api/scan/verify - Verify a scanned ticket
//! - GET /api/scan/fest-stats/{festId} - Scan counts for a fest
//! - GET /api/scan/recent-scans/{festId} - Latest scans for a fest
//! - POST /api/scan/log-denied - Record a manual denial
//!
//! Every endpoint is restricted to the host that owns the fest.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        outcome::ScanOutcome,
        scan_record::{
            FestStatsResponse, LogDeniedRequest, LogDeniedResponse, RecentScansQuery,
            RecentScansResponse, VerifyScanRequest,
        },
    },
    state::AppState,
};

/// Reject the request unless the authenticated host runs `fest_id`.
async fn ensure_fest_owned(
    state: &AppState,
    auth: &AuthContext,
    fest_id: Uuid,
) -> Result<(), AppError> {
    if state.hosts.fest_belongs_to(fest_id, auth.host_id).await? {
        Ok(())
    } else {
        tracing::warn!(%fest_id, host_id = %auth.host_id, uid = %auth.uid, "Scan attempted on a fest not owned by host");
        Err(AppError::FestNotOwned)
    }
}

/// Verify a scanned ticket.
///
/// # Endpoint
///
/// `POST /api/scan/verify`
///
/// # Request Body
///
/// ```json
/// {
///   "ticketId": "TKT-5XQ2-91",
///   "festId": "550e8400-e29b-41d4-a716-446655440000"
/// }
/// ```
///
/// # Response
///
/// - **200 OK**: decided outcome, granted or denied (`valid` tells which)
/// - **429**: authority rate limited past the retry budget (`server_busy`)
/// - **503**: authority unreachable (`authority_unavailable`)
/// - **403**: fest not owned by the host
/// - **500**: the scan could not be recorded
pub async fn verify_scan(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<VerifyScanRequest>,
) -> Result<(StatusCode, Json<ScanOutcome>), AppError> {
    ensure_fest_owned(&state, &auth, request.fest_id).await?;

    let outcome = state
        .verifier
        .verify(request.fest_id, &request.ticket_id, auth.host_id, &auth.token)
        .await?;

    Ok((outcome.status_code(), Json(outcome)))
}

/// Scan counts for a fest.
///
/// `GET /api/scan/fest-stats/{festId}`
pub async fn fest_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(fest_id): Path<Uuid>,
) -> Result<Json<FestStatsResponse>, AppError> {
    ensure_fest_owned(&state, &auth, fest_id).await?;

    let scans = state.verifier.stats(fest_id).await?;

    Ok(Json(FestStatsResponse {
        success: true,
        fest_id,
        scans,
    }))
}

/// Latest scans for a fest, newest first.
///
/// `GET /api/scan/recent-scans/{festId}?limit=20`
pub async fn recent_scans(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(fest_id): Path<Uuid>,
    Query(query): Query<RecentScansQuery>,
) -> Result<Json<RecentScansResponse>, AppError> {
    ensure_fest_owned(&state, &auth, fest_id).await?;

    let scans = state.verifier.recent(fest_id, query.limit).await?;

    Ok(Json(RecentScansResponse {
        success: true,
        scans,
    }))
}

/// Record a denial decided by gate staff.
///
/// # Endpoint
///
/// `POST /api/scan/log-denied`
///
/// # Request Body
///
/// ```json
/// {
///   "ticketId": "TKT-5XQ2-91",
///   "festId": "550e8400-e29b-41d4-a716-446655440000",
///   "attendeeName": "Asha Kumar"
/// }
/// ```
pub async fn log_denied(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<LogDeniedRequest>,
) -> Result<Json<LogDeniedResponse>, AppError> {
    ensure_fest_owned(&state, &auth, request.fest_id).await?;

    let record = state
        .verifier
        .log_denied(
            request.fest_id,
            &request.ticket_id,
            request.attendee_name.as_deref(),
            auth.host_id,
        )
        .await?;

    Ok(Json(LogDeniedResponse {
        success: true,
        record,
    }))
}

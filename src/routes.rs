//! HTTP router: public and authenticated routes plus the shared middleware stack.

use std::time::Duration;

use axum::{
    Router,
    http::{
        Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{handlers, middleware, state::AppState};

/// Build the application router.
///
/// `request_timeout` bounds a whole request, authority retries included;
/// requests running past it get 504 Gateway Timeout.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let scan_routes = Router::new()
        .route("/api/scan/verify", post(handlers::scans::verify_scan))
        .route(
            "/api/scan/fest-stats/{fest_id}",
            get(handlers::scans::fest_stats),
        )
        .route(
            "/api/scan/recent-scans/{fest_id}",
            get(handlers::scans::recent_scans),
        )
        .route("/api/scan/log-denied", post(handlers::scans::log_denied))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(scan_routes)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            request_timeout,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

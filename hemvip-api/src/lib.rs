//! hemvip-api library - perceptual-study backend
//!
//! Assigns studies to participants, serves paired-video study content, and
//! records study completion.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use hemvip_common::config::Config;
use sqlx::SqlitePool;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

pub mod api;
pub mod db;
pub mod study;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Select/claim rounds per assignment request
    pub claim_attempts: u32,
}

impl AppState {
    pub fn new(db: SqlitePool, claim_attempts: u32) -> Self {
        Self { db, claim_attempts }
    }
}

/// Build application router
///
/// Unknown paths and unsupported methods on known paths both answer with the
/// "Invalid api" envelope.
pub fn build_router(state: AppState, config: &Config) -> Router {
    let studies = Router::new()
        .route("/api/study", get(api::get_study).fallback(api::invalid_api))
        .route(
            "/api/start-study",
            post(api::start_study).fallback(api::invalid_api),
        )
        .route(
            "/api/attention-check",
            post(api::attention_check).fallback(api::invalid_api),
        )
        .route(
            "/api/finish-study",
            post(api::finish_study).fallback(api::invalid_api),
        );

    let router = Router::new()
        .merge(studies)
        .merge(api::health_routes())
        .fallback(api::invalid_api)
        .with_state(state);

    with_middleware(router, config)
}

/// Timeout, panic, CORS and trace layers, innermost first
///
/// CORS sits outside the timeout and panic layers so their envelopes still
/// carry the allow-origin header.
fn with_middleware(router: Router, config: &Config) -> Router {
    router
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(middleware::from_fn(api::envelope_timeout))
        .layer(CatchPanicLayer::custom(api::panic_response))
        .layer(api::cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
}

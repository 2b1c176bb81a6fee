//! CORS headers and preflight handling
//!
//! The allow-origin header echoes the request origin only when it is in the
//! configured allow-list. Every OPTIONS request is answered here with headers
//! and an empty body; it never reaches a route.

use axum::http::{header, HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(86400);

/// Build the CORS layer for the configured origins
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| {
            // AllowOrigin::list panics on a wildcard entry
            if origin.trim() == "*" {
                warn!("Ignoring wildcard CORS origin; credentials require explicit origins");
                return None;
            }
            match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin: {:?}", origin);
                    None
                }
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(PREFLIGHT_MAX_AGE)
}

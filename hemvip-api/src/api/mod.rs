//! HTTP API handlers for hemvip-api

pub mod cors;
pub mod envelope;
pub mod error;
pub mod health;
pub mod requests;
pub mod study;

pub use cors::cors_layer;
pub use envelope::{success, Empty, Envelope};
pub use error::{envelope_timeout, invalid_api, panic_response, ApiError, ApiResult, FieldError};
pub use health::health_routes;
pub use study::{attention_check, finish_study, get_study, start_study};

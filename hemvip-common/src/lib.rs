//! # HEMVIP Common Library
//!
//! Shared code for the HEMVIP study backend:
//! - Database initialization and persisted models
//! - Participant identifier types
//! - Configuration loading
//! - Common error type

pub mod config;
pub mod db;
pub mod error;
pub mod ids;

pub use error::{Error, Result};
pub use ids::{ParticipantIds, ProlificId, SessionId};

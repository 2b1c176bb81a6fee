//! Persistence gateway for the study engines
//!
//! Parameterized statements against the shared SQLite store. Mutations report
//! success through affected-row counts; callers decide what a zero count means.

pub mod pages;
pub mod studies;
pub mod videos;

pub use pages::{PageField, StatementOutcome};
pub use studies::StudyOutcome;

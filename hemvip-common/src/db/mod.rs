//! Database models and schema

pub mod init;
pub mod models;

pub use init::init_database;
pub use models::*;

//! Study lifecycle engines
//!
//! - [`assign`]: claim an available study for a participant
//! - [`retrieve`]: assemble a study's pages and videos for delivery
//! - [`complete`]: finish or fail a claimed study
//!
//! All coordination between requests happens through the store; nothing here
//! keeps state between calls.

pub mod assign;
pub mod complete;
pub mod retrieve;

use thiserror::Error;

use crate::db::PageField;

pub use assign::{assign_study, Assignment};
pub use complete::{fail_attention_check, finish_study, Completion};
pub use retrieve::{fetch_study, PageContent, StudyContent};

/// Engine failures, each mapped to a distinct HTTP outcome by the API layer
#[derive(Error, Debug)]
pub enum StudyError {
    /// Every study is taken or done
    #[error("No studies available")]
    NoStudyAvailable,

    /// Lost the claim race on every attempt
    #[error("Study assignment conflicted {attempts} times")]
    AssignmentConflict { attempts: u32 },

    #[error("Study {0} not found")]
    StudyNotFound(i64),

    /// A study without pages cannot be run
    #[error("No pages found for study {0}")]
    NoPagesFound(i64),

    #[error("Video {video} referenced by page {page} not found")]
    VideoNotFound { page: i64, video: i64 },

    /// Study is not in `started` or is held by a different participant
    #[error("Study {0} is not started by this participant")]
    OwnershipMismatch(i64),

    /// A page batch had a failing statement; nothing was committed
    #[error("Failed to update {batch} on pages {failed_pages:?}")]
    PartialCompletionFailure {
        batch: PageField,
        failed_pages: Vec<i64>,
    },

    #[error(transparent)]
    Store(#[from] hemvip_common::Error),
}

impl From<sqlx::Error> for StudyError {
    fn from(err: sqlx::Error) -> Self {
        StudyError::Store(err.into())
    }
}

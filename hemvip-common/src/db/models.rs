//! Database models
//!
//! Structured columns are stored as JSON text and decoded exactly once, when
//! the row is read, through `sqlx::types::Json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use std::fmt;

/// Study lifecycle state
///
/// `new|uncomplete -> started -> finish|failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum StudyStatus {
    New,
    Started,
    Finish,
    Failed,
    Uncomplete,
}

impl StudyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudyStatus::New => "new",
            StudyStatus::Started => "started",
            StudyStatus::Finish => "finish",
            StudyStatus::Failed => "failed",
            StudyStatus::Uncomplete => "uncomplete",
        }
    }

    /// States a new participant may be assigned from
    pub fn is_claimable(&self) -> bool {
        matches!(self, StudyStatus::New | StudyStatus::Uncomplete)
    }
}

impl fmt::Display for StudyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Study {
    pub id: i64,
    pub name: Option<String>,
    pub status: StudyStatus,
    pub prolific_userid: Option<String>,
    pub prolific_studyid: Option<String>,
    pub prolific_sessionid: Option<String>,
    pub time_start: Option<DateTime<Utc>>,
    pub global_actions: Option<Json<Value>>,
    pub failed_attention_check: Option<Json<Value>>,
    pub skipped_pages: Json<Vec<i64>>,
}

/// One comparison screen; `video1`/`video2` are video ids
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Page {
    pub id: i64,
    pub studyid: i64,
    pub name: Option<String>,
    pub video1: i64,
    pub video2: i64,
    pub options: Json<Value>,
    pub actions: Option<Json<Value>>,
    pub selected: Option<Json<Value>>,
    #[sqlx(rename = "juiceOptions")]
    #[serde(rename = "juiceOptions")]
    pub juice_options: Option<Json<Value>>,
    #[sqlx(rename = "juiceOtherReason")]
    #[serde(rename = "juiceOtherReason")]
    pub juice_other_reason: Option<Json<Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Video {
    pub id: i64,
    pub title: Option<String>,
    pub url: String,
}

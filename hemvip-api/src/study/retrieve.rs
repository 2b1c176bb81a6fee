//! Study retrieval
//!
//! Builds study -> pages -> videos. Videos are fetched in one bounded query
//! over the distinct referenced ids and joined back by id.

use hemvip_common::db::{Page, Study, Video};
use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

use super::StudyError;
use crate::db::{pages, studies, videos};

/// Study row merged with its page list
#[derive(Debug, Clone, Serialize)]
pub struct StudyContent {
    #[serde(flatten)]
    pub study: Study,
    pub pages: Vec<PageContent>,
}

/// Page with both videos resolved and options decoded
#[derive(Debug, Clone, Serialize)]
pub struct PageContent {
    pub id: i64,
    pub studyid: i64,
    pub name: Option<String>,
    pub options: Value,
    pub video1: Video,
    pub video2: Video,
    pub actions: Option<Value>,
    pub selected: Option<Value>,
    #[serde(rename = "juiceOptions")]
    pub juice_options: Option<Value>,
    #[serde(rename = "juiceOtherReason")]
    pub juice_other_reason: Option<Value>,
}

/// Load a study with its pages in id order
pub async fn fetch_study(db: &SqlitePool, study_id: i64) -> Result<StudyContent, StudyError> {
    let study = studies::get_study(db, study_id)
        .await?
        .ok_or(StudyError::StudyNotFound(study_id))?;

    let page_rows = pages::pages_for_study(db, study_id).await?;
    if page_rows.is_empty() {
        warn!("Study {} has no pages", study_id);
        return Err(StudyError::NoPagesFound(study_id));
    }

    let video_ids: BTreeSet<i64> = page_rows
        .iter()
        .flat_map(|page| [page.video1, page.video2])
        .collect();
    let video_map = videos::videos_by_id(db, &video_ids).await?;
    debug!(
        "Study {}: {} pages, {} distinct videos",
        study_id,
        page_rows.len(),
        video_map.len()
    );

    let pages = page_rows
        .into_iter()
        .map(|page| resolve_page(page, &video_map))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(StudyContent { study, pages })
}

fn resolve_page(page: Page, video_map: &HashMap<i64, Video>) -> Result<PageContent, StudyError> {
    let lookup = |video_id: i64| {
        video_map
            .get(&video_id)
            .cloned()
            .ok_or(StudyError::VideoNotFound {
                page: page.id,
                video: video_id,
            })
    };

    Ok(PageContent {
        id: page.id,
        studyid: page.studyid,
        name: page.name.clone(),
        video1: lookup(page.video1)?,
        video2: lookup(page.video2)?,
        options: page.options.0,
        actions: page.actions.map(|v| v.0),
        selected: page.selected.map(|v| v.0),
        juice_options: page.juice_options.map(|v| v.0),
        juice_other_reason: page.juice_other_reason.map(|v| v.0),
    })
}

//! Study row queries
//!
//! Every lifecycle mutation re-checks the expected current status in its
//! `WHERE` clause, so a row that changed since it was read is never
//! overwritten. Callers get `false` back when nothing matched.

use chrono::{DateTime, Utc};
use hemvip_common::db::Study;
use hemvip_common::{ParticipantIds, Result};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};

/// Lowest-id study a new participant may be assigned to
pub async fn first_claimable_study(db: &SqlitePool) -> Result<Option<i64>> {
    let id = sqlx::query_scalar(
        r#"
        SELECT id
        FROM studies
        WHERE status IN ('new', 'uncomplete')
        ORDER BY id ASC
        LIMIT 1
        "#,
    )
    .fetch_optional(db)
    .await?;

    Ok(id)
}

/// Conditionally move a study to `started` and bind the participant
///
/// Returns `false` when the study was no longer claimable at write time.
pub async fn claim_study(
    db: &SqlitePool,
    study_id: i64,
    ids: &ParticipantIds,
    started_at: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE studies
        SET status = 'started',
            time_start = ?,
            prolific_userid = ?,
            prolific_studyid = ?,
            prolific_sessionid = ?
        WHERE id = ? AND status IN ('new', 'uncomplete')
        "#,
    )
    .bind(started_at)
    .bind(ids.user.as_str())
    .bind(ids.study.as_str())
    .bind(ids.session.as_str())
    .bind(study_id)
    .execute(db)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn get_study(db: &SqlitePool, study_id: i64) -> Result<Option<Study>> {
    let study = sqlx::query_as::<_, Study>("SELECT * FROM studies WHERE id = ?")
        .bind(study_id)
        .fetch_optional(db)
        .await?;

    Ok(study)
}

/// Study-level fields written when a session ends normally
#[derive(Debug, Clone, Copy)]
pub struct StudyOutcome<'a> {
    pub global_actions: Option<&'a Value>,
    pub failed_attention_check: Option<&'a Value>,
    pub skipped_pages: &'a [i64],
}

/// `started -> finish`, only for the owning participant
pub async fn mark_finished(
    conn: &mut SqliteConnection,
    study_id: i64,
    ids: &ParticipantIds,
    outcome: StudyOutcome<'_>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE studies
        SET status = 'finish',
            global_actions = ?,
            failed_attention_check = ?,
            skipped_pages = ?
        WHERE id = ?
          AND prolific_userid = ?
          AND prolific_studyid = ?
          AND prolific_sessionid = ?
          AND status = 'started'
        "#,
    )
    .bind(outcome.global_actions.map(Json))
    .bind(outcome.failed_attention_check.map(Json))
    .bind(Json(outcome.skipped_pages))
    .bind(study_id)
    .bind(ids.user.as_str())
    .bind(ids.study.as_str())
    .bind(ids.session.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// `started -> failed`, only for the owning participant
pub async fn mark_failed(
    db: &SqlitePool,
    study_id: i64,
    ids: &ParticipantIds,
    failed_attention_check: Option<&Value>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE studies
        SET status = 'failed',
            failed_attention_check = ?
        WHERE id = ?
          AND prolific_userid = ?
          AND prolific_studyid = ?
          AND prolific_sessionid = ?
          AND status = 'started'
        "#,
    )
    .bind(failed_attention_check.map(Json))
    .bind(study_id)
    .bind(ids.user.as_str())
    .bind(ids.study.as_str())
    .bind(ids.session.as_str())
    .execute(db)
    .await?;

    Ok(result.rows_affected() == 1)
}

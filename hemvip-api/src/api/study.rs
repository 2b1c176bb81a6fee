//! Study endpoints
//!
//! Thin handlers: extract, validate, call the engine, wrap the result.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use tracing::debug;

use super::envelope::{success, Empty, Envelope};
use super::error::ApiResult;
use super::requests::{AttentionCheckRequest, FinishStudyRequest, StartStudyRequest, StudyQuery};
use crate::study::{self, Assignment, StudyContent};
use crate::AppState;

/// GET /api/study?id=<study id>
pub async fn get_study(
    State(state): State<AppState>,
    query: Result<Query<StudyQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<StudyContent>>> {
    let Query(query) = query?;
    let study_id = query.validate()?;

    let content = study::fetch_study(&state.db, study_id).await?;
    debug!("Serving study {} with {} pages", study_id, content.pages.len());

    Ok(success(content, "Fetch study success"))
}

/// POST /api/start-study
pub async fn start_study(
    State(state): State<AppState>,
    payload: Result<Json<StartStudyRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<Assignment>>> {
    let Json(request) = payload?;
    let ids = request.validate()?;

    let assignment = study::assign_study(&state.db, &ids, state.claim_attempts).await?;

    Ok(success(assignment, "Start study success"))
}

/// POST /api/attention-check
pub async fn attention_check(
    State(state): State<AppState>,
    payload: Result<Json<AttentionCheckRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<Empty>>> {
    let Json(request) = payload?;
    let valid = request.validate()?;

    study::fail_attention_check(
        &state.db,
        valid.study_id,
        &valid.ids,
        valid.failed_attention_check.as_ref(),
    )
    .await?;

    Ok(success(
        Empty::default(),
        "Your study is uncomplete because of failed attention check",
    ))
}

/// POST /api/finish-study
pub async fn finish_study(
    State(state): State<AppState>,
    payload: Result<Json<FinishStudyRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<Empty>>> {
    let Json(request) = payload?;
    let valid = request.validate()?;

    study::finish_study(&state.db, valid.study_id, &valid.ids, &valid.completion).await?;

    Ok(success(Empty::default(), "Finish the study success"))
}

//! Study assignment
//!
//! Select-then-claim with optimistic concurrency: the candidate is picked with
//! a plain read, and the claiming update re-checks the claimable status. Zero
//! affected rows means another request won the race; the loser re-selects.

use chrono::Utc;
use hemvip_common::ParticipantIds;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use super::StudyError;
use crate::db::studies;

/// Successful claim, serialized as `{state: "success", code: <study id>}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Assignment {
    state: &'static str,
    #[serde(rename = "code")]
    pub study_id: i64,
}

impl Assignment {
    fn new(study_id: i64) -> Self {
        Self {
            state: "success",
            study_id,
        }
    }
}

/// Claim the lowest-id `new`/`uncomplete` study for `ids`
///
/// Tries at most `max_attempts` select/claim rounds.
pub async fn assign_study(
    db: &SqlitePool,
    ids: &ParticipantIds,
    max_attempts: u32,
) -> Result<Assignment, StudyError> {
    for attempt in 1..=max_attempts {
        let Some(study_id) = studies::first_claimable_study(db).await? else {
            info!("No claimable study left for participant {}", ids.user);
            return Err(StudyError::NoStudyAvailable);
        };

        if studies::claim_study(db, study_id, ids, Utc::now()).await? {
            info!(
                "Study {} claimed by participant {} (session {})",
                study_id, ids.user, ids.session
            );
            return Ok(Assignment::new(study_id));
        }

        debug!(
            "Claim of study {} lost a race (attempt {}/{})",
            study_id, attempt, max_attempts
        );
    }

    warn!(
        "Giving up assignment for participant {} after {} conflicting claims",
        ids.user, max_attempts
    );
    Err(StudyError::AssignmentConflict {
        attempts: max_attempts,
    })
}

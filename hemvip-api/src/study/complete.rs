//! Study completion
//!
//! The study row update and the four page batches run in one transaction.
//! Any failing page statement rolls everything back, so a study is never left
//! `finish` with some page outcomes unwritten.

use hemvip_common::ParticipantIds;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::StudyError;
use crate::db::{pages, studies, PageField, StudyOutcome};

/// Everything recorded during one study session, keyed by page id
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub global_actions: Option<Value>,
    pub failed_attention_check: Option<Value>,
    pub skipped_pages: Vec<i64>,
    pub screen_actions: BTreeMap<i64, Value>,
    pub selections: BTreeMap<i64, Value>,
    pub juice_options: BTreeMap<i64, Value>,
    pub juice_other_reason: BTreeMap<i64, Value>,
}

impl Completion {
    fn batch(&self, field: PageField) -> &BTreeMap<i64, Value> {
        match field {
            PageField::Actions => &self.screen_actions,
            PageField::Selected => &self.selections,
            PageField::JuiceOptions => &self.juice_options,
            PageField::JuiceOtherReason => &self.juice_other_reason,
        }
    }
}

/// `started -> finish` plus every page outcome, atomically
pub async fn finish_study(
    db: &SqlitePool,
    study_id: i64,
    ids: &ParticipantIds,
    completion: &Completion,
) -> Result<(), StudyError> {
    let mut tx = db.begin().await?;

    let outcome = StudyOutcome {
        global_actions: completion.global_actions.as_ref(),
        failed_attention_check: completion.failed_attention_check.as_ref(),
        skipped_pages: &completion.skipped_pages,
    };
    if !studies::mark_finished(&mut *tx, study_id, ids, outcome).await? {
        tx.rollback().await?;
        warn!(
            "Finish rejected: study {} is not started by participant {}",
            study_id, ids.user
        );
        return Err(StudyError::OwnershipMismatch(study_id));
    }

    for field in PageField::ALL {
        let outcomes =
            pages::update_page_field_batch(&mut *tx, study_id, field, completion.batch(field))
                .await?;

        let failed_pages: Vec<i64> = outcomes
            .iter()
            .filter(|outcome| !outcome.success)
            .map(|outcome| outcome.page_id)
            .collect();

        if !failed_pages.is_empty() {
            tx.rollback().await?;
            warn!(
                "Finish of study {} rolled back: {} batch failed for pages {:?}",
                study_id, field, failed_pages
            );
            return Err(StudyError::PartialCompletionFailure {
                batch: field,
                failed_pages,
            });
        }
    }

    tx.commit().await?;
    info!("Study {} finished by participant {}", study_id, ids.user);
    Ok(())
}

/// `started -> failed`; page rows are not touched
pub async fn fail_attention_check(
    db: &SqlitePool,
    study_id: i64,
    ids: &ParticipantIds,
    failed_attention_check: Option<&Value>,
) -> Result<(), StudyError> {
    if !studies::mark_failed(db, study_id, ids, failed_attention_check).await? {
        warn!(
            "Attention-check failure rejected: study {} is not started by participant {}",
            study_id, ids.user
        );
        return Err(StudyError::OwnershipMismatch(study_id));
    }

    info!(
        "Study {} marked failed (attention check) for participant {}",
        study_id, ids.user
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::study::test_support::*;
    use hemvip_common::db::{Page, Study, StudyStatus};
    use serde_json::json;

    async fn seed(pool: &SqlitePool, ids: &ParticipantIds) {
        insert_started_study(pool, 1, ids).await;
        for id in 1..=4 {
            insert_video(pool, id).await;
        }
        insert_page(pool, 101, 1, 1, 2).await;
        insert_page(pool, 102, 1, 3, 4).await;
    }

    async fn load_study(pool: &SqlitePool) -> Study {
        studies::get_study(pool, 1).await.unwrap().unwrap()
    }

    async fn load_pages(pool: &SqlitePool) -> Vec<Page> {
        pages::pages_for_study(pool, 1).await.unwrap()
    }

    fn full_completion() -> Completion {
        Completion {
            global_actions: Some(json!([{"type": "start", "t": 0}, {"type": "end", "t": 93000}])),
            failed_attention_check: None,
            skipped_pages: vec![102],
            screen_actions: BTreeMap::from([
                (101, json!([{"action": "play", "video": 1}])),
                (102, json!([])),
            ]),
            selections: BTreeMap::from([(101, json!("left")), (102, json!("equal"))]),
            juice_options: BTreeMap::from([(101, json!(["timing"])), (102, json!([]))]),
            juice_other_reason: BTreeMap::from([(101, json!("")), (102, json!("hand jitter"))]),
        }
    }

    #[tokio::test]
    async fn test_finish_happy_path() {
        let store = store().await;
        let ids = participant(1);
        seed(&store.pool, &ids).await;

        finish_study(&store.pool, 1, &ids, &full_completion()).await.unwrap();

        let study = load_study(&store.pool).await;
        assert_eq!(study.status, StudyStatus::Finish);
        assert_eq!(
            study.global_actions.map(|v| v.0),
            Some(json!([{"type": "start", "t": 0}, {"type": "end", "t": 93000}]))
        );
        assert_eq!(study.skipped_pages.0, vec![102]);
        assert!(study.failed_attention_check.is_none());

        let pages = load_pages(&store.pool).await;
        assert_eq!(pages[0].actions.as_ref().map(|v| &v.0), Some(&json!([{"action": "play", "video": 1}])));
        assert_eq!(pages[0].selected.as_ref().map(|v| &v.0), Some(&json!("left")));
        assert_eq!(pages[1].juice_options.as_ref().map(|v| &v.0), Some(&json!([])));
        assert_eq!(
            pages[1].juice_other_reason.as_ref().map(|v| &v.0),
            Some(&json!("hand jitter"))
        );
    }

    #[tokio::test]
    async fn test_unknown_page_rolls_back_everything() {
        let store = store().await;
        let ids = participant(1);
        seed(&store.pool, &ids).await;

        let mut completion = full_completion();
        completion.selections.insert(999, json!("right"));

        let result = finish_study(&store.pool, 1, &ids, &completion).await;
        match result {
            Err(StudyError::PartialCompletionFailure { batch, failed_pages }) => {
                assert_eq!(batch, PageField::Selected);
                assert_eq!(failed_pages, vec![999]);
            }
            other => panic!("expected partial failure, got {:?}", other),
        }

        let study = load_study(&store.pool).await;
        assert_eq!(study.status, StudyStatus::Started);
        assert!(study.global_actions.is_none());

        // The earlier actions batch was rolled back as well
        for page in load_pages(&store.pool).await {
            assert!(page.actions.is_none());
            assert!(page.selected.is_none());
        }
    }

    #[tokio::test]
    async fn test_page_of_other_study_is_a_failed_statement() {
        let store = store().await;
        let ids = participant(1);
        seed(&store.pool, &ids).await;
        insert_study(&store.pool, 2, "new").await;
        insert_page(&store.pool, 201, 2, 1, 2).await;

        let completion = Completion {
            juice_options: BTreeMap::from([(201, json!(["other"]))]),
            ..Default::default()
        };

        let result = finish_study(&store.pool, 1, &ids, &completion).await;
        assert!(matches!(
            result,
            Err(StudyError::PartialCompletionFailure { batch: PageField::JuiceOptions, .. })
        ));
    }

    #[tokio::test]
    async fn test_finish_by_other_participant_rejected() {
        let store = store().await;
        let owner = participant(1);
        seed(&store.pool, &owner).await;

        let result = finish_study(&store.pool, 1, &participant(2), &full_completion()).await;
        assert!(matches!(result, Err(StudyError::OwnershipMismatch(1))));
        assert_eq!(load_study(&store.pool).await.status, StudyStatus::Started);
    }

    #[tokio::test]
    async fn test_second_finish_rejected() {
        let store = store().await;
        let ids = participant(1);
        seed(&store.pool, &ids).await;

        finish_study(&store.pool, 1, &ids, &full_completion()).await.unwrap();

        let mut changed = full_completion();
        changed.selections.insert(101, json!("right"));
        let result = finish_study(&store.pool, 1, &ids, &changed).await;
        assert!(matches!(result, Err(StudyError::OwnershipMismatch(1))));

        // First submission stands
        let pages = load_pages(&store.pool).await;
        assert_eq!(pages[0].selected.as_ref().map(|v| &v.0), Some(&json!("left")));
    }

    #[tokio::test]
    async fn test_finish_without_page_maps() {
        let store = store().await;
        let ids = participant(1);
        seed(&store.pool, &ids).await;

        finish_study(&store.pool, 1, &ids, &Completion::default()).await.unwrap();

        let study = load_study(&store.pool).await;
        assert_eq!(study.status, StudyStatus::Finish);
        assert!(study.skipped_pages.0.is_empty());
    }

    #[tokio::test]
    async fn test_attention_check_failure() {
        let store = store().await;
        let ids = participant(1);
        seed(&store.pool, &ids).await;

        let payload = json!({"page": 102, "expected": "left", "answered": "right"});
        fail_attention_check(&store.pool, 1, &ids, Some(&payload)).await.unwrap();

        let study = load_study(&store.pool).await;
        assert_eq!(study.status, StudyStatus::Failed);
        assert_eq!(study.failed_attention_check.map(|v| v.0), Some(payload));

        for page in load_pages(&store.pool).await {
            assert!(page.actions.is_none());
            assert!(page.selected.is_none());
            assert!(page.juice_options.is_none());
            assert!(page.juice_other_reason.is_none());
        }

        // A failed study can no longer be finished
        let result = finish_study(&store.pool, 1, &ids, &full_completion()).await;
        assert!(matches!(result, Err(StudyError::OwnershipMismatch(1))));
    }

    #[tokio::test]
    async fn test_attention_check_requires_claim() {
        let store = store().await;
        insert_study(&store.pool, 1, "new").await;

        let result = fail_attention_check(&store.pool, 1, &participant(1), None).await;
        assert!(matches!(result, Err(StudyError::OwnershipMismatch(1))));
    }
}

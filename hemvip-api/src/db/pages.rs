//! Page queries and per-page outcome batches

use hemvip_common::db::Page;
use hemvip_common::Result;
use serde::Serialize;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use std::fmt;

/// Page outcome column written at study completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PageField {
    #[serde(rename = "actions")]
    Actions,
    #[serde(rename = "selected")]
    Selected,
    #[serde(rename = "juiceOptions")]
    JuiceOptions,
    #[serde(rename = "juiceOtherReason")]
    JuiceOtherReason,
}

impl PageField {
    /// Batch order used by study completion
    pub const ALL: [PageField; 4] = [
        PageField::Actions,
        PageField::Selected,
        PageField::JuiceOptions,
        PageField::JuiceOtherReason,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            PageField::Actions => "actions",
            PageField::Selected => "selected",
            PageField::JuiceOptions => "juiceOptions",
            PageField::JuiceOtherReason => "juiceOtherReason",
        }
    }
}

impl fmt::Display for PageField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Result of one statement within a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementOutcome {
    pub page_id: i64,
    pub success: bool,
}

/// Pages of a study in display order
pub async fn pages_for_study(db: &SqlitePool, study_id: i64) -> Result<Vec<Page>> {
    let pages = sqlx::query_as::<_, Page>(
        r#"
        SELECT id, studyid, name, video1, video2, options,
               actions, selected, juiceOptions, juiceOtherReason
        FROM pages
        WHERE studyid = ?
        ORDER BY id ASC
        "#,
    )
    .bind(study_id)
    .fetch_all(db)
    .await?;

    Ok(pages)
}

/// Write one outcome column for every page id in `entries`
///
/// One statement per page, scoped to `study_id`. A statement succeeds only if
/// it hit exactly one row, so unknown page ids and pages of other studies are
/// reported as failures rather than silently skipped.
pub async fn update_page_field_batch(
    conn: &mut SqliteConnection,
    study_id: i64,
    field: PageField,
    entries: &BTreeMap<i64, Value>,
) -> Result<Vec<StatementOutcome>> {
    // Column name comes from the closed PageField set, never from input
    let sql = format!(
        "UPDATE pages SET {} = ? WHERE id = ? AND studyid = ?",
        field.column()
    );

    let mut outcomes = Vec::with_capacity(entries.len());
    for (&page_id, value) in entries {
        let result = sqlx::query(&sql)
            .bind(Json(value))
            .bind(page_id)
            .bind(study_id)
            .execute(&mut *conn)
            .await?;

        outcomes.push(StatementOutcome {
            page_id,
            success: result.rows_affected() == 1,
        });
    }

    Ok(outcomes)
}

//! Video lookups

use hemvip_common::db::Video;
use hemvip_common::Result;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::{BTreeSet, HashMap};

/// Fetch exactly the requested videos, keyed by id
///
/// Ids absent from the store are simply missing from the map.
pub async fn videos_by_id(db: &SqlitePool, ids: &BTreeSet<i64>) -> Result<HashMap<i64, Video>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new("SELECT id, title, url FROM videos WHERE id IN (");
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let videos: Vec<Video> = query.build_query_as().fetch_all(db).await?;

    Ok(videos.into_iter().map(|video| (video.id, video)).collect())
}

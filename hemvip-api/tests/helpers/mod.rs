//! Shared fixtures for hemvip-api integration tests
//!
//! Each test gets its own SQLite file in a temp directory, initialized with
//! the production schema and seeded through plain SQL.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use hemvip_api::{build_router, AppState};
use hemvip_common::config::Config;
use hemvip_common::db::init_database;
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`

pub const USER: &str = "5f1a2b3c4d5e6f7a8b9c0d1e";
pub const OTHER_USER: &str = "aaaaaaaaaaaaaaaaaaaaaaaa";
pub const PLATFORM_STUDY: &str = "0123456789abcdef01234567";
pub const SESSION: &str = "sess42";
pub const ALLOWED_ORIGIN: &str = "https://study.example.org";

pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let pool = init_database(&dir.path().join("hemvip.db"))
            .await
            .expect("database init");

        let config = Config {
            allowed_origins: vec![ALLOWED_ORIGIN.to_string()],
            db_path: dir.path().join("hemvip.db"),
            ..Config::default()
        };
        let router = build_router(AppState::new(pool.clone(), config.claim_attempts), &config);

        Self {
            router,
            pool,
            _dir: dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.expect("router is infallible")
    }

    pub async fn get(&self, uri: &str) -> (u16, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = self.send(request).await;
        (response.status().as_u16(), extract_json(response.into_body()).await)
    }

    pub async fn post(&self, uri: &str, body: &Value) -> (u16, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = self.send(request).await;
        (response.status().as_u16(), extract_json(response.into_body()).await)
    }

    pub async fn exec(&self, sql: &str) {
        sqlx::query(sql).execute(&self.pool).await.expect(sql);
    }

    /// Two videos per page, ids deliberately unrelated to row positions
    pub async fn seed_study(&self, study_id: i64, status: &str, page_ids: &[i64]) {
        self.exec(&format!(
            "INSERT INTO studies (id, name, status) VALUES ({}, 'study {}', '{}')",
            study_id, study_id, status
        ))
        .await;

        for &page_id in page_ids {
            let (v1, v2) = (page_id * 10 + 1, page_id * 10 + 2);
            self.exec(&format!(
                "INSERT OR IGNORE INTO videos (id, title, url) VALUES ({v1}, 'clip {v1}', 'https://cdn.example.org/{v1}.mp4'), ({v2}, 'clip {v2}', 'https://cdn.example.org/{v2}.mp4')"
            ))
            .await;
            self.exec(&format!(
                r#"INSERT INTO pages (id, studyid, name, video1, video2, options) VALUES ({page_id}, {study_id}, 'page {page_id}', {v1}, {v2}, '{{"choices":["left","right"]}}')"#
            ))
            .await;
        }
    }

    pub async fn study_status(&self, study_id: i64) -> String {
        sqlx::query_scalar("SELECT status FROM studies WHERE id = ?")
            .bind(study_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn page_column(&self, page_id: i64, column: &str) -> Option<String> {
        sqlx::query_scalar(&format!("SELECT {} FROM pages WHERE id = ?", column))
            .bind(page_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

pub fn start_body(user: &str) -> Value {
    serde_json::json!({
        "prolificid": user,
        "studyid": PLATFORM_STUDY,
        "sessionid": SESSION,
    })
}

pub fn owner_fields(user: &str, study_id: i64) -> serde_json::Map<String, Value> {
    let mut map = serde_json::Map::new();
    map.insert("prolific_userid".into(), user.into());
    map.insert("prolific_studyid".into(), PLATFORM_STUDY.into());
    map.insert("prolific_sessionid".into(), SESSION.into());
    map.insert("studyid".into(), study_id.into());
    map
}

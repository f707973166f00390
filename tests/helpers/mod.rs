//! Shared fixtures: a local timed-text feed server and SQLite-backed stores.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use sqlx::SqlitePool;
use tempfile::TempDir;

use lecture_transcripts::config::{Config, DbConfig, FeedConfig, ServerConfig};
use lecture_transcripts::fetch::HttpFeedFetcher;
use lecture_transcripts::sqlite_store::SqliteStore;
use lecture_transcripts::store::memory::InMemoryStore;
use lecture_transcripts::store::TranscriptStore;
use lecture_transcripts::{db, migrate};

/// Three lines, deliberately out of start order.
pub const THREE_LINES: &str = r#"<?xml version="1.0" encoding="utf-8" ?><transcript>
<text start="5.04" dur="1.6">Okay, so here we go.</text>
<text start="0.4" dur="1">Hi everyone.</text>
<text start="2.28" dur="1">Welcome to the lecture.</text>
</transcript>"#;

pub const SHORT: &str = r#"<transcript>
<text start="10" dur="2.5">A different recording.</text>
<text start="12.5" dur="1">The end.</text>
</transcript>"#;

pub const GERMAN: &str = r#"<transcript>
<text start="0.4" dur="1">Hallo zusammen.</text>
</transcript>"#;

pub const ENTITIES: &str = "<transcript>\
<text start=\"1\" dur=\"2\">don&amp;#39;t\nstop</text>\
<text start=\"3\" dur=\"1\">Q&amp;A &amp;amp; more</text>\
</transcript>";

pub const MALFORMED: &str = r#"<transcript>
<text start="0.4" dur="1">fine</text>
<text start="soon" dur="1">broken</text>
</transcript>"#;

pub const TRACK_LIST: &str = r#"<?xml version="1.0" encoding="utf-8" ?><transcript_list docid="123">
<track id="0" name="" lang_code="en" lang_original="English" lang_translated="English" lang_default="true"/>
<track id="1" name="CC" lang_code="de" lang_original="Deutsch" lang_translated="German"/>
</transcript_list>"#;

/// A running fixture feed. Known video ids: `three`, `short`, `entities`,
/// `malformed`, `empty`, `slow`, `gone` (HTTP 500). Anything else is a 404.
pub struct FeedFixture {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
}

impl FeedFixture {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn fetcher(&self) -> HttpFeedFetcher {
        HttpFeedFetcher::new(&self.base_url, "en").unwrap()
    }
}

pub async fn start_feed_server() -> FeedFixture {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/timedtext", get(timedtext))
        .with_state(hits.clone());
    let addr = serve(app).await;
    FeedFixture {
        base_url: format!("http://{}/timedtext", addr),
        hits,
    }
}

async fn timedtext(
    State(hits): State<Arc<AtomicUsize>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);
    let video = params.get("v").map(String::as_str).unwrap_or_default();

    if params.get("type").map(String::as_str) == Some("list") {
        return match video {
            "three" => xml(TRACK_LIST),
            _ => StatusCode::NOT_FOUND.into_response(),
        };
    }

    let lang = params.get("lang").map(String::as_str).unwrap_or_default();
    match (video, lang) {
        ("three", "en") => xml(THREE_LINES),
        ("three", "de") => xml(GERMAN),
        ("short", _) => xml(SHORT),
        ("entities", _) => xml(ENTITIES),
        ("malformed", _) => xml(MALFORMED),
        ("empty", _) => xml(""),
        ("slow", _) => {
            tokio::time::sleep(Duration::from_millis(50)).await;
            xml(THREE_LINES)
        }
        ("gone", _) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

fn xml(body: &'static str) -> Response {
    ([("content-type", "text/xml; charset=utf-8")], body).into_response()
}

/// Serve `app` on a free local port and return its address.
pub async fn serve(app: Router) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub fn test_config(dir: &Path) -> Config {
    Config {
        db: DbConfig {
            path: dir.join("data").join("ltx.sqlite"),
        },
        feed: FeedConfig::default(),
        server: ServerConfig {
            bind: "127.0.0.1:0".to_string(),
        },
    }
}

/// Migrated SQLite pool in `dir`.
pub async fn sqlite_pool(dir: &Path) -> SqlitePool {
    let pool = db::connect(&test_config(dir).db).await.unwrap();
    migrate::apply(&pool).await.unwrap();
    pool
}

/// Every store backend under test, with the temp dir that must outlive it.
pub async fn backends() -> Vec<(&'static str, Arc<dyn TranscriptStore>, Option<TempDir>)> {
    let tmp = TempDir::new().unwrap();
    let memory: Arc<dyn TranscriptStore> = Arc::new(InMemoryStore::new());
    let sqlite: Arc<dyn TranscriptStore> =
        Arc::new(SqliteStore::new(sqlite_pool(tmp.path()).await));
    vec![("memory", memory, None), ("sqlite", sqlite, Some(tmp))]
}

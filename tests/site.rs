//! Integration tests for the page-serving, stats, version and health endpoints.
//!
//! Spins up a real axum router over an in-memory SQLite database and a temp
//! directory holding the single-page app, and makes HTTP requests via
//! `tower::ServiceExt::oneshot` (no TCP listener needed).

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use http::{header, Request, StatusCode};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

use folio::config::Config;
use folio::site::{create_router, AppState};
use folio::storage;

const INDEX_HTML: &str = "<!doctype html><html><body><div id=\"root\"></div></body></html>";

/// Single-connection in-memory pool with the schema applied.
async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");
    storage::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Temp site directory with `index.html` and `assets/app.js`.
fn site_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("index.html"), INDEX_HTML).unwrap();
    std::fs::create_dir(dir.path().join("assets")).unwrap();
    std::fs::write(dir.path().join("assets").join("app.js"), "console.log('hi');").unwrap();
    dir
}

fn test_config(dir: &TempDir, commit: &str) -> Config {
    let mut config = Config::default();
    config.server.listen = "127.0.0.1:0".to_string();
    config.server.index_html = dir.path().join("index.html").display().to_string();
    config.server.assets_dir = dir.path().join("assets").display().to_string();
    config.build.commit = commit.to_string();
    config
}

async fn setup_test_app(commit: &str) -> (axum::Router, SqlitePool, TempDir) {
    let dir = site_dir();
    let pool = test_pool().await;
    let state = AppState::new(pool.clone(), test_config(&dir, commit)).unwrap();
    (create_router(state), pool, dir)
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

async fn page_view_count(pool: &SqlitePool) -> i64 {
    storage::count_page_views(pool).await.unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ── Home / webapp ────────────────────────────────────────────────────

#[tokio::test]
async fn test_new_session_records_view_and_sets_cookie() {
    let (app, pool, _dir) = setup_test_app("").await;

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie set")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("session_view=1"));
    assert!(cookie.contains("Max-Age=300"));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Path=/"));

    let content_type = response.headers().get(header::CONTENT_TYPE).unwrap();
    assert!(content_type.to_str().unwrap().starts_with("text/html"));
    assert_eq!(body_string(response).await, INDEX_HTML);

    assert_eq!(page_view_count(&pool).await, 1);
    let path: String = sqlx::query_scalar("SELECT path FROM page_views")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(path, "home");
}

#[tokio::test]
async fn test_repeat_request_with_cookie_does_not_count() {
    let (app, pool, _dir) = setup_test_app("").await;

    let first = app.clone().oneshot(get("/")).await.unwrap();
    let cookie = first.headers().get(header::SET_COOKIE).unwrap().clone();
    let cookie_pair = cookie.to_str().unwrap().split(';').next().unwrap().to_string();

    let second = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::COOKIE, cookie_pair)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert!(second.headers().get(header::SET_COOKIE).is_none());

    assert_eq!(page_view_count(&pool).await, 1);
}

#[tokio::test]
async fn test_empty_session_cookie_counts_as_new() {
    let (app, pool, _dir) = setup_test_app("").await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::COOKIE, "theme=dark; session_view=")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.headers().get(header::SET_COOKIE).is_some());
    assert_eq!(page_view_count(&pool).await, 1);
}

#[tokio::test]
async fn test_view_records_request_metadata() {
    let (app, pool, _dir) = setup_test_app("").await;

    app.oneshot(
        Request::builder()
            .uri("/")
            .header(header::USER_AGENT, "Mozilla/5.0 (X11; Linux x86_64)")
            .header(header::REFERER, "https://news.example.com/")
            .header(header::ACCEPT_LANGUAGE, "en-GB,en;q=0.8")
            .header("x-forwarded-for", "1.2.3.4, 5.6.7.8")
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    let row: (String, String, String, String, String) = sqlx::query_as(
        "SELECT user_agent, referrer, ip_address, accept_language, request_method FROM page_views",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(row.0, "Mozilla/5.0 (X11; Linux x86_64)");
    assert_eq!(row.1, "https://news.example.com/");
    assert_eq!(row.2, "1.2.3.4");
    assert_eq!(row.3, "en-GB,en;q=0.8");
    assert_eq!(row.4, "GET");
}

#[tokio::test]
async fn test_real_ip_header_used_when_no_forwarded_for() {
    let (app, pool, _dir) = setup_test_app("").await;

    app.oneshot(
        Request::builder()
            .uri("/")
            .header("x-real-ip", "9.8.7.6")
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    let ip: String = sqlx::query_scalar("SELECT ip_address FROM page_views")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(ip, "9.8.7.6");
}

#[tokio::test]
async fn test_peer_address_used_without_proxy_headers() {
    let (app, pool, _dir) = setup_test_app("").await;

    let peer: SocketAddr = "198.51.100.23:61000".parse().unwrap();
    let mut request = get("/");
    request.extensions_mut().insert(ConnectInfo(peer));
    app.oneshot(request).await.unwrap();

    let ip: String = sqlx::query_scalar("SELECT ip_address FROM page_views")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(ip, "198.51.100.23");
}

#[tokio::test]
async fn test_client_side_route_serves_app_and_records_path() {
    let (app, pool, _dir) = setup_test_app("").await;

    let response = app.oneshot(get("/blog/hello-world")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, INDEX_HTML);

    let path: String = sqlx::query_scalar("SELECT path FROM page_views")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(path, "/blog/hello-world");
}

#[tokio::test]
async fn test_missing_index_is_500_and_logged() {
    let dir = site_dir();
    let pool = test_pool().await;
    let mut config = test_config(&dir, "");
    config.server.index_html = dir.path().join("missing.html").display().to_string();
    let app = create_router(AppState::new(pool.clone(), config).unwrap());

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    // The view was still counted, so the cookie still goes out
    assert!(response.headers().get(header::SET_COOKIE).is_some());
    assert_eq!(page_view_count(&pool).await, 1);
    assert_eq!(storage::error_log::count_errors(&pool).await.unwrap(), 1);
}

#[tokio::test]
async fn test_failed_view_insert_still_serves_page() {
    let (app, pool, _dir) = setup_test_app("").await;
    sqlx::query("DROP TABLE page_views")
        .execute(&pool)
        .await
        .unwrap();

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, INDEX_HTML);

    let message: String = sqlx::query_scalar("SELECT message FROM error_logs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(message.starts_with("Failed to increment page view"));
}

// ── Stats ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_stats_matches_recorded_views() {
    let (app, pool, _dir) = setup_test_app("").await;

    for path in ["home", "/about", "/blog"] {
        storage::PageView {
            path: path.to_string(),
            ..Default::default()
        }
        .insert(&pool)
        .await
        .unwrap();
    }

    let response = app.oneshot(get("/api/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json, serde_json::json!({ "page_views": 3 }));
}

#[tokio::test]
async fn test_stats_counts_views_recorded_through_home() {
    let (app, _pool, _dir) = setup_test_app("").await;

    app.clone().oneshot(get("/")).await.unwrap();
    app.clone().oneshot(get("/projects")).await.unwrap();

    let response = app.oneshot(get("/api/stats")).await.unwrap();
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["page_views"], 2);
}

#[tokio::test]
async fn test_stats_query_failure_returns_empty_body() {
    let (app, pool, _dir) = setup_test_app("").await;
    sqlx::query("DROP TABLE page_views")
        .execute(&pool)
        .await
        .unwrap();

    let response = app.oneshot(get("/api/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.is_empty());
    assert_eq!(storage::error_log::count_errors(&pool).await.unwrap(), 1);
}

// ── Version / health / assets ────────────────────────────────────────

#[tokio::test]
async fn test_version_truncates_commit() {
    let (app, _pool, _dir) = setup_test_app("9f2c41be7d0a55e1c3").await;

    let response = app.oneshot(get("/version.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get(header::CONTENT_TYPE).unwrap();
    assert!(content_type.to_str().unwrap().starts_with("text/plain"));
    assert_eq!(body_string(response).await, "9f2c41b");
}

#[tokio::test]
async fn test_version_unknown_without_commit() {
    let (app, _pool, _dir) = setup_test_app("").await;

    let response = app.oneshot(get("/version.txt")).await.unwrap();
    assert_eq!(body_string(response).await, "unknown");
}

#[tokio::test]
async fn test_health_is_ok() {
    let (app, pool, _dir) = setup_test_app("").await;

    let response = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json, serde_json::json!({ "message": "OK" }));

    // Health checks are not page views
    assert_eq!(page_view_count(&pool).await, 0);
}

#[tokio::test]
async fn test_assets_are_served_from_directory() {
    let (app, pool, _dir) = setup_test_app("").await;

    let response = app.clone().oneshot(get("/assets/app.js")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "console.log('hi');");

    let response = app.oneshot(get("/assets/missing.js")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(page_view_count(&pool).await, 0);
}

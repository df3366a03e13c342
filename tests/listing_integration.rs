//! Listing Integration Tests
//!
//! Drives the full router in process with tower::ServiceExt::oneshot,
//! backed by the in-memory page cache and a counting fake storage backend.

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use bucket_index::{
    config::AppConfig,
    models::listing::{ListingEntry, StoredObject},
    routes,
    services::{
        cache::{MemoryCache, PageCache},
        storage_service::{ObjectLister, StorageError, StorageResult},
    },
    state::AppState,
};
use http_body_util::BodyExt;
use s3::error::S3Error;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use tower::ServiceExt;

/// Storage double that records how often it was listed.
struct FakeBucket {
    entries: Vec<ListingEntry>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl FakeBucket {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectLister for FakeBucket {
    async fn list(&self, prefix: &str, delimiter: &str) -> StorageResult<Vec<ListingEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::List {
                prefix: prefix.to_string(),
                source: S3Error::HttpFailWithBody(503, "connection refused".into()),
            });
        }
        assert_eq!(delimiter, "/");
        Ok(self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix) && entry.key() != prefix)
            .filter(|entry| !entry.key()[prefix.len()..].trim_end_matches('/').contains('/'))
            .cloned()
            .collect())
    }

    async fn presign_get(&self, key: &str, ttl_secs: u32) -> StorageResult<String> {
        Ok(format!(
            "https://media.example.test/{}?X-Amz-Expires={}",
            key, ttl_secs
        ))
    }
}

fn object(key: &str, size: u64) -> ListingEntry {
    ListingEntry::Object(StoredObject {
        key: key.into(),
        size,
        last_modified: "2020-01-02T03:04:05.000Z".into(),
    })
}

fn fake_bucket() -> Arc<FakeBucket> {
    Arc::new(FakeBucket {
        entries: vec![
            object("README.md", 1536),
            ListingEntry::Prefix("docs/".into()),
            object("docs/guide.pdf", 42 * 1024 * 1024),
            ListingEntry::Prefix("docs/img/".into()),
        ],
        calls: AtomicUsize::new(0),
        failing: AtomicBool::new(false),
    })
}

fn test_config(password: Option<&str>) -> AppConfig {
    AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        password: password.map(str::to_string),
        secret_key: Some("integration-test-secret".into()),
        cache_ttl: 60,
        link_ttl: 900,
        bucket: "media".into(),
        region: "us-east-1".into(),
        endpoint: None,
        access_key: "AKIA".into(),
        secret_access_key: "secret".into(),
        redis_url: None,
        secure_cookie: false,
    }
}

fn create_app(password: Option<&str>, bucket: Arc<FakeBucket>) -> (Router, Arc<MemoryCache>) {
    let cache = Arc::new(MemoryCache::new());
    let state = AppState::new(&test_config(password), bucket, cache.clone());
    (routes::routes::routes().with_state(state), cache)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

fn post_password(uri: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("password={}", password)))
        .unwrap()
}

async fn body_to_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// `name=value` part of the session cookie set by a response.
fn session_cookie(response: &Response<Body>) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("response sets a cookie")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn test_root_redirects_to_listing() {
    let (app, _) = create_app(None, fake_bucket());

    let response = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/bucket/");

    let response = app.oneshot(get("/bucket")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_healthz_and_readyz() {
    let (app, _) = create_app(None, fake_bucket());

    let response = app.clone().oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_to_string(response).await.contains(r#""status":"ok""#));
}

// ============================================================================
// Listing and cache
// ============================================================================

#[tokio::test]
async fn test_root_listing_renders_files_and_folders() {
    let bucket = fake_bucket();
    let (app, _) = create_app(None, bucket.clone());

    let response = app.oneshot(get("/bucket/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );

    let body = body_to_string(response).await;
    assert!(body.contains("Index of /"));
    assert!(body.contains(">README.md<"));
    assert!(body.contains("1.5&nbsp;K"));
    assert!(body.contains("02-Jan-2020&nbsp;03:04:05"));
    assert!(body.contains("https://media.example.test/README.md?X-Amz-Expires=900"));
    assert!(body.contains(r#"href="./docs/""#));
    assert!(body.contains(r#"href="/bucket/?flush=1""#));
    assert!(!body.contains("guide.pdf"));
}

#[tokio::test]
async fn test_nested_listing_strips_prefix() {
    let (app, _) = create_app(None, fake_bucket());

    let response = app.oneshot(get("/bucket/docs/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_to_string(response).await;
    assert!(body.contains("Index of /docs/"));
    assert!(body.contains(">guide.pdf<"));
    assert!(body.contains("&nbsp;42&nbsp;M"));
    assert!(body.contains(r#"href="./img/""#));
    assert!(body.contains("https://media.example.test/docs/guide.pdf"));
    assert!(!body.contains("README.md"));
}

#[tokio::test]
async fn test_second_request_is_served_from_cache() {
    let bucket = fake_bucket();
    let (app, _) = create_app(None, bucket.clone());

    let first = body_to_string(app.clone().oneshot(get("/bucket/docs/")).await.unwrap()).await;
    let second = body_to_string(app.oneshot(get("/bucket/docs/")).await.unwrap()).await;

    assert_eq!(first, second);
    assert_eq!(bucket.calls(), 1);
}

#[tokio::test]
async fn test_flush_rebuilds_and_overwrites_cache() {
    let bucket = fake_bucket();
    let (app, cache) = create_app(None, bucket.clone());

    app.clone().oneshot(get("/bucket/")).await.unwrap();
    assert_eq!(bucket.calls(), 1);

    let response = app.clone().oneshot(get("/bucket/?flush=1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let flushed = body_to_string(response).await;
    assert_eq!(bucket.calls(), 2);
    // The refresh link of a flushed page is the current URL.
    assert!(flushed.contains(r#"href="/bucket/?flush=1""#));
    assert!(!flushed.contains("flush=1&amp;flush=1"));

    let cached = cache
        .get(&bucket_index::services::listing_service::page_key(""))
        .await
        .unwrap();
    assert_eq!(cached.as_deref(), Some(flushed.as_str()));

    // Plain requests now see the overwritten page without listing again.
    let again = body_to_string(app.oneshot(get("/bucket/")).await.unwrap()).await;
    assert_eq!(again, flushed);
    assert_eq!(bucket.calls(), 2);
}

#[tokio::test]
async fn test_refresh_link_replaces_inert_flush_value() {
    let bucket = fake_bucket();
    let (app, _) = create_app(None, bucket.clone());

    let response = app.clone().oneshot(get("/bucket/?flush=0")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_string(response).await;
    assert!(body.contains(r#"href="/bucket/?flush=1""#));
    assert!(!body.contains("flush=0"));

    // Following the rendered link works and rebuilds the page.
    let response = app.oneshot(get("/bucket/?flush=1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(bucket.calls(), 2);
}

#[tokio::test]
async fn test_concurrent_first_requests_both_succeed() {
    let bucket = fake_bucket();
    let (app, _) = create_app(None, bucket.clone());

    let (a, b) = tokio::join!(
        app.clone().oneshot(get("/bucket/docs/")),
        app.clone().oneshot(get("/bucket/docs/"))
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.status(), StatusCode::OK);
    assert_eq!(b.status(), StatusCode::OK);
    assert_eq!(body_to_string(a).await, body_to_string(b).await);
    assert!((1..=2).contains(&bucket.calls()));
}

#[tokio::test]
async fn test_storage_failure_is_a_server_error() {
    let bucket = fake_bucket();
    bucket.failing.store(true, Ordering::SeqCst);
    let (app, cache) = create_app(None, bucket.clone());

    let response = app.oneshot(get("/bucket/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(body_to_string(response).await.contains("connection refused"));
    assert_eq!(
        cache
            .get(&bucket_index::services::listing_service::page_key(""))
            .await
            .unwrap(),
        None
    );
}

// ============================================================================
// Access gate
// ============================================================================

#[tokio::test]
async fn test_password_protected_listing_shows_login() {
    let bucket = fake_bucket();
    let (app, _) = create_app(Some("hunter2"), bucket.clone());

    let response = app.oneshot(get("/bucket/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_to_string(response).await;
    assert!(body.contains(r#"name="password""#));
    assert!(!body.contains("README.md"));
    assert_eq!(bucket.calls(), 0);
}

#[tokio::test]
async fn test_wrong_password_shows_login_again() {
    let (app, _) = create_app(Some("hunter2"), fake_bucket());

    let response = app
        .oneshot(post_password("/bucket/", "letmein"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert!(body_to_string(response).await.contains("Wrong password"));
}

#[tokio::test]
async fn test_login_grants_session_until_logout() {
    let (app, _) = create_app(Some("hunter2"), fake_bucket());

    let response = app
        .clone()
        .oneshot(post_password("/bucket/docs/", "hunter2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/bucket/docs/");
    let cookie = session_cookie(&response);

    let response = app
        .clone()
        .oneshot(get_with_cookie("/bucket/docs/", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_to_string(response).await.contains(">guide.pdf<"));

    // Repeat requests with the same session keep working.
    let response = app
        .clone()
        .oneshot(get_with_cookie("/bucket/", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_with_cookie("/logout", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let removal = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(removal.starts_with("bucket_index_session="));
    assert!(removal.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_rotated_server_token_invalidates_session() {
    let (app, cache) = create_app(Some("hunter2"), fake_bucket());

    let response = app
        .clone()
        .oneshot(post_password("/bucket/", "hunter2"))
        .await
        .unwrap();
    let cookie = session_cookie(&response);

    cache
        .set(
            bucket_index::services::access_gate::SERVER_TOKEN_KEY,
            "rotated-token",
            std::time::Duration::ZERO,
        )
        .await
        .unwrap();

    let response = app
        .oneshot(get_with_cookie("/bucket/", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forged_cookie_is_rejected() {
    let (app, cache) = create_app(Some("hunter2"), fake_bucket());
    cache
        .add(
            bucket_index::services::access_gate::SERVER_TOKEN_KEY,
            "known-token",
        )
        .await
        .unwrap();

    // Unsigned copy of the right token.
    let response = app
        .oneshot(get_with_cookie(
            "/bucket/",
            "bucket_index_session=known-token",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_endpoints_answer_without_a_session() {
    let (app, _) = create_app(Some("hunter2"), fake_bucket());

    let response = app.clone().oneshot(get("/bucket/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.clone().oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_string(response).await;
    assert!(!body.contains("hunter2"));
}

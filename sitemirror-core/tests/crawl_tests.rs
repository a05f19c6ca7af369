// Tests for mirror run orchestration

use indicatif::ProgressDrawTarget;
use sitemirror_core::crawl::{MirrorOptions, execute_mirror, extract_url_path, mirror_spinner};
use sitemirror_scanner::{Category, CollisionPolicy, CrawlResult, LinkMatch};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

// ============================================================================
// URL Path Extraction Tests
// ============================================================================

#[test]
fn test_extract_url_path_root() {
    assert_eq!(extract_url_path("http://example.com/"), "/");
    assert_eq!(extract_url_path("http://example.com"), "/");
}

#[test]
fn test_extract_url_path_nested() {
    assert_eq!(
        extract_url_path("http://example.com/static/img/logo.png"),
        "/static/img/logo.png"
    );
}

#[test]
fn test_extract_url_path_with_query_and_fragment() {
    assert_eq!(extract_url_path("http://example.com/app.js?v=1#x"), "/app.js");
}

#[test]
fn test_extract_url_path_encoded_characters() {
    assert_eq!(
        extract_url_path("http://example.com/my%20page.html"),
        "/my%20page.html"
    );
}

#[test]
fn test_extract_url_path_invalid_url() {
    let url = "not a valid url";
    assert_eq!(extract_url_path(url), url);
}

// ============================================================================
// Options Tests
// ============================================================================

#[test]
fn test_mirror_options_defaults() {
    let options = MirrorOptions::new("https://example.com", "output");
    assert_eq!(options.threads, 10);
    assert_eq!(options.max_requests, 500);
    assert_eq!(options.max_retries, 3);
    assert_eq!(options.timeout_secs, 30);
    assert_eq!(options.link_match, LinkMatch::Loose);
    assert_eq!(options.collision_policy, CollisionPolicy::Overwrite);
    assert!(options.progress_bar.is_none());
}

// ============================================================================
// Run Tests
// ============================================================================

async fn mount(server: &MockServer, route: &str, content_type: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", content_type)
                .set_body_bytes(body.to_vec()),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_execute_mirror_end_to_end() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/index.html",
        "text/html",
        br#"<html><head><link rel="stylesheet" href="main.css"></head>
            <body><img src="a.png"><a href="/b.html">b</a></body></html>"#,
    )
    .await;
    mount(&server, "/main.css", "text/css", b"h1{background:url(h.gif)}").await;
    mount(&server, "/a.png", "image/png", &[1, 2, 3]).await;
    mount(&server, "/h.gif", "image/gif", &[4, 5]).await;
    mount(&server, "/b.html", "text/html", b"<p>b</p>").await;

    let out = TempDir::new().unwrap();
    let mut options = MirrorOptions::new(format!("{}/index.html", server.uri()), out.path());
    options.threads = 3;
    options.max_retries = 0;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let callback = Arc::new(move |result: CrawlResult| {
        seen_clone.lock().unwrap().push(result.url);
    });

    let summary = execute_mirror(options, Some(callback)).await.unwrap();

    assert_eq!(summary.totals.requests, 5);
    assert_eq!(summary.totals.pages, 2);
    assert_eq!(summary.totals.stylesheets, 1);
    assert_eq!(summary.totals.images, 2);
    assert_eq!(summary.totals.saved, 5);
    assert_eq!(summary.totals.failed, 0);
    assert_eq!(seen.lock().unwrap().len(), 5);

    assert!(out.path().join("index.html").is_file());
    assert!(out.path().join("b.html").is_file());
    assert!(out.path().join("css/main.css").is_file());
    assert_eq!(std::fs::read(out.path().join("img/a.png")).unwrap(), vec![1, 2, 3]);
    assert_eq!(std::fs::read(out.path().join("img/h.gif")).unwrap(), vec![4, 5]);
    assert!(out.path().join("js").is_dir());
}

#[tokio::test]
async fn test_execute_mirror_reports_failures_without_aborting() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/index.html",
        "text/html",
        br#"<script src="/missing.js"></script><img src="/ok.png">"#,
    )
    .await;
    mount(&server, "/ok.png", "image/png", &[9]).await;

    let out = TempDir::new().unwrap();
    let mut options = MirrorOptions::new(format!("{}/index.html", server.uri()), out.path());
    options.max_retries = 0;

    let summary = execute_mirror(options, None).await.unwrap();

    assert_eq!(summary.totals.requests, 3);
    assert_eq!(summary.totals.failed, 1);
    let failed = summary.results.iter().find(|r| r.fetch_failed()).unwrap();
    assert!(failed.url.ends_with("/missing.js"));
    assert!(failed.error.as_deref().unwrap().contains("404"));
    assert!(summary
        .results
        .iter()
        .any(|r| r.category == Some(Category::Image) && r.saved_to.is_some()));
}

#[tokio::test]
async fn test_execute_mirror_rejects_invalid_seed() {
    let out = TempDir::new().unwrap();
    let options = MirrorOptions::new("definitely not a url", out.path());
    let err = execute_mirror(options, None).await.unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("definitely not a url"), "{}", message);
}

#[tokio::test]
async fn test_execute_mirror_finishes_spinner() {
    let server = MockServer::start().await;
    mount(&server, "/index.html", "text/html", b"<p>hello</p>").await;

    let out = TempDir::new().unwrap();
    let spinner = mirror_spinner();
    spinner.set_draw_target(ProgressDrawTarget::hidden());

    let mut options = MirrorOptions::new(format!("{}/index.html", server.uri()), out.path());
    options.progress_bar = Some(spinner.clone());

    let summary = execute_mirror(options, None).await.unwrap();

    assert_eq!(summary.totals.requests, 1);
    assert!(spinner.is_finished());
    assert_eq!(spinner.message(), "Mirror complete! 1 requests processed");
}

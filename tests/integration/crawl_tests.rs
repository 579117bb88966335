//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small documentation site and run the
//! full harvest cycle end-to-end against it.

use doc_harvest::config::Config;
use doc_harvest::crawler::{harvest, CrawlOutcome, Document};
use doc_harvest::menu::{load_cached_menu, MenuEntry};
use doc_harvest::state::PageState;
use doc_harvest::storage::{PageStore, ProgressStore};
use doc_harvest::HarvestError;
use futures::TryStreamExt;
use tempfile::TempDir;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOME: &str = "/docs/home/";

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.site.base_url = base_url.to_string();
    config.site.home_path = HOME.to_string();
    config.crawler.max_concurrent_fetches = 2;
    config.crawler.request_timeout_secs = 5;
    config.storage.menu_cache_path = dir.path().join("menu.json");
    config.storage.progress_log_path = dir.path().join("wal").join("doc_log.log");
    config.storage.page_dir = dir.path().join("html");
    config
}

fn item(name: &str, href: &str, sublist: &str) -> String {
    format!(r#"<li><label><a href="{href}"><span>{name}</span></a></label>{sublist}</li>"#)
}

/// Home page whose navigation lists /docs/a/ (with child /docs/a/b/) and /docs/c/
fn home_page() -> String {
    let children = format!(r#"<ul class="ul-2">{}</ul>"#, item("B", "/docs/a/b/", ""));
    format!(
        r#"<html><body><nav><ul class="ul-1">{}{}</ul></nav></body></html>"#,
        item("A", "/docs/a/", &children),
        item("C", "/docs/c/", "")
    )
}

async fn mount_page(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn mount_site(server: &MockServer) {
    mount_page(server, HOME, home_page()).await;
    for page in ["/docs/a/", "/docs/a/b/", "/docs/c/"] {
        mount_page(server, page, format!("<html><body><p>{page}</p></body></html>")).await;
    }
}

async fn drain(outcome: CrawlOutcome) -> Vec<Document> {
    outcome
        .documents
        .try_collect()
        .await
        .expect("every known url should have a stored page")
}

#[tokio::test]
async fn test_full_harvest_from_menu() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let base = server.uri();
    let config = create_test_config(&base, &dir);
    mount_site(&server).await;

    let outcome = harvest(&config).await.expect("Harvest failed");

    assert_eq!(outcome.seeded, 3);
    assert_eq!(outcome.fetched.len(), 3);
    assert!(outcome.is_complete());

    // Documents come back in seeding order, parents before children
    let documents = drain(outcome).await;
    let urls: Vec<_> = documents.iter().map(|d| d.url.clone()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{base}/docs/a/"),
            format!("{base}/docs/a/b/"),
            format!("{base}/docs/c/"),
        ]
    );
    assert!(documents[1].html.contains("<p>/docs/a/b/</p>"));

    let progress = ProgressStore::load(&config.storage.progress_log_path).await.unwrap();
    assert_eq!(progress.count(PageState::Completed), 3);
    assert!(progress.pending().is_empty());

    let pages = PageStore::new(&config.storage.page_dir);
    assert!(pages.contains(&format!("{base}/docs/c/")).await);
}

#[tokio::test]
async fn test_menu_is_cached() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);
    mount_site(&server).await;

    harvest(&config).await.expect("Harvest failed");

    let cached = load_cached_menu(&config.storage.menu_cache_path)
        .await
        .unwrap()
        .expect("menu cache should exist");
    assert_eq!(
        cached,
        vec![
            MenuEntry::new("A", "/docs/a/").with_children(vec![MenuEntry::new("B", "/docs/a/b/")]),
            MenuEntry::new("C", "/docs/c/"),
        ]
    );
}

#[tokio::test]
async fn test_second_run_makes_no_requests() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);
    mount_site(&server).await;

    harvest(&config).await.expect("First harvest failed");

    server.reset().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = harvest(&config).await.expect("Second harvest failed");

    assert_eq!(outcome.seeded, 0);
    assert!(outcome.fetched.is_empty());
    assert_eq!(drain(outcome).await.len(), 3);
}

#[tokio::test]
async fn test_server_error_retried_then_recorded_failed() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let base = server.uri();
    let config = create_test_config(&base, &dir);

    mount_page(&server, HOME, home_page()).await;
    mount_page(&server, "/docs/a/", "<p>a</p>".to_string()).await;
    mount_page(&server, "/docs/c/", "<p>c</p>".to_string()).await;
    Mock::given(method("GET"))
        .and(path("/docs/a/b/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let outcome = harvest(&config).await.expect("Harvest failed");

    assert_eq!(outcome.fetched.len(), 2);
    assert_eq!(outcome.failed.len(), 1);
    let failure = &outcome.failed[0];
    assert_eq!(failure.url, format!("{base}/docs/a/b/"));
    assert_eq!(failure.attempts, 3);
    assert_eq!(failure.error.status(), Some(500));

    let progress = ProgressStore::load(&config.storage.progress_log_path).await.unwrap();
    assert_eq!(progress.get(&failure.url), Some(PageState::Failed));
    assert_eq!(progress.pending(), vec![failure.url.clone()]);
}

#[tokio::test]
async fn test_fail_fast_aborts_with_retry_exhausted() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri(), &dir);
    config.crawler.fail_fast = true;
    config.crawler.max_attempts = 2;

    mount_page(&server, HOME, home_page()).await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = harvest(&config).await.unwrap_err();

    match err {
        HarvestError::RetryExhausted { attempts, source, .. } => {
            assert_eq!(attempts, 2);
            assert_eq!(source.status(), Some(503));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_redirect_followed() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let base = server.uri();
    let config = create_test_config(&base, &dir);

    let nav = format!(r#"<ul class="ul-1">{}</ul>"#, item("Old", "/docs/old/", ""));
    mount_page(&server, HOME, nav).await;
    Mock::given(method("GET"))
        .and(path("/docs/old/"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/docs/new/"))
        .mount(&server)
        .await;
    mount_page(&server, "/docs/new/", "<p>moved here</p>".to_string()).await;

    let outcome = harvest(&config).await.expect("Harvest failed");
    let documents = drain(outcome).await;

    // Stored under the menu's url, with the redirect target's body
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].url, format!("{base}/docs/old/"));
    assert!(documents[0].html.contains("<p>moved here</p>"));
}

#[tokio::test]
async fn test_cached_menu_skips_discovery() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);

    std::fs::write(
        &config.storage.menu_cache_path,
        r#"[{"name":"Home","href":"/home","children":null}]"#,
    )
    .unwrap();

    Mock::given(method("GET"))
        .and(path(HOME))
        .respond_with(ResponseTemplate::new(200).set_body_string(home_page()))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/home"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>home</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = harvest(&config).await.expect("Harvest failed");

    assert_eq!(outcome.seeded, 1);
    assert_eq!(outcome.fetched.len(), 1);
}

#[tokio::test]
async fn test_missing_navigation_is_an_error() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);

    mount_page(&server, HOME, "<html><body>no menu</body></html>".to_string()).await;

    let err = harvest(&config).await.unwrap_err();

    assert!(matches!(err, HarvestError::Menu(_)));
    assert!(!config.storage.menu_cache_path.exists());
}

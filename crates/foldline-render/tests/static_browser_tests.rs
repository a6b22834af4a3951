//! Integration tests for the static rendering backend.

use std::time::Duration;

use foldline_render::prelude::*;
use foldline_render::{PageEvent, static_browser::CONTENT_URL};

const HOME: &str = "https://example.com/";

fn snapshot() -> DocumentSnapshot {
    DocumentSnapshot::new(
        ElementSnapshot::new("html").with_child(
            ElementSnapshot::new("body").with_child(
                ElementSnapshot::new("h1")
                    .with_text("Hello")
                    .with_rect(Rect::new(0.0, 0.0, 600.0, 40.0)),
            ),
        ),
    )
    .with_stylesheet("h1{font-size:2em}")
    .with_stylesheet("p{margin:0}")
    .with_subresource("https://www.google-analytics.com/analytics.js")
    .with_subresource("https://example.com/app.js")
}

#[tokio::test]
async fn test_configuration_is_recorded_in_order() {
    let browser = StaticBrowser::new().with_document(HOME, snapshot());
    let page = browser.new_page().await.unwrap();

    page.set_cache_enabled(false).await.unwrap();
    page.set_javascript_enabled(true).await.unwrap();
    page.set_request_filter(RequestBlocklist::default()).await.unwrap();
    page.emulate(&DeviceProfile::new(800, 600), "foldline-test")
        .await
        .unwrap();
    page.goto(HOME, &NavigationOptions::default()).await.unwrap();
    page.close().await.unwrap();

    let events = browser.page_events(0);
    assert_eq!(events[0], PageEvent::Opened);
    assert_eq!(events[1], PageEvent::CacheEnabled(false));
    assert_eq!(events[2], PageEvent::JavascriptEnabled(true));
    assert!(matches!(events[3], PageEvent::RequestFilter(ref patterns) if !patterns.is_empty()));
    assert_eq!(
        events[4],
        PageEvent::Emulated {
            width: 800,
            height: 600,
            user_agent: "foldline-test".to_string(),
        }
    );
    assert_eq!(events.last(), Some(&PageEvent::Closed));
}

#[tokio::test]
async fn test_request_filter_blocks_subresources() {
    let browser = StaticBrowser::new().with_document(HOME, snapshot());
    let page = browser.new_page().await.unwrap();
    page.set_request_filter(RequestBlocklist::default()).await.unwrap();
    page.goto(HOME, &NavigationOptions::default()).await.unwrap();

    let requests: Vec<_> = browser
        .page_events(0)
        .into_iter()
        .filter_map(|event| match event {
            PageEvent::Request { url, blocked } => Some((url, blocked)),
            _ => None,
        })
        .collect();

    assert_eq!(
        requests,
        vec![
            ("https://www.google-analytics.com/analytics.js".to_string(), true),
            ("https://example.com/app.js".to_string(), false),
        ]
    );
}

#[tokio::test]
async fn test_document_and_stylesheets() {
    let browser = StaticBrowser::new().with_document(HOME, snapshot());
    let page = browser.new_page().await.unwrap();

    assert!(matches!(page.document().await, Err(RenderError::NoDocument)));

    page.emulate(&DeviceProfile::new(800, 600), "foldline-test")
        .await
        .unwrap();
    page.goto(HOME, &NavigationOptions::default()).await.unwrap();

    assert_eq!(page.url().as_deref(), Some(HOME));
    assert_eq!(
        page.stylesheet_text().await.unwrap(),
        "h1{font-size:2em}\np{margin:0}"
    );

    let document = page.document().await.unwrap();
    assert_eq!(document.viewport(), Viewport::new(800, 600));
    let headings = document.query_selector_all("body > h1").unwrap();
    assert_eq!(headings.len(), 1);
    assert_eq!(
        document.bounding_client_rect(headings[0]),
        Some(Rect::new(0.0, 0.0, 600.0, 40.0))
    );
}

#[tokio::test]
async fn test_unknown_url_fails_navigation() {
    let browser = StaticBrowser::new();
    let page = browser.new_page().await.unwrap();

    let result = page.goto("https://nowhere.test/", &NavigationOptions::default()).await;
    assert!(matches!(result, Err(RenderError::Navigation { .. })));
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let browser = StaticBrowser::new().with_document(HOME, snapshot());
    browser.delay_response(HOME, Duration::from_secs(10));
    let page = browser.new_page().await.unwrap();

    let result = page
        .goto(HOME, &NavigationOptions::new(Duration::from_millis(20)))
        .await;
    assert!(matches!(
        result,
        Err(RenderError::Timeout {
            operation: "navigation",
            ..
        })
    ));
}

#[tokio::test]
async fn test_set_content_with_snapshot_json() {
    let browser = StaticBrowser::new();
    let page = browser.new_page().await.unwrap();
    let options = NavigationOptions::default();

    page.set_content(&snapshot().to_json().unwrap(), &options)
        .await
        .unwrap();
    assert_eq!(page.url().as_deref(), Some(CONTENT_URL));
    assert_eq!(
        page.document().await.unwrap().query_selector_all("h1").unwrap().len(),
        1
    );

    let result = page.set_content("<html></html>", &options).await;
    assert!(matches!(result, Err(RenderError::Navigation { .. })));
}

#[tokio::test]
async fn test_loading_state_and_stop() {
    let browser = StaticBrowser::new().with_document(
        HOME,
        snapshot().with_load_time(Duration::from_secs(60)),
    );
    let page = browser.new_page().await.unwrap();
    page.goto(HOME, &NavigationOptions::default()).await.unwrap();

    assert!(page.is_loading().await.unwrap());
    page.stop_loading().await.unwrap();
    assert!(!page.is_loading().await.unwrap());
}

#[tokio::test]
async fn test_page_open_failures() {
    let browser = StaticBrowser::new();
    browser.fail_page_opens(2);

    assert!(matches!(browser.new_page().await, Err(RenderError::PageCreation(_))));
    assert!(matches!(browser.new_page().await, Err(RenderError::PageCreation(_))));
    assert!(browser.new_page().await.is_ok());
    assert_eq!(browser.pages_opened(), 1);
}

#[tokio::test]
async fn test_open_page_accounting() {
    let browser = StaticBrowser::new();
    let first = browser.new_page().await.unwrap();
    let second = browser.new_page().await.unwrap();
    assert_eq!(browser.open_pages(), 2);

    first.close().await.unwrap();
    assert!(matches!(first.close().await, Err(RenderError::PageClosed)));
    drop(second);

    assert_eq!(browser.open_pages(), 0);
    assert_eq!(browser.peak_open_pages(), 2);
}

#[tokio::test]
async fn test_closed_session_refuses_pages() {
    let browser = StaticBrowser::new();
    assert!(browser.is_connected());

    browser.close().await.unwrap();
    assert!(!browser.is_connected());
    assert!(matches!(browser.new_page().await, Err(RenderError::SessionClosed)));
}

#[tokio::test]
async fn test_screenshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("home.png");

    let browser = StaticBrowser::new().with_document(HOME, snapshot());
    let page = browser.new_page().await.unwrap();
    page.emulate(&DeviceProfile::new(320, 240), "foldline-test")
        .await
        .unwrap();
    page.goto(HOME, &NavigationOptions::default()).await.unwrap();
    page.screenshot(&path).await.unwrap();

    let image = image::open(&path).unwrap();
    assert_eq!((image.width(), image.height()), (320, 240));
}

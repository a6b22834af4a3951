//! An in-memory rendering backend.
//!
//! [`StaticBrowser`] serves pre-laid-out [`DocumentSnapshot`]s by URL instead
//! of rendering real pages. Pages honor device emulation, request filtering,
//! and load timing, and the browser records what every page did, which makes
//! it the backend for deterministic tests and for replaying captured layouts.
//!
//! # Example
//!
//! ```ignore
//! use foldline_render::prelude::*;
//!
//! let browser = StaticBrowser::new().with_document(
//!     "https://example.com/",
//!     DocumentSnapshot::new(ElementSnapshot::new("html")),
//! );
//!
//! let page = browser.new_page().await?;
//! page.goto("https://example.com/", &NavigationOptions::default()).await?;
//! let document = page.document().await?;
//! page.close().await?;
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::device::DeviceProfile;
use crate::document::{DocumentSnapshot, DocumentView};
use crate::error::{RenderError, RenderResult};
use crate::page::{Browser, NavigationOptions, Page};
use crate::request::RequestBlocklist;
use crate::screenshot;

/// URL reported for pages filled with [`Page::set_content`].
pub const CONTENT_URL: &str = "about:blank";

/// Identifies a page opened by a [`StaticBrowser`], in opening order.
pub type PageId = usize;

/// Something a static page did.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    Opened,
    CacheEnabled(bool),
    JavascriptEnabled(bool),
    RequestFilter(Vec<String>),
    Emulated {
        width: u32,
        height: u32,
        user_agent: String,
    },
    Navigated(String),
    ContentSet,
    /// A subresource request and whether the filter blocked it.
    Request {
        url: String,
        blocked: bool,
    },
    Stopped,
    Screenshot(PathBuf),
    Closed,
}

#[derive(Default)]
struct BrowserState {
    documents: RwLock<HashMap<String, DocumentSnapshot>>,
    response_delays: RwLock<HashMap<String, Duration>>,
    failing_navigations: RwLock<HashSet<String>>,
    failing_closes: RwLock<HashSet<String>>,
    failing_opens: AtomicUsize,
    closed: AtomicBool,
    next_page: AtomicUsize,
    open_pages: AtomicUsize,
    peak_open_pages: AtomicUsize,
    events: Mutex<Vec<(PageId, PageEvent)>>,
}

impl BrowserState {
    fn record(&self, page: PageId, event: PageEvent) {
        self.events.lock().push((page, event));
    }
}

/// A browser session backed by registered document snapshots.
///
/// Cloning is cheap; clones share documents, faults, and the event log.
#[derive(Clone, Default)]
pub struct StaticBrowser {
    state: Arc<BrowserState>,
}

impl StaticBrowser {
    /// Create a browser with no documents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document and return the browser.
    pub fn with_document(self, url: impl Into<String>, snapshot: DocumentSnapshot) -> Self {
        self.add_document(url, snapshot);
        self
    }

    /// Register or replace the document served for `url`.
    pub fn add_document(&self, url: impl Into<String>, snapshot: DocumentSnapshot) {
        self.state.documents.write().insert(url.into(), snapshot);
    }

    /// Make navigation to `url` take `delay` before it responds.
    pub fn delay_response(&self, url: impl Into<String>, delay: Duration) {
        self.state.response_delays.write().insert(url.into(), delay);
    }

    /// Make navigation to `url` fail.
    pub fn fail_navigation(&self, url: impl Into<String>) {
        self.state.failing_navigations.write().insert(url.into());
    }

    /// Make closing a page that shows `url` fail.
    pub fn fail_close(&self, url: impl Into<String>) {
        self.state.failing_closes.write().insert(url.into());
    }

    /// Make the next `count` calls to [`Browser::new_page`] fail.
    pub fn fail_page_opens(&self, count: usize) {
        self.state.failing_opens.store(count, Ordering::SeqCst);
    }

    /// Number of pages opened and not yet closed.
    pub fn open_pages(&self) -> usize {
        self.state.open_pages.load(Ordering::SeqCst)
    }

    /// Highest number of pages that were open at the same time.
    pub fn peak_open_pages(&self) -> usize {
        self.state.peak_open_pages.load(Ordering::SeqCst)
    }

    /// Number of pages successfully opened so far.
    pub fn pages_opened(&self) -> usize {
        self.state.next_page.load(Ordering::SeqCst)
    }

    /// Everything pages did, in order.
    pub fn events(&self) -> Vec<(PageId, PageEvent)> {
        self.state.events.lock().clone()
    }

    /// Events of a single page.
    pub fn page_events(&self, page: PageId) -> Vec<PageEvent> {
        self.state
            .events
            .lock()
            .iter()
            .filter(|(id, _)| *id == page)
            .map(|(_, event)| event.clone())
            .collect()
    }
}

#[async_trait]
impl Browser for StaticBrowser {
    async fn new_page(&self) -> RenderResult<Box<dyn Page>> {
        if self.state.closed.load(Ordering::SeqCst) {
            return Err(RenderError::SessionClosed);
        }

        let failing = self
            .state
            .failing_opens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(RenderError::PageCreation("target crashed".to_string()));
        }

        let id = self.state.next_page.fetch_add(1, Ordering::SeqCst);
        let open = self.state.open_pages.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak_open_pages.fetch_max(open, Ordering::SeqCst);
        self.state.record(id, PageEvent::Opened);

        trace!(target: "foldline_render::page", page = id, open, "opened page");

        Ok(Box::new(StaticPage {
            id,
            browser: Arc::clone(&self.state),
            state: Mutex::new(PageState::default()),
        }))
    }

    async fn close(&self) -> RenderResult<()> {
        if self.state.closed.swap(true, Ordering::SeqCst) {
            return Err(RenderError::SessionClosed);
        }
        debug!(
            target: "foldline_render::page",
            pages = self.pages_opened(),
            "closed static browser"
        );
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.state.closed.load(Ordering::SeqCst)
    }
}

struct Loaded {
    url: String,
    snapshot: DocumentSnapshot,
    started: Instant,
    stopped: bool,
}

impl Loaded {
    fn is_complete(&self) -> bool {
        !self.stopped && self.started.elapsed() >= self.snapshot.load_time()
    }
}

struct PageState {
    closed: bool,
    cache_enabled: bool,
    javascript_enabled: bool,
    blocklist: RequestBlocklist,
    device: DeviceProfile,
    current: Option<Loaded>,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            closed: false,
            cache_enabled: true,
            javascript_enabled: true,
            blocklist: RequestBlocklist::allow_all(),
            device: DeviceProfile::default(),
            current: None,
        }
    }
}

/// A page of a [`StaticBrowser`].
pub struct StaticPage {
    id: PageId,
    browser: Arc<BrowserState>,
    state: Mutex<PageState>,
}

impl StaticPage {
    fn with_state<R>(&self, f: impl FnOnce(&mut PageState) -> RenderResult<R>) -> RenderResult<R> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(RenderError::PageClosed);
        }
        f(&mut state)
    }

    fn load(&self, url: &str, snapshot: DocumentSnapshot) -> RenderResult<()> {
        self.with_state(|state| {
            for request in &snapshot.subresources {
                let blocked = state.blocklist.blocks(request);
                self.browser.record(
                    self.id,
                    PageEvent::Request {
                        url: request.clone(),
                        blocked,
                    },
                );
            }

            state.current = Some(Loaded {
                url: url.to_string(),
                snapshot,
                started: Instant::now(),
                stopped: false,
            });
            Ok(())
        })
    }
}

#[async_trait]
impl Page for StaticPage {
    async fn set_cache_enabled(&self, enabled: bool) -> RenderResult<()> {
        self.with_state(|state| {
            state.cache_enabled = enabled;
            Ok(())
        })?;
        self.browser.record(self.id, PageEvent::CacheEnabled(enabled));
        Ok(())
    }

    async fn set_javascript_enabled(&self, enabled: bool) -> RenderResult<()> {
        self.with_state(|state| {
            state.javascript_enabled = enabled;
            Ok(())
        })?;
        self.browser
            .record(self.id, PageEvent::JavascriptEnabled(enabled));
        Ok(())
    }

    async fn set_request_filter(&self, blocklist: RequestBlocklist) -> RenderResult<()> {
        let patterns = blocklist.patterns().to_vec();
        self.with_state(|state| {
            state.blocklist = blocklist;
            Ok(())
        })?;
        self.browser
            .record(self.id, PageEvent::RequestFilter(patterns));
        Ok(())
    }

    async fn emulate(&self, device: &DeviceProfile, user_agent: &str) -> RenderResult<()> {
        self.with_state(|state| {
            state.device = device.clone();
            Ok(())
        })?;
        self.browser.record(
            self.id,
            PageEvent::Emulated {
                width: device.width,
                height: device.height,
                user_agent: user_agent.to_string(),
            },
        );
        Ok(())
    }

    async fn goto(&self, url: &str, options: &NavigationOptions) -> RenderResult<()> {
        self.with_state(|_| Ok(()))?;

        let snapshot = self
            .browser
            .documents
            .read()
            .get(url)
            .cloned()
            .ok_or_else(|| RenderError::navigation(url, "net::ERR_NAME_NOT_RESOLVED"))?;
        if self.browser.failing_navigations.read().contains(url) {
            return Err(RenderError::navigation(url, "net::ERR_CONNECTION_RESET"));
        }

        let delay = self
            .browser
            .response_delays
            .read()
            .get(url)
            .copied()
            .unwrap_or_default();
        if !delay.is_zero() {
            tokio::time::timeout(options.timeout, tokio::time::sleep(delay))
                .await
                .map_err(|_| RenderError::Timeout {
                    operation: "navigation",
                    timeout: options.timeout,
                })?;
        }

        self.load(url, snapshot)?;
        self.browser
            .record(self.id, PageEvent::Navigated(url.to_string()));
        trace!(target: "foldline_render::page", page = self.id, url, "navigated");
        Ok(())
    }

    async fn set_content(&self, html: &str, _options: &NavigationOptions) -> RenderResult<()> {
        let snapshot = DocumentSnapshot::from_json(html).map_err(|e| {
            RenderError::navigation(CONTENT_URL, format!("content is not a document snapshot: {}", e))
        })?;
        self.load(CONTENT_URL, snapshot)?;
        self.browser.record(self.id, PageEvent::ContentSet);
        Ok(())
    }

    async fn is_loading(&self) -> RenderResult<bool> {
        self.with_state(|state| {
            let current = state.current.as_ref().ok_or(RenderError::NoDocument)?;
            Ok(!current.stopped && !current.is_complete())
        })
    }

    async fn stop_loading(&self) -> RenderResult<()> {
        self.with_state(|state| {
            if let Some(current) = state.current.as_mut()
                && !current.is_complete()
            {
                current.stopped = true;
            }
            Ok(())
        })?;
        self.browser.record(self.id, PageEvent::Stopped);
        Ok(())
    }

    async fn document(&self) -> RenderResult<Box<dyn DocumentView>> {
        self.with_state(|state| {
            let current = state.current.as_ref().ok_or(RenderError::NoDocument)?;
            let document = current
                .snapshot
                .layout(state.device.viewport(), current.is_complete());
            Ok(Box::new(document) as Box<dyn DocumentView>)
        })
    }

    async fn stylesheet_text(&self) -> RenderResult<String> {
        self.with_state(|state| {
            let current = state.current.as_ref().ok_or(RenderError::NoDocument)?;
            Ok(current.snapshot.stylesheet_text())
        })
    }

    async fn screenshot(&self, path: &Path) -> RenderResult<()> {
        let image = self.with_state(|state| {
            let current = state.current.as_ref().ok_or(RenderError::NoDocument)?;
            let document = current
                .snapshot
                .layout(state.device.viewport(), current.is_complete());
            Ok(screenshot::render_boxes(&document, 1.0))
        })?;
        screenshot::save_image(&image, path)?;
        self.browser
            .record(self.id, PageEvent::Screenshot(path.to_path_buf()));
        Ok(())
    }

    fn url(&self) -> Option<String> {
        self.state
            .lock()
            .current
            .as_ref()
            .map(|current| current.url.clone())
    }

    async fn close(&self) -> RenderResult<()> {
        let url = self.with_state(|state| {
            state.closed = true;
            Ok(state.current.as_ref().map(|current| current.url.clone()))
        })?;
        self.browser.open_pages.fetch_sub(1, Ordering::SeqCst);
        self.browser.record(self.id, PageEvent::Closed);

        if let Some(url) = url
            && self.browser.failing_closes.read().contains(&url)
        {
            return Err(RenderError::Evaluation(format!(
                "target for '{}' did not close cleanly",
                url
            )));
        }
        Ok(())
    }
}

impl Drop for StaticPage {
    fn drop(&mut self) {
        if !self.state.get_mut().closed {
            self.browser.open_pages.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

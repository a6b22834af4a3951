//! The rendering-engine interface.
//!
//! A [`Browser`] is a session that hands out [`Page`]s. Everything foldline
//! needs from a headless engine goes through these two traits, so any engine
//! (or the in-memory [`StaticBrowser`](crate::StaticBrowser)) can drive a run.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::device::DeviceProfile;
use crate::document::DocumentView;
use crate::error::RenderResult;
use crate::request::RequestBlocklist;

/// Default navigation timeout.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// When navigation is considered complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WaitUntil {
    /// The `load` event fired.
    #[default]
    Load,
    /// The `DOMContentLoaded` event fired.
    DomContentLoaded,
    /// No network connections for a short period.
    NetworkIdle,
}

/// Options for [`Page::goto`] and [`Page::set_content`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationOptions {
    /// Upper bound for the whole navigation.
    pub timeout: Duration,
    /// Event that ends the navigation.
    pub wait_until: WaitUntil,
}

impl NavigationOptions {
    /// Create options with the given timeout, waiting for `load`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            wait_until: WaitUntil::Load,
        }
    }

    /// Set the event that ends the navigation.
    pub fn wait_until(mut self, wait_until: WaitUntil) -> Self {
        self.wait_until = wait_until;
        self
    }
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self::new(DEFAULT_NAVIGATION_TIMEOUT)
    }
}

/// A browser session.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Open a new page.
    async fn new_page(&self) -> RenderResult<Box<dyn Page>>;

    /// Close the session and every page it owns.
    async fn close(&self) -> RenderResult<()>;

    /// Whether the session still accepts new pages.
    fn is_connected(&self) -> bool;
}

/// A single tab of a browser session.
///
/// Configuration methods must be called before navigation to take effect.
#[async_trait]
pub trait Page: Send + Sync {
    /// Enable or disable the HTTP cache.
    async fn set_cache_enabled(&self, enabled: bool) -> RenderResult<()>;

    /// Enable or disable script execution.
    async fn set_javascript_enabled(&self, enabled: bool) -> RenderResult<()>;

    /// Abort every subresource request the blocklist rejects.
    async fn set_request_filter(&self, blocklist: RequestBlocklist) -> RenderResult<()>;

    /// Emulate a device profile with the given user agent.
    async fn emulate(&self, device: &DeviceProfile, user_agent: &str) -> RenderResult<()>;

    /// Navigate to a URL.
    async fn goto(&self, url: &str, options: &NavigationOptions) -> RenderResult<()>;

    /// Replace the page content with raw markup.
    async fn set_content(&self, html: &str, options: &NavigationOptions) -> RenderResult<()>;

    /// Whether the page is still loading resources.
    async fn is_loading(&self) -> RenderResult<bool>;

    /// Stop loading, like the browser's stop button.
    async fn stop_loading(&self) -> RenderResult<()>;

    /// Snapshot the current layout.
    async fn document(&self) -> RenderResult<Box<dyn DocumentView>>;

    /// Text of every stylesheet in the document, joined by newlines.
    async fn stylesheet_text(&self) -> RenderResult<String>;

    /// Save a PNG of the viewport.
    async fn screenshot(&self, path: &Path) -> RenderResult<()>;

    /// The URL of the current document, if any.
    fn url(&self) -> Option<String>;

    /// Close the page. Closing twice is an error.
    async fn close(&self) -> RenderResult<()>;
}

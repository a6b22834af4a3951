//! Rendering-engine interface for foldline.
//!
//! This crate describes what foldline needs from a headless browser and
//! implements the part of a critical CSS run that depends on a rendered page.
//!
//! # Browsers and Pages
//!
//! A [`Browser`] hands out [`Page`]s. Pages are configured (cache, JavaScript,
//! request filtering, device emulation), navigated, and then inspected through
//! a [`DocumentView`] layout snapshot:
//!
//! ```ignore
//! use foldline_render::prelude::*;
//!
//! # async fn example(browser: &dyn Browser) -> RenderResult<()> {
//! let page = browser.new_page().await?;
//! page.set_request_filter(RequestBlocklist::default()).await?;
//! page.emulate(&DeviceProfile::preset("iPhone X").unwrap(), "foldline").await?;
//! page.goto("https://example.com/", &NavigationOptions::default()).await?;
//!
//! let document = page.document().await?;
//! let headings = document.query_selector_all("h1, h2")?;
//! page.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Probing a Page
//!
//! [`CriticalityProbe`] waits for the page's early layout and reports which
//! selectors of a stylesheet style something above the fold:
//!
//! ```ignore
//! use foldline_css::prelude::*;
//! use foldline_render::prelude::*;
//!
//! # async fn example(page: &dyn Page, source: &Stylesheet) -> RenderResult<()> {
//! let probe = CriticalityProbe::new(&ProbeOptions::default().keep_selectors([".always-%"]))?;
//! let critical = probe.run(page, source).await?;
//! let split = partition(source, &critical, &PartitionOptions::default());
//! # Ok(())
//! # }
//! ```
//!
//! # Static Backend
//!
//! [`StaticBrowser`] serves pre-laid-out [`DocumentSnapshot`]s instead of
//! rendering. Snapshots can be built in code or loaded from JSON, which is
//! also the "markup" format its pages accept in [`Page::set_content`].

pub mod device;
pub mod document;
pub mod page;
pub mod probe;
pub mod request;
pub mod screenshot;
pub mod static_browser;

mod error;
mod types;

pub use device::DeviceProfile;
pub use document::{DocumentSnapshot, DocumentView, ElementSnapshot, NodeId, StaticDocument};
pub use error::{RenderError, RenderResult};
pub use page::{Browser, NavigationOptions, Page, WaitUntil};
pub use probe::{CriticalityProbe, ProbeOptions, SelectorPattern, Triage};
pub use request::{DEFAULT_BLOCKED_REQUESTS, RequestBlocklist};
pub use static_browser::{PageEvent, PageId, StaticBrowser, StaticPage};
pub use types::{Rect, Viewport};

/// Prelude module with commonly used types.
pub mod prelude {
    pub use crate::{
        Browser, CriticalityProbe, DeviceProfile, DocumentSnapshot, DocumentView, ElementSnapshot,
        NavigationOptions, NodeId, Page, ProbeOptions, Rect, RenderError, RenderResult,
        RequestBlocklist, StaticBrowser, StaticDocument, Viewport, WaitUntil,
    };
}

//! foldline: critical CSS extraction.
//!
//! foldline renders a set of pages, finds the style rules needed to paint
//! what is visible before scrolling, and splits a stylesheet into a critical
//! part (to inline) and the remaining rules (to load later). Results from many
//! pages are folded together, so one critical stylesheet serves all of them.
//!
//! This is the umbrella crate: it re-exports the CSS layer
//! ([`css`]), the rendering interface ([`render`]), and adds configuration and
//! the multi-page [`Orchestrator`](orchestrator::Orchestrator).
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use foldline::prelude::*;
//!
//! let config = CriticalCssConfig::from_file("foldline.toml")?;
//! let browser: Arc<dyn Browser> = Arc::new(StaticBrowser::new());
//!
//! let output = Orchestrator::new(config)?
//!     .run(BrowserSession::Owned(browser))
//!     .await?;
//! println!("{}", output.critical);
//! ```

pub mod config;
pub mod logging;
pub mod orchestrator;
pub mod source;

mod error;

pub use error::{Error, PageError, Result};

/// Stylesheet model, rule maps, and partitioning.
pub mod css {
    pub use foldline_css::*;
}

/// Rendering-engine interface and the above-the-fold probe.
pub mod render {
    pub use foldline_render::*;
}

pub mod prelude;

//! Prelude module for foldline.
//!
//! ```ignore
//! use foldline::prelude::*;
//! ```
//!
//! This provides access to:
//! - Run configuration (`CriticalCssConfig`, `DeviceSetting`)
//! - Orchestration (`Orchestrator`, `BrowserSession`, `RunOutput`)
//! - Browser interface (`Browser`, `Page`, `StaticBrowser`, snapshots)
//! - The CSS layer (`Stylesheet`, `RuleMap`, `partition`)

// ============================================================================
// Configuration and Orchestration
// ============================================================================

pub use crate::config::{CriticalCssConfig, DeviceSetting, ScreenshotConfig};
pub use crate::orchestrator::{BrowserSession, Orchestrator, PageResult, RunOutput, TaskState};
pub use crate::source::{CssSource, PageTarget};
pub use crate::{Error, PageError, Result};

// ============================================================================
// Rendering
// ============================================================================

pub use foldline_render::{
    Browser, CriticalityProbe, DeviceProfile, DocumentSnapshot, DocumentView, ElementSnapshot,
    NavigationOptions, Page, ProbeOptions, Rect, RenderError, RequestBlocklist, StaticBrowser,
    Viewport,
};

// ============================================================================
// CSS
// ============================================================================

pub use foldline_css::prelude::{
    CriticalSelectorMap, CssCodec, CssParserCodec, InvalidEntryPolicy, Partition,
    PartitionOptions, PrintOptions, RuleKey, RuleMap, RuleNode, Stylesheet, partition,
};

//! Logging facilities for foldline.
//!
//! foldline uses the `tracing` crate for instrumentation and never installs a
//! subscriber itself. To see logs, install one in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("foldline=info,foldline_render::probe=debug")
//!     .init();
//! ```
//!
//! Every page evaluation runs inside a [`span_names::PAGE`] span carrying the
//! URL, so events from the probe and the page backend are attributed to the
//! page that produced them.

/// Span names used by foldline.
pub mod span_names {
    /// A whole critical CSS run.
    pub const RUN: &str = "critical_css";
    /// Evaluation of a single URL.
    pub const PAGE: &str = "page";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// CSS parsing.
    pub const CSS: &str = "foldline_css::parser";
    /// Rule map merging and assembly.
    pub const RULE_MAP: &str = "foldline_css::rule_map";
    /// Critical/remaining partitioning.
    pub const PARTITION: &str = "foldline_css::partition";
    /// Above-the-fold probe.
    pub const PROBE: &str = "foldline_render::probe";
    /// Page and browser backends.
    pub const PAGE: &str = "foldline_render::page";
    /// Screenshots.
    pub const SCREENSHOT: &str = "foldline_render::screenshot";
    /// Run orchestration.
    pub const ORCHESTRATOR: &str = "foldline::orchestrator";
    /// Source CSS resolution.
    pub const SOURCE: &str = "foldline::source";
}

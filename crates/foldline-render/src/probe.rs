//! The above-the-fold probe.
//!
//! [`CriticalityProbe`] decides, for every selector of a stylesheet, whether it
//! styles something visible when the page first renders. It walks the same
//! group prefix chain as [`foldline_css::partition`] so the keys of the
//! resulting [`CriticalSelectorMap`] line up with the partitioner's.
//!
//! A selector is critical when, checked in order:
//!
//! 1. it matches a keep pattern,
//! 2. it does not match a remove pattern,
//! 3. it is a pure pseudo selector (`::selection`), or
//! 4. stripped of non-structural pseudos, it matches an element whose top
//!    edge lies above the viewport height.

use std::collections::HashSet;
use std::time::Duration;

use foldline_css::classify::{self, PROBED_KINDS};
use foldline_css::critical::CriticalSelectorMap;
use foldline_css::rules::{RuleNode, Stylesheet};
use regex::Regex;
use tokio::time::{Instant, interval};
use tracing::{debug, trace};

use crate::document::{DocumentView, NodeId};
use crate::error::RenderResult;
use crate::page::Page;

/// How often the load watchdog samples the page, one animation frame.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Default time the page may load before the watchdog stops it.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_millis(2000);

/// A keep or remove selector pattern.
///
/// `%` matches any substring; the pattern must match the whole selector.
#[derive(Debug, Clone)]
pub struct SelectorPattern {
    source: String,
    regex: Regex,
}

impl SelectorPattern {
    /// Compile a pattern.
    pub fn new(pattern: impl Into<String>) -> RenderResult<Self> {
        let source = pattern.into();
        let regex = Regex::new(&format!("^{}$", regex::escape(&source).replace('%', ".*")))?;
        Ok(Self { source, regex })
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the selector is this pattern or matches its glob.
    pub fn matches(&self, selector: &str) -> bool {
        self.source == selector || self.regex.is_match(selector)
    }
}

/// Options for [`CriticalityProbe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Selectors that are always critical.
    pub keep_selectors: Vec<String>,
    /// Selectors that are never critical.
    pub remove_selectors: Vec<String>,
    /// How long the page may load before it is stopped.
    pub load_timeout: Duration,
}

impl ProbeOptions {
    pub fn keep_selectors<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keep_selectors = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn remove_selectors<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remove_selectors = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            keep_selectors: Vec::new(),
            remove_selectors: Vec::new(),
            load_timeout: DEFAULT_LOAD_TIMEOUT,
        }
    }
}

/// How a single selector is decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Triage {
    /// Matched a keep pattern.
    Keep,
    /// Matched a remove pattern.
    Remove,
    /// Starts with a pseudo and cannot be queried.
    PurePseudo,
    /// Needs a document query with this selector.
    Query(String),
}

/// Pseudo selectors that are removed before querying, and those that keep a
/// leading pseudo queryable.
#[derive(Debug, Clone)]
struct PseudoFilters {
    non_structural: Regex,
    vendor: Regex,
    queryable: Regex,
}

impl PseudoFilters {
    fn new() -> RenderResult<Self> {
        Ok(Self {
            non_structural: Regex::new(
                r":?:(?:after|before|first-line|first-letter|selection|visited)",
            )?,
            vendor: Regex::new(r":?:-[a-z-]*")?,
            queryable: Regex::new(r":?:root")?,
        })
    }

    fn is_pure_pseudo(&self, selector: &str) -> bool {
        selector.starts_with(':') && !self.queryable.is_match(selector)
    }

    fn strip(&self, selector: &str) -> String {
        let stripped = self.non_structural.replace_all(selector, "");
        self.vendor.replace_all(&stripped, "").trim().to_string()
    }
}

/// Decides which selectors of a stylesheet are needed above the fold.
#[derive(Debug, Clone)]
pub struct CriticalityProbe {
    keep: Vec<SelectorPattern>,
    remove: Vec<SelectorPattern>,
    load_timeout: Duration,
    pseudos: PseudoFilters,
}

impl CriticalityProbe {
    /// Compile the probe's patterns.
    pub fn new(options: &ProbeOptions) -> RenderResult<Self> {
        Ok(Self {
            keep: compile_patterns(&options.keep_selectors)?,
            remove: compile_patterns(&options.remove_selectors)?,
            load_timeout: options.load_timeout,
            pseudos: PseudoFilters::new()?,
        })
    }

    /// Decide how a selector is evaluated.
    pub fn triage(&self, selector: &str) -> Triage {
        if self.keep.iter().any(|pattern| pattern.matches(selector)) {
            Triage::Keep
        } else if self.remove.iter().any(|pattern| pattern.matches(selector)) {
            Triage::Remove
        } else if self.pseudos.is_pure_pseudo(selector) {
            Triage::PurePseudo
        } else {
            Triage::Query(self.pseudos.strip(selector))
        }
    }

    /// Wait for the page's early layout, then evaluate `source` against it.
    pub async fn run(&self, page: &dyn Page, source: &Stylesheet) -> RenderResult<CriticalSelectorMap> {
        self.wait_for_layout(page).await?;
        let document = page.document().await?;
        Ok(self.evaluate(document.as_ref(), source))
    }

    /// Sample the page once per frame until it finishes loading, stopping it
    /// once the load timeout has passed.
    pub async fn wait_for_layout(&self, page: &dyn Page) -> RenderResult<()> {
        let start = Instant::now();
        let mut frames = interval(FRAME_INTERVAL);

        loop {
            frames.tick().await;
            if !page.is_loading().await? {
                trace!(
                    target: "foldline_render::probe",
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "page finished loading"
                );
                return Ok(());
            }
            if start.elapsed() >= self.load_timeout {
                debug!(
                    target: "foldline_render::probe",
                    timeout_ms = self.load_timeout.as_millis() as u64,
                    "load timeout reached, stopping page"
                );
                return page.stop_loading().await;
            }
        }
    }

    /// Evaluate every probed rule of `source` against a laid-out document.
    pub fn evaluate(&self, document: &dyn DocumentView, source: &Stylesheet) -> CriticalSelectorMap {
        let mut evaluation = Evaluation {
            probe: self,
            document,
            fold: document.viewport().height as f32,
            above_fold: HashSet::new(),
            critical: CriticalSelectorMap::new(),
        };
        evaluation.walk(&source.rules, "");

        debug!(
            target: "foldline_render::probe",
            keys = evaluation.critical.len(),
            above_fold = evaluation.above_fold.len(),
            "evaluated stylesheet"
        );
        evaluation.critical
    }
}

fn compile_patterns(patterns: &[String]) -> RenderResult<Vec<SelectorPattern>> {
    patterns.iter().map(SelectorPattern::new).collect()
}

/// State of one [`CriticalityProbe::evaluate`] call.
struct Evaluation<'a> {
    probe: &'a CriticalityProbe,
    document: &'a dyn DocumentView,
    fold: f32,
    above_fold: HashSet<NodeId>,
    critical: CriticalSelectorMap,
}

impl Evaluation<'_> {
    fn walk(&mut self, rules: &[RuleNode], prefix: &str) {
        for rule in rules {
            let kind = rule.kind();
            if !PROBED_KINDS.contains(&kind) {
                debug!(
                    target: "foldline_render::probe",
                    kind = kind.as_str(),
                    prefix,
                    "skipping rule kind"
                );
                continue;
            }

            if rule.is_rule_group() {
                let group_prefix = classify::extend_group_prefix(prefix, rule);
                self.walk(rule.children().unwrap_or_default(), &group_prefix);
                continue;
            }

            let Some(key) = classify::rule_key(rule, prefix, false) else {
                continue;
            };
            for selector in rule.selectors().unwrap_or_default() {
                if self.is_critical(selector) {
                    self.critical.insert(key.clone(), selector.as_str(), kind);
                }
            }
        }
    }

    fn is_critical(&mut self, selector: &str) -> bool {
        match self.probe.triage(selector) {
            Triage::Keep | Triage::PurePseudo => true,
            Triage::Remove => false,
            Triage::Query(query) => self.has_element_above_fold(&query),
        }
    }

    fn has_element_above_fold(&mut self, query: &str) -> bool {
        let nodes = match self.document.query_selector_all(query) {
            Ok(nodes) => nodes,
            Err(e) => {
                trace!(
                    target: "foldline_render::probe",
                    selector = query,
                    error = %e,
                    "selector is not queryable"
                );
                return false;
            }
        };

        for node in nodes {
            if self.above_fold.contains(&node) {
                return true;
            }
            let visible = self
                .document
                .bounding_client_rect(node)
                .is_some_and(|rect| rect.top() < self.fold);
            if visible {
                self.above_fold.insert(node);
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentSnapshot, ElementSnapshot, StaticDocument};
    use crate::types::{Rect, Viewport};
    use foldline_css::rules::RuleKind;

    fn document() -> StaticDocument {
        DocumentSnapshot::new(
            ElementSnapshot::new("html").with_child(
                ElementSnapshot::new("body")
                    .with_child(
                        ElementSnapshot::new("div")
                            .with_class("a")
                            .with_rect(Rect::new(0.0, 10.0, 800.0, 100.0)),
                    )
                    .with_child(
                        ElementSnapshot::new("div")
                            .with_class("b")
                            .with_rect(Rect::new(0.0, 1500.0, 800.0, 100.0)),
                    )
                    .with_child(
                        ElementSnapshot::new("p")
                            .with_class("c")
                            .with_rect(Rect::new(0.0, 599.0, 800.0, 100.0)),
                    )
                    .with_child(
                        ElementSnapshot::new("a")
                            .with_attribute("href", "/")
                            .with_rect(Rect::new(0.0, 20.0, 40.0, 10.0)),
                    ),
            ),
        )
        .layout(Viewport::new(800, 600), true)
    }

    fn probe(options: ProbeOptions) -> CriticalityProbe {
        CriticalityProbe::new(&options).unwrap()
    }

    fn evaluate(options: ProbeOptions, css: &str) -> CriticalSelectorMap {
        let source = Stylesheet::from_css(css).unwrap();
        probe(options).evaluate(&document(), &source)
    }

    #[test]
    fn test_selector_pattern() {
        let pattern = SelectorPattern::new(".always-%").unwrap();
        assert!(pattern.matches(".always-hidden"));
        assert!(pattern.matches(".always-"));
        assert!(!pattern.matches("div .always-hidden"));

        let literal = SelectorPattern::new(".a[href*='x']").unwrap();
        assert!(literal.matches(".a[href*='x']"));
        assert!(!literal.matches(".a"));
    }

    #[test]
    fn test_triage_order() {
        let probe = probe(
            ProbeOptions::default()
                .keep_selectors([".keep-%", "::placeholder"])
                .remove_selectors([".keep-out", ".gone-%", "::selection"]),
        );

        assert_eq!(probe.triage(".keep-out"), Triage::Keep);
        assert_eq!(probe.triage(".gone-1"), Triage::Remove);
        assert_eq!(probe.triage("::selection"), Triage::Remove);
        assert_eq!(probe.triage("::placeholder"), Triage::Keep);
        assert_eq!(probe.triage("::-webkit-scrollbar"), Triage::PurePseudo);
        assert_eq!(probe.triage(":root"), Triage::Query(":root".to_string()));
        assert_eq!(probe.triage(".a::before"), Triage::Query(".a".to_string()));
        assert_eq!(
            probe.triage("a:visited:hover"),
            Triage::Query("a:hover".to_string())
        );
        assert_eq!(
            probe.triage("input::-moz-placeholder"),
            Triage::Query("input".to_string())
        );
    }

    #[test]
    fn test_above_fold_selectors() {
        let critical = evaluate(ProbeOptions::default(), ".a{color:red} .b{color:blue} .c{margin:0}");

        assert!(critical.is_critical(".a", ".a"));
        assert!(!critical.contains_key(".b"));
        // Top edge at 599 is still inside a 600px viewport.
        assert!(critical.is_critical(".c", ".c"));
    }

    #[test]
    fn test_selector_list_is_split() {
        let critical = evaluate(ProbeOptions::default(), ".a, .b, a[href] { color: red }");
        assert_eq!(critical.selectors(".a,.b,a[href]").unwrap(), [".a", "a[href]"]);
        assert_eq!(critical.get(".a,.b,a[href]").unwrap().kind, RuleKind::Rule);
    }

    #[test]
    fn test_nested_groups_use_prefix_chain() {
        let critical = evaluate(
            ProbeOptions::default(),
            "@media (min-width:600px){.a{color:green} @supports (display:grid){.a{display:grid}}}",
        );

        assert!(critical.is_critical("media(min-width:600px).a", ".a"));
        assert!(critical.is_critical("media(min-width:600px)-##-supports(display:grid).a", ".a"));
        assert!(!critical.contains_key(".a"));
    }

    #[test]
    fn test_force_rules() {
        let critical = evaluate(
            ProbeOptions::default()
                .keep_selectors([".always-%"])
                .remove_selectors([".a"]),
            ".always-hidden{display:none} .a{color:red}",
        );

        assert!(critical.is_critical(".always-hidden", ".always-hidden"));
        assert!(!critical.contains_key(".a"));
    }

    #[test]
    fn test_pure_pseudo_and_stripped_selectors() {
        let critical = evaluate(
            ProbeOptions::default(),
            "::selection{color:red} .b::after{content:''} .a::before{content:''} :root{--x:1}",
        );

        assert!(critical.is_critical("::selection", "::selection"));
        assert!(!critical.contains_key(".b::after"));
        assert!(critical.is_critical(".a::before", ".a::before"));
        assert!(critical.is_critical(":root", ":root"));
    }

    #[test]
    fn test_unqueryable_selector_is_not_critical() {
        let critical = evaluate(
            ProbeOptions::default(),
            ".a:unknown-state{color:red} .a{color:blue}",
        );

        assert!(!critical.contains_key(".a:unknown-state"));
        assert!(critical.is_critical(".a", ".a"));
    }

    #[test]
    fn test_skipped_kinds() {
        let critical = evaluate(
            ProbeOptions::default(),
            "@font-face{font-family:x} @keyframes spin{to{opacity:1}} @layer base{.a{color:red}} .a{color:red}",
        );

        assert_eq!(critical.len(), 1);
        assert!(critical.is_critical(".a", ".a"));
    }

    #[test]
    fn test_repeated_selector_uses_cache() {
        let document = document();
        let probe = probe(ProbeOptions::default());
        let mut evaluation = Evaluation {
            probe: &probe,
            document: &document,
            fold: 600.0,
            above_fold: HashSet::new(),
            critical: CriticalSelectorMap::new(),
        };

        assert!(evaluation.has_element_above_fold("div"));
        assert_eq!(evaluation.above_fold.len(), 1);
        assert!(evaluation.has_element_above_fold(".a"));
        assert_eq!(evaluation.above_fold.len(), 1);
        assert!(!evaluation.has_element_above_fold(".b"));
    }
}

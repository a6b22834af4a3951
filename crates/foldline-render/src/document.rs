//! Laid-out documents.
//!
//! A rendered page is inspected through a [`DocumentView`]: a read-only layout
//! snapshot that answers `querySelectorAll`-style queries and reports element
//! boxes. [`StaticDocument`] is the in-memory implementation, built from a
//! serializable [`DocumentSnapshot`].
//!
//! # Example
//!
//! ```ignore
//! use foldline_render::document::{DocumentSnapshot, ElementSnapshot};
//! use foldline_render::{DocumentView, Rect, Viewport};
//!
//! let snapshot = DocumentSnapshot::new(
//!     ElementSnapshot::new("html").with_child(
//!         ElementSnapshot::new("body")
//!             .with_child(ElementSnapshot::new("h1").with_rect(Rect::new(0.0, 0.0, 800.0, 40.0)))
//!             .with_child(
//!                 ElementSnapshot::new("img")
//!                     .with_class("hero")
//!                     .with_rect(Rect::new(0.0, 2000.0, 800.0, 400.0))
//!                     .lazy(),
//!             ),
//!     ),
//! );
//!
//! let document = snapshot.layout(Viewport::new(800, 600), true);
//! assert_eq!(document.query_selector_all("h1")?.len(), 1);
//! ```

use std::fmt;
use std::time::Duration;

use foldline_css::selector::{MatchElement, SelectorMatcher, parse_selector_list};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::RenderResult;
use crate::types::{Rect, Viewport};

/// Identifies an element within one document snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Read access to a laid-out document.
pub trait DocumentView: Send + Sync {
    /// The viewport the document was laid out in.
    fn viewport(&self) -> Viewport;

    /// All elements matching a selector list, in document order.
    ///
    /// Fails if the selector cannot be parsed or uses unsupported features.
    fn query_selector_all(&self, selector: &str) -> RenderResult<Vec<NodeId>>;

    /// The element's border box relative to the viewport.
    fn bounding_client_rect(&self, node: NodeId) -> Option<Rect>;
}

/// A serializable element with its computed border box.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementSnapshot {
    /// Lowercase tag name.
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,
    pub rect: Rect,
    /// Whether the element only appears once the page has finished loading.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub lazy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementSnapshot>,
}

impl ElementSnapshot {
    /// Create an element with the given tag name.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Mark the element (and its subtree) as loaded late.
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn with_child(mut self, child: ElementSnapshot) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = ElementSnapshot>) -> Self {
        self.children.extend(children);
        self
    }
}

/// A serializable page: element tree, stylesheets, and load behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    pub root: ElementSnapshot,
    /// Stylesheet texts in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stylesheets: Vec<String>,
    /// Subresource URLs requested while loading.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subresources: Vec<String>,
    /// How long the page takes to finish loading after navigation.
    #[serde(default)]
    pub load_time_ms: u64,
}

impl DocumentSnapshot {
    /// Create a snapshot that finishes loading immediately.
    pub fn new(root: ElementSnapshot) -> Self {
        Self {
            root,
            stylesheets: Vec::new(),
            subresources: Vec::new(),
            load_time_ms: 0,
        }
    }

    /// Parse a snapshot from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Serialize the snapshot to JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn with_stylesheet(mut self, css: impl Into<String>) -> Self {
        self.stylesheets.push(css.into());
        self
    }

    pub fn with_subresource(mut self, url: impl Into<String>) -> Self {
        self.subresources.push(url.into());
        self
    }

    pub fn with_load_time(mut self, load_time: Duration) -> Self {
        self.load_time_ms = load_time.as_millis() as u64;
        self
    }

    /// The simulated load duration.
    pub fn load_time(&self) -> Duration {
        Duration::from_millis(self.load_time_ms)
    }

    /// All stylesheet texts joined by newlines.
    pub fn stylesheet_text(&self) -> String {
        self.stylesheets.join("\n")
    }

    /// Lay the snapshot out in a viewport.
    ///
    /// Lazy elements are only present when `loaded` is true.
    pub fn layout(&self, viewport: Viewport, loaded: bool) -> StaticDocument {
        let mut document = StaticDocument {
            nodes: Vec::new(),
            viewport,
        };
        document.push(&self.root, None, loaded);
        document
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    class_attribute: Option<String>,
    attributes: IndexMap<String, String>,
    rect: Rect,
    has_text: bool,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// An immutable, laid-out element tree stored in document order.
#[derive(Debug, Clone)]
pub struct StaticDocument {
    nodes: Vec<NodeData>,
    viewport: Viewport,
}

impl StaticDocument {
    fn push(&mut self, element: &ElementSnapshot, parent: Option<usize>, loaded: bool) {
        if element.lazy && !loaded {
            return;
        }

        let index = self.nodes.len();
        self.nodes.push(NodeData {
            tag: element.tag.to_ascii_lowercase(),
            id: element.id.clone(),
            classes: element.classes.clone(),
            class_attribute: (!element.classes.is_empty()).then(|| element.classes.join(" ")),
            attributes: element.attributes.clone(),
            rect: element.rect,
            has_text: element.text.as_deref().is_some_and(|text| !text.is_empty()),
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent].children.push(index);
        }

        for child in &element.children {
            self.push(child, Some(index), loaded);
        }
    }

    /// Number of elements in the document.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the document has no elements.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Tag name of an element.
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.0).map(|data| data.tag.as_str())
    }

    /// Every element with its border box, in document order.
    pub fn boxes(&self) -> impl Iterator<Item = (NodeId, Rect)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, data)| (NodeId(index), data.rect))
    }

    fn element(&self, index: usize) -> ElementRef<'_> {
        ElementRef {
            document: self,
            index,
        }
    }
}

impl DocumentView for StaticDocument {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn query_selector_all(&self, selector: &str) -> RenderResult<Vec<NodeId>> {
        let list = parse_selector_list(selector)?;
        Ok((0..self.nodes.len())
            .filter(|&index| SelectorMatcher::matches(&list, &self.element(index)))
            .map(NodeId)
            .collect())
    }

    fn bounding_client_rect(&self, node: NodeId) -> Option<Rect> {
        self.nodes.get(node.0).map(|data| data.rect)
    }
}

/// An element of a [`StaticDocument`], as seen by the selector matcher.
#[derive(Clone, Copy)]
struct ElementRef<'a> {
    document: &'a StaticDocument,
    index: usize,
}

impl<'a> ElementRef<'a> {
    fn data(&self) -> &'a NodeData {
        &self.document.nodes[self.index]
    }

    fn sibling(&self, offset: isize) -> Option<Self> {
        let parent = self.data().parent?;
        let siblings = &self.document.nodes[parent].children;
        let position = siblings.iter().position(|&child| child == self.index)?;
        let target = position.checked_add_signed(offset)?;
        siblings
            .get(target)
            .map(|&index| self.document.element(index))
    }
}

impl MatchElement for ElementRef<'_> {
    fn local_name(&self) -> &str {
        &self.data().tag
    }

    fn id(&self) -> Option<&str> {
        self.data().id.as_deref()
    }

    fn has_class(&self, class: &str) -> bool {
        self.data().classes.iter().any(|c| c == class)
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        let data = self.data();
        match name {
            "id" => data.id.as_deref(),
            "class" => data.class_attribute.as_deref(),
            _ => data.attributes.get(name).map(String::as_str),
        }
    }

    fn parent(&self) -> Option<Self> {
        self.data()
            .parent
            .map(|index| self.document.element(index))
    }

    fn prev_sibling(&self) -> Option<Self> {
        self.sibling(-1)
    }

    fn next_sibling(&self) -> Option<Self> {
        self.sibling(1)
    }

    fn has_child_nodes(&self) -> bool {
        let data = self.data();
        data.has_text || !data.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> DocumentSnapshot {
        DocumentSnapshot::new(
            ElementSnapshot::new("html").with_child(
                ElementSnapshot::new("body")
                    .with_child(
                        ElementSnapshot::new("header")
                            .with_id("top")
                            .with_class("site-header")
                            .with_rect(Rect::new(0.0, 0.0, 800.0, 80.0))
                            .with_child(
                                ElementSnapshot::new("a")
                                    .with_attribute("href", "/")
                                    .with_text("Home")
                                    .with_rect(Rect::new(10.0, 10.0, 60.0, 20.0)),
                            ),
                    )
                    .with_child(
                        ElementSnapshot::new("IMG")
                            .with_class("hero")
                            .with_rect(Rect::new(0.0, 900.0, 800.0, 400.0))
                            .lazy(),
                    )
                    .with_child(
                        ElementSnapshot::new("footer").with_rect(Rect::new(0.0, 2000.0, 800.0, 100.0)),
                    ),
            ),
        )
    }

    #[test]
    fn test_document_order() {
        let document = page().layout(Viewport::new(800, 600), true);
        assert_eq!(document.len(), 6);
        assert_eq!(document.tag(NodeId(0)), Some("html"));
        assert_eq!(document.tag(NodeId(4)), Some("img"));
        assert_eq!(document.tag(NodeId(9)), None);
    }

    #[test]
    fn test_lazy_elements_need_complete_load() {
        let snapshot = page();
        let loaded = snapshot.layout(Viewport::new(800, 600), true);
        let stopped = snapshot.layout(Viewport::new(800, 600), false);

        assert_eq!(loaded.query_selector_all(".hero").unwrap().len(), 1);
        assert!(stopped.query_selector_all(".hero").unwrap().is_empty());
        assert_eq!(stopped.len(), 5);
    }

    #[test]
    fn test_queries() {
        let document = page().layout(Viewport::new(800, 600), true);

        assert_eq!(
            document.query_selector_all("#top > a[href]").unwrap(),
            vec![NodeId(3)]
        );
        assert_eq!(
            document.query_selector_all("[class~=site-header]").unwrap(),
            vec![NodeId(2)]
        );
        assert_eq!(
            document.query_selector_all("body > :last-child").unwrap(),
            vec![NodeId(5)]
        );
        assert_eq!(
            document.query_selector_all("header, footer").unwrap(),
            vec![NodeId(2), NodeId(5)]
        );
        assert!(document.query_selector_all("a:empty").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_query_is_an_error() {
        let document = page().layout(Viewport::new(800, 600), true);
        assert!(document.query_selector_all("a:bogus").is_err());
        assert!(document.query_selector_all("> a").is_err());
        assert!(document.query_selector_all("").is_err());
    }

    #[test]
    fn test_bounding_client_rect() {
        let document = page().layout(Viewport::new(800, 600), true);
        assert_eq!(
            document.bounding_client_rect(NodeId(5)),
            Some(Rect::new(0.0, 2000.0, 800.0, 100.0))
        );
        assert_eq!(document.bounding_client_rect(NodeId(42)), None);
    }

    #[test]
    fn test_snapshot_json() {
        let json = r#"{
            "root": {
                "tag": "html",
                "children": [
                    {"tag": "p", "classes": ["intro"], "rect": {"x": 0, "y": 10, "width": 100, "height": 20}},
                    {"tag": "p", "lazy": true}
                ]
            },
            "stylesheets": [".intro{color:red}"],
            "subresources": ["https://www.google-analytics.com/analytics.js"],
            "loadTimeMs": 50
        }"#;

        let snapshot = DocumentSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.load_time(), Duration::from_millis(50));
        assert_eq!(snapshot.stylesheet_text(), ".intro{color:red}");

        let document = snapshot.layout(Viewport::default(), false);
        assert_eq!(document.query_selector_all("p").unwrap(), vec![NodeId(1)]);

        let reparsed = DocumentSnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(reparsed, snapshot);
    }
}

//! Rule node definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Location of a node in the source text.
///
/// Both fields are 1-indexed. Positions never take part in content hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Line number.
    pub line: u32,
    /// Column number.
    pub column: u32,
}

impl Position {
    /// Create a new position.
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A single `property: value` pair.
///
/// The value is kept verbatim (including any `!important`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Declaration {
    /// Property name.
    pub property: String,
    /// Raw property value.
    pub value: String,
}

impl Declaration {
    /// Create a declaration.
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }
}

/// A style rule: an ordered selector list and its declarations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StyleRule {
    /// Selectors, in source order.
    pub selectors: Vec<String>,
    /// Declarations, in source order.
    pub declarations: Vec<Declaration>,
    /// Source position.
    pub position: Option<Position>,
}

impl StyleRule {
    /// Create a style rule without position information.
    pub fn new(
        selectors: impl IntoIterator<Item = impl Into<String>>,
        declarations: Vec<Declaration>,
    ) -> Self {
        Self {
            selectors: selectors.into_iter().map(Into::into).collect(),
            declarations,
            position: None,
        }
    }
}

/// A conditional group (`@media` or `@supports`) owning child rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupRule {
    /// Media query or supports condition.
    pub criterion: String,
    /// Child rules.
    pub rules: Vec<RuleNode>,
    /// Source position.
    pub position: Option<Position>,
}

impl GroupRule {
    /// Create a group without position information.
    pub fn new(criterion: impl Into<String>, rules: Vec<RuleNode>) -> Self {
        Self {
            criterion: criterion.into(),
            rules,
            position: None,
        }
    }
}

/// An `@keyframes` block, possibly vendor-prefixed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyframesRule {
    /// Vendor prefix including dashes (e.g. `-webkit-`).
    pub vendor: Option<String>,
    /// Animation name.
    pub name: String,
    /// Keyframe children.
    pub keyframes: Vec<RuleNode>,
    /// Source position.
    pub position: Option<Position>,
}

/// One step of an animation (`0%, 50% { ... }`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyframeRule {
    /// Keyframe selectors (`from`, `50%`, ...).
    pub values: Vec<String>,
    /// Declarations.
    pub declarations: Vec<Declaration>,
    /// Source position.
    pub position: Option<Position>,
}

/// An `@font-face` block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontFaceRule {
    /// Declarations.
    pub declarations: Vec<Declaration>,
    /// Source position.
    pub position: Option<Position>,
}

/// An `@charset` statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharsetRule {
    /// The raw charset value, quotes included.
    pub charset: String,
    /// Source position.
    pub position: Option<Position>,
}

/// A comment between rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommentNode {
    /// Comment text without the delimiters.
    pub text: String,
    /// Source position.
    pub position: Option<Position>,
}

/// Body of an at-rule that has no dedicated variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AtRuleBody {
    /// `@import url(x.css);`
    Statement,
    /// `@page { margin: 0 }`
    Declarations(Vec<Declaration>),
    /// `@layer base { ... }`
    Rules(Vec<RuleNode>),
}

/// Any at-rule without a dedicated variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AtRule {
    /// At-keyword without the `@`, as written.
    pub name: String,
    /// Prelude text between the keyword and the block.
    pub prelude: String,
    /// Body.
    pub body: AtRuleBody,
    /// Source position.
    pub position: Option<Position>,
}

/// Kind tag of a rule node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    /// The stylesheet root.
    Stylesheet,
    /// Style rule.
    Rule,
    /// `@media`.
    Media,
    /// `@supports`.
    Supports,
    /// `@keyframes`.
    Keyframes,
    /// A single keyframe.
    Keyframe,
    /// `@font-face`.
    FontFace,
    /// `@charset`.
    Charset,
    /// Comment.
    Comment,
    /// Any other at-rule.
    Other,
}

impl RuleKind {
    /// Type name as used in rule keys and group ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Stylesheet => "stylesheet",
            RuleKind::Rule => "rule",
            RuleKind::Media => "media",
            RuleKind::Supports => "supports",
            RuleKind::Keyframes => "keyframes",
            RuleKind::Keyframe => "keyframe",
            RuleKind::FontFace => "font-face",
            RuleKind::Charset => "charset",
            RuleKind::Comment => "comment",
            RuleKind::Other => "at-rule",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the stylesheet tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RuleNode {
    Rule(StyleRule),
    Media(GroupRule),
    Supports(GroupRule),
    Keyframes(KeyframesRule),
    Keyframe(KeyframeRule),
    FontFace(FontFaceRule),
    Charset(CharsetRule),
    Comment(CommentNode),
    AtRule(AtRule),
}

impl RuleNode {
    /// Kind tag of this node.
    pub fn kind(&self) -> RuleKind {
        match self {
            RuleNode::Rule(_) => RuleKind::Rule,
            RuleNode::Media(_) => RuleKind::Media,
            RuleNode::Supports(_) => RuleKind::Supports,
            RuleNode::Keyframes(_) => RuleKind::Keyframes,
            RuleNode::Keyframe(_) => RuleKind::Keyframe,
            RuleNode::FontFace(_) => RuleKind::FontFace,
            RuleNode::Charset(_) => RuleKind::Charset,
            RuleNode::Comment(_) => RuleKind::Comment,
            RuleNode::AtRule(_) => RuleKind::Other,
        }
    }

    /// Type name: the kind name, or the at-keyword for generic at-rules.
    pub fn type_name(&self) -> &str {
        match self {
            RuleNode::AtRule(rule) => &rule.name,
            other => other.kind().as_str(),
        }
    }

    /// Selector list of a style rule.
    pub fn selectors(&self) -> Option<&[String]> {
        match self {
            RuleNode::Rule(rule) => Some(&rule.selectors),
            _ => None,
        }
    }

    /// Declarations, for kinds that carry a declaration block.
    pub fn declarations(&self) -> Option<&[Declaration]> {
        match self {
            RuleNode::Rule(rule) => Some(&rule.declarations),
            RuleNode::Keyframe(rule) => Some(&rule.declarations),
            RuleNode::FontFace(rule) => Some(&rule.declarations),
            RuleNode::AtRule(AtRule {
                body: AtRuleBody::Declarations(declarations),
                ..
            }) => Some(declarations),
            _ => None,
        }
    }

    /// Children of a grouping node.
    pub fn children(&self) -> Option<&[RuleNode]> {
        match self {
            RuleNode::Media(group) | RuleNode::Supports(group) => Some(&group.rules),
            RuleNode::Keyframes(keyframes) => Some(&keyframes.keyframes),
            RuleNode::AtRule(AtRule {
                body: AtRuleBody::Rules(rules),
                ..
            }) => Some(rules),
            _ => None,
        }
    }

    /// Criterion string of a grouping node.
    pub fn criterion(&self) -> Option<&str> {
        match self {
            RuleNode::Media(group) | RuleNode::Supports(group) => Some(&group.criterion),
            RuleNode::Keyframes(keyframes) => Some(&keyframes.name),
            RuleNode::AtRule(rule) => Some(&rule.prelude),
            _ => None,
        }
    }

    /// Whether this node groups style rules (`@media`, `@supports`, block at-rules).
    ///
    /// Keyframes own children too, but those are keyframe steps, not style
    /// rules, so they are never walked for selectors.
    pub fn is_rule_group(&self) -> bool {
        match self {
            RuleNode::Media(_) | RuleNode::Supports(_) => true,
            RuleNode::AtRule(rule) => matches!(rule.body, AtRuleBody::Rules(_)),
            _ => false,
        }
    }

    /// Whether this node is a comment.
    pub fn is_comment(&self) -> bool {
        matches!(self, RuleNode::Comment(_))
    }

    /// Source position of this node.
    pub fn position(&self) -> Option<Position> {
        match self {
            RuleNode::Rule(rule) => rule.position,
            RuleNode::Media(group) | RuleNode::Supports(group) => group.position,
            RuleNode::Keyframes(rule) => rule.position,
            RuleNode::Keyframe(rule) => rule.position,
            RuleNode::FontFace(rule) => rule.position,
            RuleNode::Charset(rule) => rule.position,
            RuleNode::Comment(comment) => comment.position,
            RuleNode::AtRule(rule) => rule.position,
        }
    }

    /// Copy of this node with a replaced selector list.
    ///
    /// Nodes other than style rules are returned unchanged.
    pub fn with_selectors(&self, selectors: Vec<String>) -> RuleNode {
        match self {
            RuleNode::Rule(rule) => RuleNode::Rule(StyleRule {
                selectors,
                declarations: rule.declarations.clone(),
                position: rule.position,
            }),
            other => other.clone(),
        }
    }

    /// Copy of this node with replaced children.
    ///
    /// Nodes without children are returned unchanged.
    pub fn with_children(&self, children: Vec<RuleNode>) -> RuleNode {
        match self {
            RuleNode::Media(group) => RuleNode::Media(GroupRule {
                criterion: group.criterion.clone(),
                rules: children,
                position: group.position,
            }),
            RuleNode::Supports(group) => RuleNode::Supports(GroupRule {
                criterion: group.criterion.clone(),
                rules: children,
                position: group.position,
            }),
            RuleNode::Keyframes(rule) => RuleNode::Keyframes(KeyframesRule {
                vendor: rule.vendor.clone(),
                name: rule.name.clone(),
                keyframes: children,
                position: rule.position,
            }),
            RuleNode::AtRule(rule) if matches!(rule.body, AtRuleBody::Rules(_)) => {
                RuleNode::AtRule(AtRule {
                    name: rule.name.clone(),
                    prelude: rule.prelude.clone(),
                    body: AtRuleBody::Rules(children),
                    position: rule.position,
                })
            }
            other => other.clone(),
        }
    }

    /// Deep copy with every source position removed.
    pub fn without_position(&self) -> RuleNode {
        let mut node = self.clone();
        node.strip_positions();
        node
    }

    fn strip_positions(&mut self) {
        match self {
            RuleNode::Rule(rule) => rule.position = None,
            RuleNode::Media(group) | RuleNode::Supports(group) => {
                group.position = None;
                group.rules.iter_mut().for_each(RuleNode::strip_positions);
            }
            RuleNode::Keyframes(rule) => {
                rule.position = None;
                rule.keyframes.iter_mut().for_each(RuleNode::strip_positions);
            }
            RuleNode::Keyframe(rule) => rule.position = None,
            RuleNode::FontFace(rule) => rule.position = None,
            RuleNode::Charset(rule) => rule.position = None,
            RuleNode::Comment(comment) => comment.position = None,
            RuleNode::AtRule(rule) => {
                rule.position = None;
                if let AtRuleBody::Rules(rules) = &mut rule.body {
                    rules.iter_mut().for_each(RuleNode::strip_positions);
                }
            }
        }
    }
}

impl From<StyleRule> for RuleNode {
    fn from(rule: StyleRule) -> Self {
        RuleNode::Rule(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(selectors: &[&str]) -> RuleNode {
        StyleRule::new(selectors.iter().copied(), vec![Declaration::new("color", "red")]).into()
    }

    #[test]
    fn kind_and_type_name() {
        let at_rule = RuleNode::AtRule(AtRule {
            name: "page".into(),
            prelude: ":first".into(),
            body: AtRuleBody::Declarations(vec![]),
            position: None,
        });

        assert_eq!(style(&[".a"]).kind(), RuleKind::Rule);
        assert_eq!(style(&[".a"]).type_name(), "rule");
        assert_eq!(at_rule.kind(), RuleKind::Other);
        assert_eq!(at_rule.type_name(), "page");
        assert_eq!(RuleKind::FontFace.as_str(), "font-face");
    }

    #[test]
    fn rule_groups() {
        let media = RuleNode::Media(GroupRule::new("screen", vec![style(&[".a"])]));
        let keyframes = RuleNode::Keyframes(KeyframesRule {
            vendor: None,
            name: "spin".into(),
            keyframes: vec![],
            position: None,
        });

        assert!(media.is_rule_group());
        assert!(!keyframes.is_rule_group());
        assert!(keyframes.children().is_some());
        assert!(!style(&[".a"]).is_rule_group());
    }

    #[test]
    fn with_children_keeps_criterion() {
        let media = RuleNode::Media(GroupRule::new("print", vec![style(&[".a"]), style(&[".b"])]));
        let trimmed = media.with_children(vec![style(&[".b"])]);

        assert_eq!(trimmed.criterion(), Some("print"));
        assert_eq!(trimmed.children().map(<[RuleNode]>::len), Some(1));
        // Source untouched.
        assert_eq!(media.children().map(<[RuleNode]>::len), Some(2));
    }

    #[test]
    fn strip_positions_recurses() {
        let mut inner = StyleRule::new([".a"], vec![]);
        inner.position = Some(Position::new(2, 3));
        let mut group = GroupRule::new("screen", vec![inner.into()]);
        group.position = Some(Position::new(1, 1));
        let media = RuleNode::Media(group);

        let stripped = media.without_position();
        assert_eq!(stripped.position(), None);
        assert_eq!(stripped.children().unwrap()[0].position(), None);
        assert_eq!(media.position(), Some(Position::new(1, 1)));
    }
}

//! Rule identity.
//!
//! Every rule that takes part in merging or partitioning is addressed by a
//! [`RuleKey`]. Keys of nested rules carry the chain of enclosing groups
//! (`media(min-width:600px)-##-supports(display:grid)`) so that identical
//! selectors in different contexts never share a slot.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rules::{RuleKind, RuleNode};

/// Separator between a group prefix and the rule part of a key, when requested.
pub const RULE_SEPARATOR: &str = "-#-";

/// Separator between the ids of nested groups in a prefix chain.
pub const GROUP_SEPARATOR: &str = "-##-";

/// Key shared by every rule the classifier cannot identify.
///
/// Unrelated rules of unknown kinds all land on this key.
pub const DEFAULT_RULE_KEY: &str = "default";

/// Top-level kinds considered for the critical stylesheet.
pub const CRITICAL_KINDS: &[RuleKind] = &[
    RuleKind::Media,
    RuleKind::Rule,
    RuleKind::Charset,
    RuleKind::FontFace,
    RuleKind::Supports,
];

/// Kinds the in-page probe walks for selectors.
pub const PROBED_KINDS: &[RuleKind] = &[RuleKind::Supports, RuleKind::Media, RuleKind::Rule];

/// Canonical identity string of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleKey(String);

impl RuleKey {
    /// Wrap a key string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the fallback key for unidentified rules.
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_RULE_KEY
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for RuleKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RuleKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for RuleKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Classify a node.
pub fn identify(node: &RuleNode) -> RuleKind {
    node.kind()
}

/// Derive the identity key of `node` inside the group chain `group_prefix`.
///
/// Returns `None` for comments, which never take part in matching. Nodes the
/// classifier cannot identify get [`DEFAULT_RULE_KEY`] without any prefix.
/// With `with_separator`, [`RULE_SEPARATOR`] is placed between the prefix and
/// the rule part.
pub fn rule_key(node: &RuleNode, group_prefix: &str, with_separator: bool) -> Option<RuleKey> {
    let rule_part = match node {
        RuleNode::Rule(rule) => rule.selectors.join(","),
        RuleNode::Charset(charset) => charset.charset.clone(),
        RuleNode::Keyframes(keyframes) => keyframes.name.clone(),
        RuleNode::Keyframe(keyframe) => keyframe.values.join(","),
        RuleNode::Media(group) => format!("{} {}", RuleKind::Media, group.criterion),
        RuleNode::Supports(group) => format!("{} {}", RuleKind::Supports, group.criterion),
        RuleNode::FontFace(_) => RuleKind::FontFace.to_string(),
        RuleNode::Comment(_) => return None,
        RuleNode::AtRule(at_rule) if node.is_rule_group() => {
            format!("{} {}", at_rule.name, at_rule.prelude)
        }
        RuleNode::AtRule(_) => return Some(RuleKey::new(DEFAULT_RULE_KEY)),
    };

    let separator = if with_separator { RULE_SEPARATOR } else { "" };
    Some(RuleKey(format!("{group_prefix}{separator}{rule_part}")))
}

/// Id of a grouping node within a prefix chain: type name and criterion,
/// concatenated without a separator (`media(min-width:600px)`).
pub fn group_id(node: &RuleNode) -> String {
    format!("{}{}", node.type_name(), node.criterion().unwrap_or_default())
}

/// Extend `prefix` with the id of the group `node`.
pub fn extend_group_prefix(prefix: &str, node: &RuleNode) -> String {
    if prefix.is_empty() {
        group_id(node)
    } else {
        format!("{prefix}{GROUP_SEPARATOR}{}", group_id(node))
    }
}

/// Media query with one leading `all and ` removed.
pub fn canonical_media_query(query: &str) -> String {
    query.strip_prefix("all and ").unwrap_or(query).to_string()
}

/// Whether two media queries select the same media.
///
/// Queries that differ only by a leading `all and ` on either side are equal.
pub fn media_queries_match(a: &str, b: &str) -> bool {
    canonical_media_query(a) == canonical_media_query(b)
}

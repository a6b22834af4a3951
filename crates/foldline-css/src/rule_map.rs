//! Rule maps: deduplicated rule bodies grouped by identity.
//!
//! A [`RuleMap`] is the fold target for stylesheets coming back from page
//! evaluations. Merging is order-independent and idempotent: every rule body
//! is stored under its key together with a [`ContentHash`], and a body whose
//! hash is already present under that key is not stored again.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::classify::{self, RuleKey};
use crate::rules::{GroupRule, RuleNode, Stylesheet};

/// Structural hash of a rule with its source positions removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(u64);

impl ContentHash {
    /// Hash a node. Positions are ignored.
    pub fn of(node: &RuleNode) -> Self {
        let mut hasher = DefaultHasher::new();
        node.without_position().hash(&mut hasher);
        Self(hasher.finish())
    }

    /// The raw hash value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Key of a rule map bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleMapKey {
    /// All rules of every `@media` block with an equivalent query.
    Media(String),
    /// Any other top-level rule.
    Rule(RuleKey),
}

impl fmt::Display for RuleMapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleMapKey::Media(criterion) => write!(f, "@media {criterion}"),
            RuleMapKey::Rule(key) => write!(f, "{key}"),
        }
    }
}

/// A stored rule body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleEntry {
    /// Content hash of `rule`.
    pub hash: ContentHash,
    /// Position-stripped rule.
    pub rule: RuleNode,
}

impl RuleEntry {
    fn new(rule: &RuleNode) -> Self {
        let rule = rule.without_position();
        Self {
            hash: ContentHash::of(&rule),
            rule,
        }
    }

    /// Whether this entry can be printed.
    ///
    /// Rules carrying a declaration block must have at least one declaration.
    pub fn is_emittable(&self) -> bool {
        self.rule
            .declarations()
            .is_none_or(|declarations| !declarations.is_empty())
    }
}

/// What [`RuleMap::assemble`] does with an entry that cannot be printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InvalidEntryPolicy {
    /// Leave out the entry and continue.
    #[default]
    Skip,
    /// Stop at the first bucket whose leading entry is invalid and drop it and
    /// every bucket after it.
    Truncate,
}

/// Ordered map from rule identity to deduplicated rule bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleMap {
    buckets: IndexMap<RuleMapKey, Vec<RuleEntry>>,
}

impl RuleMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from one stylesheet.
    pub fn from_stylesheet(sheet: &Stylesheet) -> Self {
        let mut map = Self::new();
        map.merge(sheet);
        map
    }

    /// Fold the top-level rules of `sheet` into this map.
    ///
    /// Comments are skipped. Children of `@media` blocks are pooled per
    /// equivalent media query; every other rule is stored under its key.
    pub fn merge(&mut self, sheet: &Stylesheet) {
        let mut added = 0usize;

        for node in sheet.iter() {
            match node {
                RuleNode::Comment(_) => {}
                RuleNode::Media(group) => {
                    let key = Self::media_key(&group.criterion);
                    for child in group.rules.iter().filter(|child| !child.is_comment()) {
                        added += usize::from(self.insert(key.clone(), child));
                    }
                }
                _ => {
                    if let Some(key) = classify::rule_key(node, "", false) {
                        if key.is_default() {
                            tracing::debug!(
                                target: "foldline_css::rule_map",
                                rule_type = node.type_name(),
                                "unclassified rule stored under the default key"
                            );
                        }
                        added += usize::from(self.insert(RuleMapKey::Rule(key), node));
                    }
                }
            }
        }

        tracing::trace!(
            target: "foldline_css::rule_map",
            added,
            buckets = self.buckets.len(),
            "merged stylesheet"
        );
    }

    /// Insert a rule unless an identical body is already stored under `key`.
    ///
    /// Returns `true` if the rule was added.
    pub fn insert(&mut self, key: RuleMapKey, rule: &RuleNode) -> bool {
        let entry = RuleEntry::new(rule);
        let bucket = self.buckets.entry(key).or_default();

        if bucket.iter().any(|existing| existing.hash == entry.hash) {
            return false;
        }
        bucket.push(entry);
        true
    }

    /// Bucket key for a media query. Equivalent queries share one bucket.
    fn media_key(criterion: &str) -> RuleMapKey {
        RuleMapKey::Media(classify::canonical_media_query(criterion))
    }

    /// Entries stored under a key.
    pub fn get(&self, key: &RuleMapKey) -> Option<&[RuleEntry]> {
        self.buckets.get(key).map(Vec::as_slice)
    }

    /// Whether a key is present.
    pub fn contains_key(&self, key: &RuleMapKey) -> bool {
        self.buckets.contains_key(key)
    }

    /// Iterate buckets in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&RuleMapKey, &[RuleEntry])> {
        self.buckets.iter().map(|(key, entries)| (key, entries.as_slice()))
    }

    /// Iterate keys in first-seen order.
    pub fn keys(&self) -> impl Iterator<Item = &RuleMapKey> {
        self.buckets.keys()
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether the map has no buckets.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Remove every body that `other` stores under the same key with the same
    /// hash. Buckets left empty are removed.
    pub fn subtract(&mut self, other: &RuleMap) {
        for (key, other_entries) in &other.buckets {
            let Some(bucket) = self.buckets.get_mut(key) else {
                continue;
            };

            bucket.retain(|entry| !other_entries.iter().any(|o| o.hash == entry.hash));

            if bucket.is_empty() {
                self.buckets.shift_remove(key);
            }
        }
    }

    /// Rebuild a stylesheet in bucket order.
    ///
    /// Media buckets become one `@media` block holding all their rules; other
    /// buckets emit their bodies at top level.
    pub fn assemble(&self, policy: InvalidEntryPolicy) -> Stylesheet {
        let mut sheet = Stylesheet::new();

        for (key, entries) in &self.buckets {
            if policy == InvalidEntryPolicy::Truncate
                && entries.first().is_some_and(|first| !first.is_emittable())
            {
                tracing::debug!(
                    target: "foldline_css::rule_map",
                    key = %key,
                    "invalid entry, truncating assembly"
                );
                break;
            }

            let rules: Vec<RuleNode> = entries
                .iter()
                .filter(|entry| policy == InvalidEntryPolicy::Truncate || entry.is_emittable())
                .map(|entry| entry.rule.clone())
                .collect();

            match key {
                RuleMapKey::Media(_) if rules.is_empty() => {}
                RuleMapKey::Media(criterion) => {
                    sheet.push(RuleNode::Media(GroupRule::new(criterion.clone(), rules)));
                }
                RuleMapKey::Rule(_) => sheet.rules.extend(rules),
            }
        }

        sheet
    }

    /// Whether both maps hold the same bodies under the same keys, ignoring
    /// the order of keys and of entries.
    pub fn same_content(&self, other: &RuleMap) -> bool {
        let hashes = |entries: &[RuleEntry]| entries.iter().map(|e| e.hash).collect::<HashSet<_>>();

        self.len() == other.len()
            && self.buckets.iter().all(|(key, entries)| {
                other
                    .buckets
                    .get(key)
                    .is_some_and(|theirs| hashes(entries) == hashes(theirs))
            })
    }
}

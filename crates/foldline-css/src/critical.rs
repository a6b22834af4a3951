//! Critical selector map: the result of probing one page.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::classify::RuleKey;
use crate::rules::RuleKind;

/// Selectors confirmed critical for one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalEntry {
    /// Critical selectors in first-confirmed order, without duplicates.
    pub selectors: Vec<String>,
    /// Kind of the rule the selectors belong to.
    pub kind: RuleKind,
}

/// Mapping from rule key to the selectors confirmed critical under it.
///
/// Serializes as a list of `(key, entry)` pairs, which is the transport
/// format between a page evaluation and the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "Vec<(RuleKey, CriticalEntry)>",
    into = "Vec<(RuleKey, CriticalEntry)>"
)]
pub struct CriticalSelectorMap {
    entries: IndexMap<RuleKey, CriticalEntry>,
}

impl CriticalSelectorMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `selector` as critical for `key`.
    ///
    /// Returns `false` if the selector was already recorded.
    pub fn insert(&mut self, key: RuleKey, selector: impl Into<String>, kind: RuleKind) -> bool {
        let selector = selector.into();
        let entry = self.entries.entry(key).or_insert_with(|| CriticalEntry {
            selectors: Vec::new(),
            kind,
        });

        if entry.selectors.contains(&selector) {
            return false;
        }
        entry.selectors.push(selector);
        true
    }

    /// Entry for a key.
    pub fn get(&self, key: &str) -> Option<&CriticalEntry> {
        self.entries.get(key)
    }

    /// Critical selectors for a key.
    pub fn selectors(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(|entry| entry.selectors.as_slice())
    }

    /// Whether the key has any critical selector.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Whether `selector` is critical under `key`.
    pub fn is_critical(&self, key: &str, selector: &str) -> bool {
        self.selectors(key)
            .is_some_and(|selectors| selectors.iter().any(|s| s == selector))
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&RuleKey, &CriticalEntry)> {
        self.entries.iter()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no selector was confirmed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<(RuleKey, CriticalEntry)>> for CriticalSelectorMap {
    fn from(pairs: Vec<(RuleKey, CriticalEntry)>) -> Self {
        let mut map = Self::new();
        for (key, entry) in pairs {
            for selector in entry.selectors {
                map.insert(key.clone(), selector, entry.kind);
            }
        }
        map
    }
}

impl From<CriticalSelectorMap> for Vec<(RuleKey, CriticalEntry)> {
    fn from(map: CriticalSelectorMap) -> Self {
        map.entries.into_iter().collect()
    }
}

impl FromIterator<(RuleKey, String, RuleKind)> for CriticalSelectorMap {
    fn from_iter<T: IntoIterator<Item = (RuleKey, String, RuleKind)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (key, selector, kind) in iter {
            map.insert(key, selector, kind);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_deduplicates_selectors() {
        let mut map = CriticalSelectorMap::new();

        assert!(map.insert(RuleKey::new(".a,.b"), ".a", RuleKind::Rule));
        assert!(map.insert(RuleKey::new(".a,.b"), ".b", RuleKind::Rule));
        assert!(!map.insert(RuleKey::new(".a,.b"), ".a", RuleKind::Rule));

        assert_eq!(map.len(), 1);
        assert_eq!(map.selectors(".a,.b").unwrap(), &[".a", ".b"]);
        assert!(map.is_critical(".a,.b", ".b"));
        assert!(!map.is_critical(".a,.b", ".c"));
        assert!(!map.contains_key(".a"));
    }

    #[test]
    fn serializes_as_pairs() {
        let map: CriticalSelectorMap = [
            (RuleKey::new(".a"), ".a".to_string(), RuleKind::Rule),
            (RuleKey::new("mediaprint.b"), ".b".to_string(), RuleKind::Rule),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                [".a", { "selectors": [".a"], "kind": "rule" }],
                ["mediaprint.b", { "selectors": [".b"], "kind": "rule" }]
            ])
        );

        let back: CriticalSelectorMap = serde_json::from_value(json).unwrap();
        assert_eq!(back, map);
    }
}

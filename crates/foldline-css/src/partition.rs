//! Splitting a stylesheet into its critical and remaining parts.
//!
//! [`partition`] walks the source tree twice. The critical pass keeps only
//! the selectors a page evaluation confirmed and records what it kept per
//! rule key; the remaining pass then subtracts exactly those selectors from
//! an independent copy. A selector under a given key therefore ends up in
//! one output or the other, never both.

use indexmap::IndexMap;

use crate::classify::{self, CRITICAL_KINDS, RuleKey};
use crate::critical::CriticalSelectorMap;
use crate::rules::{RuleKind, RuleNode, Stylesheet};

/// Options for [`partition`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionOptions {
    /// Consider top-level `@keyframes` for the critical stylesheet.
    pub retain_keyframes: bool,
}

impl PartitionOptions {
    /// Set whether top-level keyframes are kept in the critical stylesheet.
    pub fn retain_keyframes(mut self, retain: bool) -> Self {
        self.retain_keyframes = retain;
        self
    }
}

/// Output of [`partition`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    /// Rules needed above the fold.
    pub critical: Stylesheet,
    /// Everything else.
    pub rest: Stylesheet,
}

/// Selectors kept by the critical pass, per rule key.
type Confirmed = IndexMap<RuleKey, Vec<String>>;

/// Split `source` using the selectors in `critical`.
///
/// The source is not modified; both outputs are fresh trees.
pub fn partition(
    source: &Stylesheet,
    critical: &CriticalSelectorMap,
    options: &PartitionOptions,
) -> Partition {
    let mut confirmed = Confirmed::new();

    let candidates: Vec<&RuleNode> = source
        .iter()
        .filter(|rule| {
            let kind = rule.kind();
            CRITICAL_KINDS.contains(&kind) || (options.retain_keyframes && kind == RuleKind::Keyframes)
        })
        .collect();

    let critical_rules = critical_pass(&candidates, critical, &mut confirmed, "");
    let all: Vec<&RuleNode> = source.iter().collect();
    let rest_rules = rest_pass(&all, &confirmed, "");

    tracing::debug!(
        target: "foldline_css::partition",
        critical = critical_rules.len(),
        rest = rest_rules.len(),
        confirmed_keys = confirmed.len(),
        "partitioned stylesheet"
    );

    Partition {
        critical: Stylesheet::from_rules(critical_rules),
        rest: Stylesheet::from_rules(rest_rules),
    }
}

fn critical_pass(
    rules: &[&RuleNode],
    critical: &CriticalSelectorMap,
    confirmed: &mut Confirmed,
    prefix: &str,
) -> Vec<RuleNode> {
    let mut kept = Vec::with_capacity(rules.len());

    for &rule in rules {
        if rule.is_rule_group() {
            let group_prefix = classify::extend_group_prefix(prefix, rule);
            let children: Vec<&RuleNode> = rule.children().unwrap_or_default().iter().collect();
            let survivors = critical_pass(&children, critical, confirmed, &group_prefix);
            if !survivors.is_empty() {
                kept.push(rule.with_children(survivors));
            }
            continue;
        }

        let Some(key) = classify::rule_key(rule, prefix, false) else {
            continue;
        };

        match rule.selectors() {
            Some(selectors) => {
                let critical_selectors: Vec<String> = selectors
                    .iter()
                    .filter(|selector| critical.is_critical(key.as_str(), selector))
                    .cloned()
                    .collect();
                confirmed.insert(key, critical_selectors.clone());

                if !critical_selectors.is_empty() {
                    kept.push(rule.with_selectors(critical_selectors));
                }
            }
            None => {
                confirmed.insert(key, Vec::new());
                kept.push(rule.clone());
            }
        }
    }

    kept
}

fn rest_pass(rules: &[&RuleNode], confirmed: &Confirmed, prefix: &str) -> Vec<RuleNode> {
    let mut kept = Vec::with_capacity(rules.len());

    for &rule in rules {
        if rule.is_rule_group() {
            let group_prefix = classify::extend_group_prefix(prefix, rule);
            let children: Vec<&RuleNode> = rule.children().unwrap_or_default().iter().collect();
            let survivors = rest_pass(&children, confirmed, &group_prefix);
            if !survivors.is_empty() {
                kept.push(rule.with_children(survivors));
            }
            continue;
        }

        let Some(key) = classify::rule_key(rule, prefix, false) else {
            continue;
        };

        match (rule.selectors(), confirmed.get(&key)) {
            (Some(selectors), claimed) => {
                let remaining: Vec<String> = selectors
                    .iter()
                    .filter(|selector| claimed.is_none_or(|claimed| !claimed.contains(selector)))
                    .cloned()
                    .collect();
                if !remaining.is_empty() {
                    kept.push(rule.with_selectors(remaining));
                }
            }
            (None, _) => kept.push(rule.clone()),
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::PrintOptions;
    use std::collections::HashSet;

    fn sheet(css: &str) -> Stylesheet {
        Stylesheet::from_css(css).unwrap()
    }

    fn critical_map(entries: &[(&str, &str)]) -> CriticalSelectorMap {
        entries
            .iter()
            .map(|(key, selector)| (RuleKey::new(*key), selector.to_string(), RuleKind::Rule))
            .collect()
    }

    fn compressed(sheet: &Stylesheet) -> String {
        sheet.to_css(&PrintOptions::compressed())
    }

    /// Every (group prefix, declarations, selector) slot of a tree.
    fn slots(rules: &[RuleNode], prefix: &str, out: &mut HashSet<(String, String, String)>) {
        for rule in rules {
            if rule.is_rule_group() {
                let group_prefix = classify::extend_group_prefix(prefix, rule);
                slots(rule.children().unwrap_or_default(), &group_prefix, out);
            } else if let (Some(selectors), Some(declarations)) = (rule.selectors(), rule.declarations()) {
                let body = format!("{declarations:?}");
                for selector in selectors {
                    out.insert((prefix.to_string(), body.clone(), selector.clone()));
                }
            }
        }
    }

    #[test]
    fn splits_top_level_rules() {
        let source = sheet(".a{color:red} .b{color:blue}");
        let result = partition(&source, &critical_map(&[(".a", ".a")]), &PartitionOptions::default());

        assert_eq!(compressed(&result.critical), ".a{color:red}");
        assert_eq!(compressed(&result.rest), ".b{color:blue}");
    }

    #[test]
    fn media_rule_moves_to_critical_and_empty_groups_are_pruned() {
        let source = sheet("@media (min-width:600px){.c{color:green}}");
        let map = critical_map(&[("media(min-width:600px).c", ".c")]);
        let result = partition(&source, &map, &PartitionOptions::default());

        assert_eq!(compressed(&result.critical), "@media (min-width:600px){.c{color:green}}");
        assert!(result.rest.is_empty());
    }

    #[test]
    fn selector_lists_are_split_between_outputs() {
        let source = sheet("h1, .a, .b { margin: 0 }");
        let map = critical_map(&[("h1,.a,.b", "h1"), ("h1,.a,.b", ".b")]);
        let result = partition(&source, &map, &PartitionOptions::default());

        assert_eq!(compressed(&result.critical), "h1,.b{margin:0}");
        assert_eq!(compressed(&result.rest), ".a{margin:0}");
    }

    #[test]
    fn nested_groups_use_the_prefix_chain() {
        let source = sheet(
            ".a{color:red} @media print { .a{color:black} @supports (display:grid) { .a{display:grid} } }",
        );
        let map = critical_map(&[("mediaprint-##-supports(display:grid).a", ".a")]);
        let result = partition(&source, &map, &PartitionOptions::default());

        assert_eq!(
            compressed(&result.critical),
            "@media print{@supports (display:grid){.a{display:grid}}}"
        );
        assert_eq!(compressed(&result.rest), ".a{color:red}@media print{.a{color:black}}");
    }

    #[test]
    fn keyframes_are_excluded_unless_retained() {
        let source = sheet("@keyframes spin { from { opacity: 0 } } .a { color: red }");
        let map = critical_map(&[(".a", ".a")]);

        let dropped = partition(&source, &map, &PartitionOptions::default());
        assert_eq!(compressed(&dropped.critical), ".a{color:red}");
        assert_eq!(compressed(&dropped.rest), "@keyframes spin{from{opacity:0}}");

        let retained = partition(&source, &map, &PartitionOptions::default().retain_keyframes(true));
        assert_eq!(compressed(&retained.critical), "@keyframes spin{from{opacity:0}}.a{color:red}");
    }

    #[test]
    fn selectorless_allowed_kinds_are_kept() {
        let source = sheet("@charset \"UTF-8\"; @font-face { font-family: x } @import url(a.css); .a { color: red }");
        let result = partition(&source, &CriticalSelectorMap::new(), &PartitionOptions::default());

        assert_eq!(compressed(&result.critical), "@charset \"UTF-8\";@font-face{font-family:x}");
        // Selector-less rules are claimed without selectors, so they stay in the rest too.
        assert_eq!(
            compressed(&result.rest),
            "@charset \"UTF-8\";@font-face{font-family:x}@import url(a.css);.a{color:red}"
        );
    }

    #[test]
    fn comments_are_dropped() {
        let source = sheet("/* top */ .a { color: red } @media print { /* inner */ .b { color: blue } }");
        let result = partition(&source, &critical_map(&[(".a", ".a")]), &PartitionOptions::default());

        assert!(result.critical.iter().all(|r| !r.is_comment()));
        assert_eq!(result.rest.len(), 1);
        assert_eq!(result.rest.rules[0].children().unwrap().len(), 1);
    }

    #[test]
    fn source_is_left_untouched() {
        let source = sheet(".a, .b { color: red } @media print { .c { color: blue } }");
        let before = source.clone();
        let map = critical_map(&[(".a,.b", ".a"), ("mediaprint.c", ".c")]);

        let _ = partition(&source, &map, &PartitionOptions::default());
        assert_eq!(source, before);
    }

    #[test]
    fn outputs_are_mutually_exclusive_and_never_empty() {
        let source = sheet(
            ".a, .b, .c { color: red }
             .a { margin: 0 }
             @media (max-width: 400px) { .a, .d { color: blue } .e { color: green } }
             @supports (display: grid) { @media print { .b, .f { display: grid } } }",
        );
        let map = critical_map(&[
            (".a,.b,.c", ".b"),
            (".a", ".a"),
            ("media(max-width: 400px).a,.d", ".d"),
            ("media(max-width: 400px).e", ".e"),
            ("supports(display: grid)-##-mediaprint.b,.f", ".f"),
            // Key that exists nowhere in the source.
            ("mediascreen.a", ".a"),
        ]);

        let result = partition(&source, &map, &PartitionOptions::default());

        let mut critical_slots = HashSet::new();
        slots(&result.critical.rules, "", &mut critical_slots);
        let mut rest_slots = HashSet::new();
        slots(&result.rest.rules, "", &mut rest_slots);
        let mut source_slots = HashSet::new();
        slots(&source.rules, "", &mut source_slots);

        assert!(critical_slots.is_disjoint(&rest_slots));
        let union: HashSet<_> = critical_slots.union(&rest_slots).cloned().collect();
        assert_eq!(union, source_slots);

        for output in [&result.critical, &result.rest] {
            let css = compressed(output);
            let reparsed = sheet(&css);
            assert_eq!(reparsed.len(), output.len());
            assert!(!css.contains("{}"));
        }
    }

    #[test]
    fn same_key_selectors_never_in_both_outputs() {
        let source = sheet(".a, .b { color: red } @media print { .a, .b { color: blue } }");
        let map = critical_map(&[(".a,.b", ".a"), ("mediaprint.a,.b", ".b")]);
        let result = partition(&source, &map, &PartitionOptions::default());

        assert_eq!(compressed(&result.critical), ".a{color:red}@media print{.b{color:blue}}");
        assert_eq!(compressed(&result.rest), ".b{color:red}@media print{.a{color:blue}}");
    }
}

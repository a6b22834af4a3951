//! Stylesheet model and critical CSS partitioning for foldline.
//!
//! This crate holds everything that works on CSS without a rendered page:
//!
//! - **Rule model**: a typed tree of style rules, groups, and at-rules
//! - **Codec**: parse CSS text with `cssparser` and print it back
//! - **Classification**: canonical rule keys scoped by their group chain
//! - **Rule maps**: commutative, idempotent merging of many stylesheets
//! - **Partitioning**: split a stylesheet into critical and remaining parts
//! - **Selectors**: parse and match selectors against any element tree
//!
//! # Example
//!
//! ```ignore
//! use foldline_css::prelude::*;
//!
//! let source = Stylesheet::from_css(".a { color: red } .b { color: blue }")?;
//!
//! let mut critical = CriticalSelectorMap::new();
//! critical.insert(RuleKey::new(".a"), ".a", RuleKind::Rule);
//!
//! let Partition { critical, rest } = partition(&source, &critical, &PartitionOptions::default());
//! assert_eq!(critical.to_css(&PrintOptions::compressed()), ".a{color:red}");
//! assert_eq!(rest.to_css(&PrintOptions::compressed()), ".b{color:blue}");
//! ```

pub mod classify;
pub mod critical;
pub mod parser;
pub mod partition;
pub mod rule_map;
pub mod rules;
pub mod selector;

mod error;

pub use error::{Error, Result};

/// Prelude module with commonly used types.
pub mod prelude {
    pub use crate::classify::{RuleKey, media_queries_match, rule_key};
    pub use crate::critical::{CriticalEntry, CriticalSelectorMap};
    pub use crate::parser::{CssCodec, CssParserCodec, PrintOptions, parse_stylesheet, stringify};
    pub use crate::partition::{Partition, PartitionOptions, partition};
    pub use crate::rule_map::{ContentHash, InvalidEntryPolicy, RuleMap, RuleMapKey};
    pub use crate::rules::{Declaration, GroupRule, RuleKind, RuleNode, StyleRule, Stylesheet};
    pub use crate::selector::{MatchElement, SelectorList, SelectorMatcher, parse_selector_list};
    pub use crate::{Error, Result};
}

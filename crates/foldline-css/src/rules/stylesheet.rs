//! Stylesheet root and loading.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::parser::{PrintOptions, stringify};
use crate::rules::RuleNode;
use crate::{Error, Result};

/// The root of a parsed stylesheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stylesheet {
    /// Top-level rules in source order.
    pub rules: Vec<RuleNode>,
}

impl Stylesheet {
    /// Create an empty stylesheet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stylesheet from rules.
    pub fn from_rules(rules: Vec<RuleNode>) -> Self {
        Self { rules }
    }

    /// Parse a stylesheet from CSS text.
    pub fn from_css(css: &str) -> Result<Self> {
        crate::parser::parse_stylesheet(css)
    }

    /// Load a stylesheet from a CSS file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_css(&content)
    }

    /// Add a rule at the end.
    pub fn push(&mut self, rule: impl Into<RuleNode>) {
        self.rules.push(rule.into());
    }

    /// Get the number of top-level rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the stylesheet has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterate over top-level rules.
    pub fn iter(&self) -> impl Iterator<Item = &RuleNode> {
        self.rules.iter()
    }

    /// Print with the given options.
    pub fn to_css(&self, options: &PrintOptions) -> String {
        stringify(self, options)
    }
}

impl fmt::Display for Stylesheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&stringify(self, &PrintOptions::default()))
    }
}

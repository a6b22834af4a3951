//! Request interception.
//!
//! Pages consult a [`RequestBlocklist`] for every subresource request and
//! abort the ones it rejects.

use serde::{Deserialize, Serialize};

/// URL substrings blocked unless configured otherwise: maps, analytics, and ads.
pub const DEFAULT_BLOCKED_REQUESTS: &[&str] = &[
    "maps.gstatic.com",
    "maps.googleapis.com",
    "googletagmanager.com",
    "google-analytics.com",
    "google.",
    "googleadservices.com",
    "generaltracking.de",
    "bing.com",
    "doubleclick.net",
];

/// A denylist of URL substrings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestBlocklist {
    patterns: Vec<String>,
}

impl RequestBlocklist {
    /// Create a blocklist from URL substrings. Empty patterns are ignored.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(Into::into)
                .filter(|pattern: &String| !pattern.is_empty())
                .collect(),
        }
    }

    /// A blocklist that allows everything.
    pub fn allow_all() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Whether a request to `url` may proceed.
    pub fn allows(&self, url: &str) -> bool {
        !self.blocks(url)
    }

    /// Whether a request to `url` is aborted.
    pub fn blocks(&self, url: &str) -> bool {
        self.patterns.iter().any(|pattern| url.contains(pattern.as_str()))
    }

    /// The configured substrings.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for RequestBlocklist {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCKED_REQUESTS.iter().copied())
    }
}

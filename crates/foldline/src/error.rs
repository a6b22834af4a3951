//! Error types for critical CSS runs.
//!
//! [`Error`] aborts a whole run. [`PageError`] describes why a single URL
//! could not be evaluated; page errors are collected and returned next to the
//! result instead of being propagated.

use std::path::PathBuf;

use foldline_render::RenderError;
use thiserror::Error;

use crate::orchestrator::TaskState;

/// Result type for critical CSS runs.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that prevent a run from producing any result.
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration is invalid.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The source CSS could not be read.
    #[error("could not read source CSS from '{path}': {message}")]
    CssSource { path: PathBuf, message: String },

    /// The source CSS could not be parsed.
    #[error("could not parse source CSS: {0}")]
    CssParse(#[from] foldline_css::Error),

    /// The browser session failed outside of a page task.
    #[error("browser error: {0}")]
    Browser(#[from] RenderError),

    /// No page produced a result.
    #[error("all {} page evaluations failed", errors.len())]
    AllTasksFailed { errors: Vec<PageError> },
}

impl Error {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a source CSS error.
    pub fn css_source(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CssSource {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Why evaluating one URL failed.
#[derive(Error, Debug)]
pub enum PageError {
    /// No page could be opened.
    #[error("could not open a page for '{url}' after {attempts} attempts: {source}")]
    Acquisition {
        url: String,
        attempts: usize,
        #[source]
        source: RenderError,
    },

    /// Applying cache, script, request, or device settings failed.
    #[error("could not configure page for '{url}': {source}")]
    Configure {
        url: String,
        #[source]
        source: RenderError,
    },

    /// The page could not be loaded.
    #[error("could not load '{url}': {source}")]
    Navigation {
        url: String,
        #[source]
        source: RenderError,
    },

    /// The screenshot could not be taken or saved.
    #[error("could not take screenshot of '{url}': {source}")]
    Screenshot {
        url: String,
        #[source]
        source: RenderError,
    },

    /// Evaluating the stylesheet in the page failed.
    #[error("could not evaluate stylesheet on '{url}': {source}")]
    Probe {
        url: String,
        #[source]
        source: RenderError,
    },

    /// The page did not close after a successful evaluation.
    #[error("could not close page for '{url}': {source}")]
    Close {
        url: String,
        #[source]
        source: RenderError,
    },
}

impl PageError {
    /// The URL whose evaluation failed.
    pub fn url(&self) -> &str {
        match self {
            Self::Acquisition { url, .. }
            | Self::Configure { url, .. }
            | Self::Navigation { url, .. }
            | Self::Screenshot { url, .. }
            | Self::Probe { url, .. }
            | Self::Close { url, .. } => url,
        }
    }

    /// The last state the task reached before failing.
    pub fn state(&self) -> TaskState {
        match self {
            Self::Acquisition { .. } => TaskState::Pending,
            Self::Configure { .. } => TaskState::PageAcquired,
            Self::Navigation { .. } => TaskState::PageConfigured,
            Self::Screenshot { .. } | Self::Probe { .. } => TaskState::Navigated,
            Self::Close { .. } => TaskState::Probed,
        }
    }

    /// The underlying rendering error.
    pub fn render_error(&self) -> &RenderError {
        match self {
            Self::Acquisition { source, .. }
            | Self::Configure { source, .. }
            | Self::Navigation { source, .. }
            | Self::Screenshot { source, .. }
            | Self::Probe { source, .. }
            | Self::Close { source, .. } => source,
        }
    }
}

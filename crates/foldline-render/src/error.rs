//! Error types for the render crate.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while driving a rendering engine.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The browser session has been closed.
    #[error("browser session is closed")]
    SessionClosed,

    /// The page has been closed.
    #[error("page is closed")]
    PageClosed,

    /// The session could not open a new page.
    #[error("failed to open page: {0}")]
    PageCreation(String),

    /// Navigation to a URL or content failed.
    #[error("navigation to '{url}' failed: {message}")]
    Navigation { url: String, message: String },

    /// An operation did not complete in time.
    #[error("{operation} timed out after {}ms", timeout.as_millis())]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// The page has no document to inspect.
    #[error("page has no document")]
    NoDocument,

    /// Evaluating inside the page failed.
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// Capturing or saving a screenshot failed.
    #[error("screenshot failed: {0}")]
    Screenshot(String),

    /// File I/O error.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A keep/remove selector pattern could not be compiled.
    #[error("invalid selector pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// A selector could not be used as a document query.
    #[error(transparent)]
    InvalidSelector(#[from] foldline_css::Error),
}

impl RenderError {
    /// Create a navigation error.
    pub fn navigation(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;

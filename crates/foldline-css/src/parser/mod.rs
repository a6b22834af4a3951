//! CSS parsing and printing.
//!
//! [`parse_stylesheet`] and [`stringify`] are the two halves of the codec.
//! Callers that want to swap the implementation (for example to feed
//! pre-parsed trees in tests) go through the [`CssCodec`] trait instead.

mod css_parser;
mod printer;

pub use css_parser::parse_stylesheet;
pub use printer::{PrintOptions, stringify};

use crate::Result;
use crate::rules::Stylesheet;

/// Parses CSS text into a stylesheet tree and prints trees back to CSS.
pub trait CssCodec: Send + Sync {
    /// Parse CSS text.
    fn parse(&self, css: &str) -> Result<Stylesheet>;

    /// Print a stylesheet.
    fn stringify(&self, sheet: &Stylesheet, options: &PrintOptions) -> String;
}

/// The default codec, backed by `cssparser`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssParserCodec;

impl CssCodec for CssParserCodec {
    fn parse(&self, css: &str) -> Result<Stylesheet> {
        parse_stylesheet(css)
    }

    fn stringify(&self, sheet: &Stylesheet, options: &PrintOptions) -> String {
        stringify(sheet, options)
    }
}

//! CSS selector types, parsing, and matching.

mod matcher;
mod parser;
mod types;

pub use matcher::{MatchElement, SelectorMatcher};
pub use parser::parse_selector_list;
pub use types::*;

//! Stylesheet tree: rule nodes and the stylesheet root.

mod node;
mod stylesheet;

pub use node::{
    AtRule, AtRuleBody, CharsetRule, CommentNode, Declaration, FontFaceRule, GroupRule,
    KeyframeRule, KeyframesRule, Position, RuleKind, RuleNode, StyleRule,
};
pub use stylesheet::Stylesheet;

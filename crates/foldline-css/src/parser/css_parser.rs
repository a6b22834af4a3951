//! CSS syntax parser using the `cssparser` crate.
//!
//! This module turns stylesheet text into a [`Stylesheet`] tree. Selector
//! lists, media queries, and declaration values are kept as the source text
//! (trimmed), so that rule keys derived from them are stable and printing a
//! parsed tree reproduces equivalent CSS.

use cssparser::{Delimiter, Delimiters, ParseError as CssParseError, Parser, ParserInput, Token};

use crate::rules::{
    AtRule, AtRuleBody, CharsetRule, CommentNode, Declaration, FontFaceRule, GroupRule,
    KeyframeRule, KeyframesRule, Position, RuleNode, StyleRule, Stylesheet,
};
use crate::{Error, Result};

/// At-rules whose block holds nested rules rather than declarations.
const RULE_BLOCK_AT_RULES: &[&str] = &[
    "document",
    "-moz-document",
    "layer",
    "container",
    "scope",
    "starting-style",
];

/// Parse a CSS stylesheet string into a rule tree.
///
/// # Error Recovery
///
/// Malformed rules do not fail the whole parse. The parser logs each error via
/// `tracing::warn!`, skips the offending rule, and continues. An error is
/// returned only when the input produced no rules at all but did contain
/// errors, since there is nothing usable to work with in that case.
///
/// # Example
///
/// ```ignore
/// let sheet = parse_stylesheet(".a { color: red } @media print { .b { color: blue } }")?;
/// assert_eq!(sheet.len(), 2);
/// ```
pub fn parse_stylesheet(css: &str) -> Result<Stylesheet> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut sheet_parser = SheetParser::default();

    let rules = sheet_parser.rule_list(&mut parser);

    if rules.is_empty()
        && let Some(first) = sheet_parser.errors.into_iter().next()
    {
        return Err(first);
    }

    Ok(Stylesheet { rules })
}

#[derive(Default)]
struct SheetParser {
    errors: Vec<Error>,
}

impl SheetParser {
    fn record(&mut self, error: Error) {
        tracing::warn!(target: "foldline_css::parser", "CSS parse error: {}", error);
        self.errors.push(error);
    }

    /// Parse a list of rules until the parser is exhausted.
    fn rule_list<'i>(&mut self, parser: &mut Parser<'i, '_>) -> Vec<RuleNode> {
        let mut rules = vec![];

        loop {
            let position = position_of(parser);
            let state = parser.state();

            let token = match parser.next_including_whitespace_and_comments() {
                Ok(t) => t.clone(),
                Err(_) => break,
            };

            match token {
                Token::WhiteSpace(_) | Token::CDO | Token::CDC | Token::Semicolon => {}
                Token::Comment(text) => rules.push(RuleNode::Comment(CommentNode {
                    text: text.to_string(),
                    position: Some(position),
                })),
                Token::AtKeyword(name) => match self.at_rule(parser, &name, position) {
                    Ok(rule) => rules.push(rule),
                    Err(e) => self.record(e),
                },
                _ => {
                    parser.reset(&state);
                    match self.qualified_rule(parser, position) {
                        Ok(rule) => rules.push(rule),
                        Err(e) => self.record(e),
                    }
                }
            }
        }

        rules
    }

    /// Parse a style rule: selectors { declarations }
    fn qualified_rule<'i>(
        &mut self,
        parser: &mut Parser<'i, '_>,
        position: Position,
    ) -> Result<RuleNode> {
        let prelude = raw_until(parser, Delimiter::CurlyBracketBlock);

        match parser.next() {
            Ok(Token::CurlyBracketBlock) => {}
            _ => {
                return Err(Error::parse(
                    format!("Expected '{{' after selector '{}'", prelude),
                    position.line,
                    position.column,
                ));
            }
        }

        let declarations = parse_block(parser, parse_declarations, position)?;

        let selectors = split_list(&prelude);
        if selectors.is_empty() {
            return Err(Error::parse("Missing selector", position.line, position.column));
        }

        Ok(RuleNode::Rule(StyleRule {
            selectors,
            declarations,
            position: Some(position),
        }))
    }

    /// Parse an at-rule whose keyword has just been consumed.
    fn at_rule<'i>(
        &mut self,
        parser: &mut Parser<'i, '_>,
        name: &str,
        position: Position,
    ) -> Result<RuleNode> {
        let prelude = raw_until(parser, Delimiter::CurlyBracketBlock | Delimiter::Semicolon);
        let has_block = matches!(parser.next(), Ok(Token::CurlyBracketBlock));
        let lower = name.to_ascii_lowercase();

        let node = match lower.as_str() {
            "charset" => RuleNode::Charset(CharsetRule {
                charset: prelude,
                position: Some(position),
            }),

            "media" | "supports" => {
                if !has_block {
                    return Err(Error::parse(
                        format!("Expected '{{' after @{} {}", name, prelude),
                        position.line,
                        position.column,
                    ));
                }
                let rules = self.nested_rule_list(parser, position)?;
                let group = GroupRule {
                    criterion: prelude,
                    rules,
                    position: Some(position),
                };
                if lower == "media" {
                    RuleNode::Media(group)
                } else {
                    RuleNode::Supports(group)
                }
            }

            keyframes if keyframes.ends_with("keyframes") && has_block => {
                let vendor = name
                    .strip_suffix("keyframes")
                    .filter(|prefix| !prefix.is_empty())
                    .map(str::to_string);
                let keyframes = parse_block(parser, parse_keyframe_list, position)?;
                RuleNode::Keyframes(KeyframesRule {
                    vendor,
                    name: prelude,
                    keyframes,
                    position: Some(position),
                })
            }

            "font-face" if has_block => RuleNode::FontFace(FontFaceRule {
                declarations: parse_block(parser, parse_declarations, position)?,
                position: Some(position),
            }),

            _ => {
                let body = if !has_block {
                    AtRuleBody::Statement
                } else if RULE_BLOCK_AT_RULES.contains(&lower.as_str()) {
                    AtRuleBody::Rules(self.nested_rule_list(parser, position)?)
                } else {
                    AtRuleBody::Declarations(parse_block(parser, parse_declarations, position)?)
                };
                RuleNode::AtRule(AtRule {
                    name: name.to_string(),
                    prelude,
                    body,
                    position: Some(position),
                })
            }
        };

        Ok(node)
    }

    fn nested_rule_list<'i>(
        &mut self,
        parser: &mut Parser<'i, '_>,
        position: Position,
    ) -> Result<Vec<RuleNode>> {
        parser
            .parse_nested_block(|block| Ok::<_, CssParseError<'i, ()>>(self.rule_list(block)))
            .map_err(|e| block_error(e, position))
    }
}

/// Run a block parser over the block whose opening token was just consumed.
fn parse_block<'i, T>(
    parser: &mut Parser<'i, '_>,
    parse: impl for<'tt> FnOnce(&mut Parser<'i, 'tt>) -> T,
    position: Position,
) -> Result<T> {
    parser
        .parse_nested_block(|block| Ok::<_, CssParseError<'i, ()>>(parse(block)))
        .map_err(|e| block_error(e, position))
}

fn block_error(error: CssParseError<'_, ()>, position: Position) -> Error {
    Error::parse(
        format!("Failed to parse block: {:?}", error.kind),
        position.line,
        position.column,
    )
}

fn position_of(parser: &Parser<'_, '_>) -> Position {
    let location = parser.current_source_location();
    Position::new(location.line + 1, location.column)
}

/// Consume tokens up to (not including) one of `delimiters` and return the
/// trimmed source text they span.
fn raw_until<'i>(parser: &mut Parser<'i, '_>, delimiters: Delimiters) -> String {
    parser
        .parse_until_before(delimiters, |p| {
            let start = p.position();
            while p.next_including_whitespace_and_comments().is_ok() {}
            Ok::<_, CssParseError<'i, ()>>(p.slice_from(start).trim().to_string())
        })
        .unwrap_or_default()
}

/// Parse CSS declarations.
fn parse_declarations<'i>(parser: &mut Parser<'i, '_>) -> Vec<Declaration> {
    let mut declarations = vec![];

    loop {
        parser.skip_whitespace();

        if parser.is_exhausted() {
            break;
        }

        let result = parser.parse_until_after(Delimiter::Semicolon, |p| {
            let property = p.expect_ident()?.to_string();
            p.expect_colon()?;
            p.skip_whitespace();

            let start = p.position();
            while p.next_including_whitespace_and_comments().is_ok() {}
            let value = p.slice_from(start).trim().to_string();

            if value.is_empty() && !property.starts_with("--") {
                return Err(p.new_custom_error(()));
            }
            Ok::<_, CssParseError<'i, ()>>(Declaration { property, value })
        });

        match result {
            Ok(declaration) => declarations.push(declaration),
            Err(e) => {
                tracing::warn!(target: "foldline_css::parser", "Skipping invalid declaration: {:?}", e.kind);
            }
        }
    }

    declarations
}

/// Parse the body of an `@keyframes` block.
fn parse_keyframe_list<'i>(parser: &mut Parser<'i, '_>) -> Vec<RuleNode> {
    let mut keyframes = vec![];

    loop {
        parser.skip_whitespace();

        if parser.is_exhausted() {
            break;
        }

        let position = position_of(parser);
        let prelude = raw_until(parser, Delimiter::CurlyBracketBlock);

        if !matches!(parser.next(), Ok(Token::CurlyBracketBlock)) {
            tracing::warn!(target: "foldline_css::parser", "Keyframe '{}' has no block", prelude);
            break;
        }

        let declarations = parser
            .parse_nested_block(|block| Ok::<_, CssParseError<'i, ()>>(parse_declarations(block)))
            .unwrap_or_default();

        keyframes.push(RuleNode::Keyframe(KeyframeRule {
            values: split_list(&prelude),
            declarations,
            position: Some(position),
        }));
    }

    keyframes
}

/// Split a comma separated list at top level, ignoring commas nested in
/// parentheses, brackets, or strings. Entries are trimmed, inner whitespace
/// runs collapse to one space, and empty entries are dropped.
fn split_list(text: &str) -> Vec<String> {
    let mut items = vec![];
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in text.chars() {
        if let Some(q) = quote {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => {
                quote = Some(c);
                current.push(c);
            }
            '(' | '[' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => items.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    items.push(current);

    items
        .iter()
        .map(|item| item.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|item| !item.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleKind;

    #[test]
    fn parse_simple_rule() {
        let sheet = parse_stylesheet(".a { color: red; }").unwrap();

        assert_eq!(sheet.len(), 1);
        let RuleNode::Rule(rule) = &sheet.rules[0] else {
            panic!("expected style rule");
        };
        assert_eq!(rule.selectors, vec![".a"]);
        assert_eq!(rule.declarations, vec![Declaration::new("color", "red")]);
        assert_eq!(rule.position, Some(Position::new(1, 1)));
    }

    #[test]
    fn parse_selector_list() {
        let sheet = parse_stylesheet("h1,\n  .title > span:not(.a, .b) , a[href=\"x,y\"] { margin: 0 }").unwrap();

        assert_eq!(
            sheet.rules[0].selectors().unwrap(),
            &["h1", ".title > span:not(.a, .b)", "a[href=\"x,y\"]"]
        );
    }

    #[test]
    fn parse_multiple_rules() {
        let css = r#"
            .a { color: red; }
            .b { color: blue; background: url("x.png") no-repeat !important }
        "#;
        let sheet = parse_stylesheet(css).unwrap();

        assert_eq!(sheet.len(), 2);
        assert_eq!(
            sheet.rules[1].declarations().unwrap()[1],
            Declaration::new("background", "url(\"x.png\") no-repeat !important")
        );
        assert_eq!(sheet.rules[1].position().map(|p| p.line), Some(3));
    }

    #[test]
    fn parse_media_and_supports() {
        let css = "@media (min-width:600px) { .c { color: green } @supports (display: grid) { .d { display: grid } } }";
        let sheet = parse_stylesheet(css).unwrap();

        let RuleNode::Media(media) = &sheet.rules[0] else {
            panic!("expected media rule");
        };
        assert_eq!(media.criterion, "(min-width:600px)");
        assert_eq!(media.rules.len(), 2);
        assert_eq!(media.rules[1].kind(), RuleKind::Supports);
        assert_eq!(media.rules[1].criterion(), Some("(display: grid)"));
    }

    #[test]
    fn parse_keyframes_font_face_and_charset() {
        let css = r#"@charset "UTF-8";
            @-webkit-keyframes spin { from { opacity: 0 } 50%, 75% { opacity: .5 } to { opacity: 1 } }
            @font-face { font-family: "Inter"; src: url(inter.woff2) format("woff2"); }"#;
        let sheet = parse_stylesheet(css).unwrap();

        assert_eq!(sheet.len(), 3);
        let RuleNode::Charset(charset) = &sheet.rules[0] else {
            panic!("expected charset");
        };
        assert_eq!(charset.charset, "\"UTF-8\"");

        let RuleNode::Keyframes(keyframes) = &sheet.rules[1] else {
            panic!("expected keyframes");
        };
        assert_eq!(keyframes.vendor.as_deref(), Some("-webkit-"));
        assert_eq!(keyframes.name, "spin");
        assert_eq!(keyframes.keyframes.len(), 3);
        let RuleNode::Keyframe(step) = &keyframes.keyframes[1] else {
            panic!("expected keyframe");
        };
        assert_eq!(step.values, vec!["50%", "75%"]);

        assert_eq!(sheet.rules[2].kind(), RuleKind::FontFace);
        assert_eq!(sheet.rules[2].declarations().unwrap().len(), 2);
    }

    #[test]
    fn parse_generic_at_rules() {
        let css = "@import url(base.css); @page :first { margin: 1in } @layer base { .a { color: red } }";
        let sheet = parse_stylesheet(css).unwrap();

        let bodies: Vec<_> = sheet
            .rules
            .iter()
            .map(|rule| match rule {
                RuleNode::AtRule(at) => (at.name.as_str(), at.prelude.as_str(), &at.body),
                _ => panic!("expected generic at-rule"),
            })
            .collect();

        assert!(matches!(bodies[0], ("import", "url(base.css)", AtRuleBody::Statement)));
        assert!(matches!(bodies[1], ("page", ":first", AtRuleBody::Declarations(d)) if d.len() == 1));
        assert!(matches!(bodies[2], ("layer", "base", AtRuleBody::Rules(r)) if r.len() == 1));
    }

    #[test]
    fn comments_are_kept_as_nodes() {
        let sheet = parse_stylesheet("/* header */ .a { color: red /* inline */ }").unwrap();

        assert_eq!(sheet.len(), 2);
        assert!(sheet.rules[0].is_comment());
        assert_eq!(sheet.rules[1].declarations().unwrap()[0].value, "red /* inline */");
    }

    #[test]
    fn invalid_declarations_are_skipped() {
        let sheet = parse_stylesheet(".a { color red; margin: 0; : x; padding: 1px }").unwrap();

        let properties: Vec<_> = sheet.rules[0]
            .declarations()
            .unwrap()
            .iter()
            .map(|d| d.property.as_str())
            .collect();
        assert_eq!(properties, vec!["margin", "padding"]);
    }

    #[test]
    fn unparseable_input_is_an_error() {
        assert!(parse_stylesheet(".a").is_err());
        assert!(parse_stylesheet("@media screen;").is_err());
        assert!(parse_stylesheet("").unwrap().is_empty());
    }

    #[test]
    fn recovers_after_a_bad_rule() {
        let sheet = parse_stylesheet("@media print; .b { color: blue }").unwrap();

        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet.rules[0].selectors().unwrap(), &[".b"]);
    }

    #[test]
    fn split_list_respects_nesting() {
        assert_eq!(split_list(" a , b "), vec!["a", "b"]);
        assert_eq!(split_list(":is(a, b), c"), vec![":is(a, b)", "c"]);
        assert_eq!(split_list("[data-x='1,2']"), vec!["[data-x='1,2']"]);
        assert!(split_list("  ").is_empty());
    }
}

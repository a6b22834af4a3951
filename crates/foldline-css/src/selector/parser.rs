//! Selector parsing using the `cssparser` tokenizer.

use std::mem;

use cssparser::{ParseError as CssParseError, ParseErrorKind, Parser, ParserInput, Token};

use super::{
    AttributeOperator, AttributeSelector, Combinator, NthExpr, PseudoClass, Selector,
    SelectorList, SelectorPart, TypeSelector,
};
use crate::{Error, Result};

type ParseResult<'i, T> = std::result::Result<T, CssParseError<'i, String>>;

/// Pseudo-elements that may be written with a single colon.
const LEGACY_PSEUDO_ELEMENTS: &[&str] = &["before", "after", "first-line", "first-letter"];

/// Parse a comma separated selector list.
///
/// Fails with [`Error::InvalidSelector`] for syntax errors and for
/// pseudo-classes the matcher does not know, mirroring how a browser's
/// `querySelectorAll` rejects them.
pub fn parse_selector_list(text: &str) -> Result<SelectorList> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);

    parse_list(&mut parser).map_err(|e| {
        let message = match e.kind {
            ParseErrorKind::Custom(message) => message,
            ParseErrorKind::Basic(kind) => format!("{:?}", kind),
        };
        Error::invalid_selector(text, message)
    })
}

fn parse_list<'i>(parser: &mut Parser<'i, '_>) -> ParseResult<'i, SelectorList> {
    parser.parse_comma_separated(parse_complex).map(SelectorList)
}

/// Parse one complex selector, up to a comma or the end of input.
fn parse_complex<'i>(parser: &mut Parser<'i, '_>) -> ParseResult<'i, Selector> {
    let mut parts = vec![];
    let mut combinators = vec![];
    let mut current = SelectorPart::new();
    let mut pending: Option<Combinator> = None;

    loop {
        let token = match parser.next_including_whitespace() {
            Ok(t) => t.clone(),
            Err(_) => break,
        };

        let combinator = match &token {
            Token::WhiteSpace(_) => {
                if !current.is_empty() && pending.is_none() {
                    pending = Some(Combinator::Descendant);
                }
                continue;
            }
            Token::Delim('>') => Some(Combinator::Child),
            Token::Delim('+') => Some(Combinator::AdjacentSibling),
            Token::Delim('~') => Some(Combinator::GeneralSibling),
            _ => None,
        };

        if let Some(combinator) = combinator {
            if current.is_empty() || matches!(pending, Some(c) if c != Combinator::Descendant) {
                return Err(parser.new_custom_error(format!("Unexpected combinator {:?}", token)));
            }
            pending = Some(combinator);
            continue;
        }

        if let Some(combinator) = pending.take() {
            parts.push(mem::take(&mut current));
            combinators.push(combinator);
        }

        if current.pseudo_element.is_some() {
            return Err(parser.new_custom_error("Pseudo-element must end the selector".to_string()));
        }

        parse_simple(parser, token, &mut current)?;
    }

    if current.is_empty() {
        return Err(parser.new_custom_error("Empty selector".to_string()));
    }
    if matches!(pending, Some(c) if c != Combinator::Descendant) {
        return Err(parser.new_custom_error("Selector ends with a combinator".to_string()));
    }
    parts.push(current);

    Ok(Selector { parts, combinators })
}

/// Apply one simple selector starting with `token` to `part`.
fn parse_simple<'i>(
    parser: &mut Parser<'i, '_>,
    token: Token<'i>,
    part: &mut SelectorPart,
) -> ParseResult<'i, ()> {
    match token {
        Token::Ident(name) => {
            if !part.is_empty() {
                return Err(parser.new_custom_error(format!("Type selector '{}' must come first", name)));
            }
            part.type_selector = Some(TypeSelector::Type(name.to_ascii_lowercase()));
        }

        Token::Delim('*') => {
            if !part.is_empty() {
                return Err(parser.new_custom_error("Universal selector must come first".to_string()));
            }
            part.type_selector = Some(TypeSelector::Universal);
        }

        Token::Delim('.') => match parser.next_including_whitespace() {
            Ok(Token::Ident(class)) => part.classes.push(class.to_string()),
            _ => return Err(parser.new_custom_error("Expected class name after '.'".to_string())),
        },

        Token::IDHash(id) => {
            if part.id.is_none() {
                part.id = Some(id.to_string());
            } else {
                // A second id must equal the first; express it as an attribute test.
                part.attributes.push(AttributeSelector::compare(
                    "id",
                    AttributeOperator::Equals,
                    id.to_string(),
                ));
            }
        }

        Token::SquareBracketBlock => {
            let attribute = parser.parse_nested_block(parse_attribute)?;
            part.attributes.push(attribute);
        }

        Token::Colon => parse_pseudo(parser, part)?,

        other => {
            return Err(parser.new_custom_error(format!("Unexpected token {:?}", other)));
        }
    }

    Ok(())
}

/// Parse what follows a ':' in a compound selector.
fn parse_pseudo<'i>(parser: &mut Parser<'i, '_>, part: &mut SelectorPart) -> ParseResult<'i, ()> {
    let token = parser.next_including_whitespace()?.clone();

    match token {
        Token::Colon => {
            let name = match parser.next_including_whitespace()?.clone() {
                Token::Ident(name) => name,
                Token::Function(name) => {
                    parser.parse_nested_block(|p| {
                        while p.next().is_ok() {}
                        Ok::<_, CssParseError<'i, String>>(())
                    })?;
                    name
                }
                other => {
                    return Err(parser.new_custom_error(format!("Invalid pseudo-element {:?}", other)));
                }
            };
            part.pseudo_element = Some(name.to_ascii_lowercase());
        }

        Token::Ident(name) => {
            let lower = name.to_ascii_lowercase();
            if LEGACY_PSEUDO_ELEMENTS.contains(&lower.as_str()) {
                part.pseudo_element = Some(lower);
            } else if let Some(pseudo) = PseudoClass::from_css(&lower) {
                part.pseudo_classes.push(pseudo);
            } else {
                return Err(parser.new_custom_error(format!("Unknown pseudo-class ':{}'", name)));
            }
        }

        Token::Function(name) => {
            let pseudo = match name.to_ascii_lowercase().as_str() {
                "nth-child" => PseudoClass::NthChild(parser.parse_nested_block(parse_nth_expr)?),
                "nth-last-child" => PseudoClass::NthLastChild(parser.parse_nested_block(parse_nth_expr)?),
                "nth-of-type" => PseudoClass::NthOfType(parser.parse_nested_block(parse_nth_expr)?),
                "nth-last-of-type" => {
                    PseudoClass::NthLastOfType(parser.parse_nested_block(parse_nth_expr)?)
                }
                "not" => PseudoClass::Not(Box::new(parser.parse_nested_block(parse_list)?)),
                "is" | "where" => PseudoClass::Is(Box::new(parser.parse_nested_block(parse_list)?)),
                _ => {
                    return Err(parser.new_custom_error(format!("Unknown pseudo-class ':{}()'", name)));
                }
            };
            part.pseudo_classes.push(pseudo);
        }

        other => {
            return Err(parser.new_custom_error(format!("Invalid pseudo-class {:?}", other)));
        }
    }

    Ok(())
}

/// Parse the inside of `[...]`.
fn parse_attribute<'i>(parser: &mut Parser<'i, '_>) -> ParseResult<'i, AttributeSelector> {
    let name = parser.expect_ident()?.to_ascii_lowercase();

    if parser.is_exhausted() {
        return Ok(AttributeSelector::exists(name));
    }

    let operator = match parser.next()?.clone() {
        Token::Delim('=') => AttributeOperator::Equals,
        Token::IncludeMatch => AttributeOperator::Includes,
        Token::DashMatch => AttributeOperator::DashMatch,
        Token::PrefixMatch => AttributeOperator::Prefix,
        Token::SuffixMatch => AttributeOperator::Suffix,
        Token::SubstringMatch => AttributeOperator::Substring,
        other => {
            return Err(parser.new_custom_error(format!("Invalid attribute operator {:?}", other)));
        }
    };

    let value = parser.expect_ident_or_string()?.to_string();

    let case_insensitive = match parser.try_parse(|p| p.expect_ident_cloned()) {
        Ok(flag) if flag.eq_ignore_ascii_case("i") => true,
        Ok(flag) if flag.eq_ignore_ascii_case("s") => false,
        Ok(flag) => {
            return Err(parser.new_custom_error(format!("Invalid attribute flag '{}'", flag)));
        }
        Err(_) => false,
    };

    parser.expect_exhausted()?;

    Ok(AttributeSelector {
        name,
        comparison: Some((operator, value)),
        case_insensitive,
    })
}

/// Parse an An+B expression (e.g., "odd", "even", "3", "2n+1", "-n + 3").
fn parse_nth_expr<'i>(parser: &mut Parser<'i, '_>) -> ParseResult<'i, NthExpr> {
    let (a, b) = cssparser::parse_nth(parser)?;
    parser.expect_exhausted()?;
    Ok(NthExpr::new(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(text: &str) -> Selector {
        let list = parse_selector_list(text).unwrap();
        assert_eq!(list.0.len(), 1, "{text}");
        list.0.into_iter().next().unwrap()
    }

    #[test]
    fn compound_selector() {
        let selector = parse_one("A.nav.main#top[data-x]");
        let part = &selector.parts[0];

        assert_eq!(part.type_selector, Some(TypeSelector::Type("a".into())));
        assert_eq!(part.classes, vec!["nav", "main"]);
        assert_eq!(part.id.as_deref(), Some("top"));
        assert_eq!(part.attributes, vec![AttributeSelector::exists("data-x")]);
    }

    #[test]
    fn combinators_and_whitespace() {
        let selector = parse_one("  ul  >li  .item+ span ~p   a ");

        assert_eq!(
            selector.combinators,
            vec![
                Combinator::Child,
                Combinator::Descendant,
                Combinator::AdjacentSibling,
                Combinator::GeneralSibling,
                Combinator::Descendant,
            ]
        );
        assert_eq!(selector.to_string(), "ul > li .item + span ~ p a");
    }

    #[test]
    fn selector_lists() {
        let list = parse_selector_list("h1, .a > b ,:not(.x, .y)").unwrap();

        assert_eq!(list.0.len(), 3);
        let PseudoClass::Not(inner) = &list.0[2].parts[0].pseudo_classes[0] else {
            panic!("expected :not");
        };
        assert_eq!(inner.0.len(), 2);
    }

    #[test]
    fn attribute_operators() {
        let selector = parse_one(r#"a[href^="https://" i][rel~=nofollow][lang|=en]"#);
        let attributes = &selector.parts[0].attributes;

        assert_eq!(attributes[0].comparison, Some((AttributeOperator::Prefix, "https://".into())));
        assert!(attributes[0].case_insensitive);
        assert_eq!(attributes[1].comparison, Some((AttributeOperator::Includes, "nofollow".into())));
        assert_eq!(attributes[2].comparison, Some((AttributeOperator::DashMatch, "en".into())));
    }

    #[test]
    fn structural_pseudo_classes() {
        let selector = parse_one("li:nth-child(2n+1):first-of-type:nth-last-child(-n + 3):root:hover");

        assert_eq!(
            selector.parts[0].pseudo_classes,
            vec![
                PseudoClass::NthChild(NthExpr::new(2, 1)),
                PseudoClass::FirstOfType,
                PseudoClass::NthLastChild(NthExpr::new(-1, 3)),
                PseudoClass::Root,
                PseudoClass::State("hover".into()),
            ]
        );
    }

    #[test]
    fn pseudo_elements() {
        assert_eq!(parse_one("p::first-line").parts[0].pseudo_element.as_deref(), Some("first-line"));
        assert_eq!(parse_one("p:before").parts[0].pseudo_element.as_deref(), Some("before"));
        assert_eq!(
            parse_one("input::-webkit-input-placeholder").parts[0].pseudo_element.as_deref(),
            Some("-webkit-input-placeholder")
        );
        assert!(parse_one("::selection").has_pseudo_element());
        assert!(parse_selector_list("p::before.x").is_err());
    }

    #[test]
    fn invalid_selectors() {
        for text in ["", ".", "a >", "> a", "a > > b", "a,", "div:unknown-thing", "a:foo()", "[=x]", "#", "a[b=c d]"] {
            assert!(
                matches!(parse_selector_list(text), Err(Error::InvalidSelector { .. })),
                "{text:?} should be rejected"
            );
        }
    }
}

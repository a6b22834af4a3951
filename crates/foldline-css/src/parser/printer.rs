//! Stylesheet printer.

use crate::rules::{AtRuleBody, Declaration, RuleNode, Stylesheet};

/// Output options for [`stringify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintOptions {
    /// Indentation unit used for nested blocks in pretty output.
    pub indent: String,
    /// Emit minimal whitespace.
    pub compress: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            compress: false,
        }
    }
}

impl PrintOptions {
    /// Options for minified output.
    pub fn compressed() -> Self {
        Self {
            indent: String::new(),
            compress: true,
        }
    }

    /// Set the indentation unit.
    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }
}

/// Print a stylesheet as CSS text. Comments are never printed.
pub fn stringify(sheet: &Stylesheet, options: &PrintOptions) -> String {
    let printer = Printer { options };
    printer.rule_list(&sheet.rules, 0)
}

struct Printer<'a> {
    options: &'a PrintOptions,
}

impl Printer<'_> {
    fn rule_list(&self, rules: &[RuleNode], level: usize) -> String {
        let separator = if self.options.compress { "" } else { "\n\n" };
        rules
            .iter()
            .filter_map(|rule| self.rule(rule, level))
            .collect::<Vec<_>>()
            .join(separator)
    }

    fn rule(&self, rule: &RuleNode, level: usize) -> Option<String> {
        let pad = self.options.indent.repeat(level);

        let text = match rule {
            RuleNode::Comment(_) => return None,

            RuleNode::Charset(charset) => format!("{pad}@charset {};", charset.charset),

            RuleNode::Rule(style) => {
                let joiner = if self.options.compress {
                    ",".to_string()
                } else {
                    format!(",\n{pad}")
                };
                let selectors = style.selectors.join(&joiner);
                self.declaration_block(&pad, &selectors, &style.declarations, level)
            }

            RuleNode::Media(group) => {
                self.rule_block(&pad, &format!("@media {}", group.criterion), &group.rules, level)
            }
            RuleNode::Supports(group) => self.rule_block(
                &pad,
                &format!("@supports {}", group.criterion),
                &group.rules,
                level,
            ),

            RuleNode::Keyframes(keyframes) => {
                let header = format!(
                    "@{}keyframes {}",
                    keyframes.vendor.as_deref().unwrap_or_default(),
                    keyframes.name
                );
                self.rule_block(&pad, &header, &keyframes.keyframes, level)
            }
            RuleNode::Keyframe(keyframe) => {
                let joiner = if self.options.compress { "," } else { ", " };
                self.declaration_block(
                    &pad,
                    &keyframe.values.join(joiner),
                    &keyframe.declarations,
                    level,
                )
            }

            RuleNode::FontFace(font_face) => {
                self.declaration_block(&pad, "@font-face", &font_face.declarations, level)
            }

            RuleNode::AtRule(at_rule) => {
                let header = if at_rule.prelude.is_empty() {
                    format!("@{}", at_rule.name)
                } else {
                    format!("@{} {}", at_rule.name, at_rule.prelude)
                };
                match &at_rule.body {
                    AtRuleBody::Statement => format!("{pad}{header};"),
                    AtRuleBody::Declarations(declarations) => {
                        self.declaration_block(&pad, &header, declarations, level)
                    }
                    AtRuleBody::Rules(rules) => self.rule_block(&pad, &header, rules, level),
                }
            }
        };

        Some(text)
    }

    fn declaration_block(
        &self,
        pad: &str,
        header: &str,
        declarations: &[Declaration],
        level: usize,
    ) -> String {
        if self.options.compress {
            let body = declarations
                .iter()
                .map(|d| format!("{}:{}", d.property, d.value))
                .collect::<Vec<_>>()
                .join(";");
            return format!("{header}{{{body}}}");
        }

        let inner = self.options.indent.repeat(level + 1);
        let mut out = format!("{pad}{header} {{\n");
        for declaration in declarations {
            out.push_str(&format!(
                "{inner}{}: {};\n",
                declaration.property, declaration.value
            ));
        }
        out.push_str(pad);
        out.push('}');
        out
    }

    fn rule_block(&self, pad: &str, header: &str, rules: &[RuleNode], level: usize) -> String {
        let body = self.rule_list(rules, level + 1);

        if self.options.compress {
            format!("{header}{{{body}}}")
        } else if body.is_empty() {
            format!("{pad}{header} {{}}")
        } else {
            format!("{pad}{header} {{\n{body}\n{pad}}}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_stylesheet;

    #[test]
    fn pretty_nested_output() {
        let sheet = parse_stylesheet("@media (min-width:600px){h1,.b{color:red;margin:0}}").unwrap();

        assert_eq!(
            stringify(&sheet, &PrintOptions::default()),
            "@media (min-width:600px) {\n  h1,\n  .b {\n    color: red;\n    margin: 0;\n  }\n}"
        );
    }

    #[test]
    fn compressed_output_drops_comments() {
        let css = "/* c */ @charset \"UTF-8\"; .a { color: red; margin: 0 } @keyframes k { from { opacity: 0 } to { opacity: 1 } }";
        let sheet = parse_stylesheet(css).unwrap();

        assert_eq!(
            stringify(&sheet, &PrintOptions::compressed()),
            "@charset \"UTF-8\";.a{color:red;margin:0}@keyframes k{from{opacity:0}to{opacity:1}}"
        );
    }

    #[test]
    fn pretty_output_drops_comments() {
        let sheet = parse_stylesheet("/* top */ .a { color: red } @media print { /* inner */ .b { color: blue } }").unwrap();

        assert_eq!(
            stringify(&sheet, &PrintOptions::default()),
            ".a {\n  color: red;\n}\n\n@media print {\n  .b {\n    color: blue;\n  }\n}"
        );
    }

    #[test]
    fn custom_indent() {
        let sheet = parse_stylesheet("@supports (display:grid) { .g { display: grid } }").unwrap();
        let options = PrintOptions::default().with_indent("\t");

        assert_eq!(
            stringify(&sheet, &options),
            "@supports (display:grid) {\n\t.g {\n\t\tdisplay: grid;\n\t}\n}"
        );
    }

    #[test]
    fn printed_output_parses_back_to_the_same_tree() {
        let css = r#"
            @import url(base.css);
            @font-face { font-family: "Inter"; src: url(a.woff2) }
            .a, .b > p { color: red }
            @media print { @supports (display: grid) { .c { display: grid } } }
            @-webkit-keyframes spin { 0%, 50% { opacity: 0 } }
            @page :first { margin: 1in }
        "#;
        let sheet = parse_stylesheet(css).unwrap();

        for options in [PrintOptions::default(), PrintOptions::compressed()] {
            let reparsed = parse_stylesheet(&stringify(&sheet, &options)).unwrap();
            let strip = |s: &Stylesheet| s.rules.iter().map(RuleNode::without_position).collect::<Vec<_>>();
            assert_eq!(strip(&reparsed), strip(&sheet));
        }
    }
}

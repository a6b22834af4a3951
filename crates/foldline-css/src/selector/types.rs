//! Selector type definitions.

use std::fmt;

/// A comma separated list of selectors (e.g., "h1, .title > span").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectorList(pub Vec<Selector>);

impl SelectorList {
    /// Selectors in source order.
    pub fn selectors(&self) -> &[Selector] {
        &self.0
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, selector) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", selector)?;
        }
        Ok(())
    }
}

/// A complex selector (e.g., "nav.main > ul li:first-child").
///
/// A selector consists of one or more compound parts connected by combinators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector {
    /// Compound parts, left to right.
    pub parts: Vec<SelectorPart>,
    /// Combinators between parts (length = parts.len() - 1).
    pub combinators: Vec<Combinator>,
}

impl Selector {
    /// Create a simple type selector.
    pub fn type_selector(name: impl Into<String>) -> Self {
        Self {
            parts: vec![SelectorPart::type_only(name)],
            combinators: vec![],
        }
    }

    /// Create a class selector.
    pub fn class(class_name: impl Into<String>) -> Self {
        Self {
            parts: vec![SelectorPart::class_only(class_name)],
            combinators: vec![],
        }
    }

    /// Add a descendant selector part.
    pub fn descendant(self, part: SelectorPart) -> Self {
        self.combine(Combinator::Descendant, part)
    }

    /// Add a child selector part.
    pub fn child(self, part: SelectorPart) -> Self {
        self.combine(Combinator::Child, part)
    }

    /// Add a part with an explicit combinator.
    pub fn combine(mut self, combinator: Combinator, part: SelectorPart) -> Self {
        if !self.parts.is_empty() {
            self.combinators.push(combinator);
        }
        self.parts.push(part);
        self
    }

    /// Get the rightmost (subject) selector part.
    pub fn subject(&self) -> Option<&SelectorPart> {
        self.parts.last()
    }

    /// Whether any part carries a pseudo-element.
    pub fn has_pseudo_element(&self) -> bool {
        self.parts.iter().any(|part| part.pseudo_element.is_some())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                match &self.combinators[i - 1] {
                    Combinator::Descendant => write!(f, " ")?,
                    Combinator::Child => write!(f, " > ")?,
                    Combinator::AdjacentSibling => write!(f, " + ")?,
                    Combinator::GeneralSibling => write!(f, " ~ ")?,
                }
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

/// A compound selector (e.g., "a.nav[href]:first-child").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SelectorPart {
    /// Type selector (element name or universal).
    pub type_selector: Option<TypeSelector>,
    /// ID selector (#id).
    pub id: Option<String>,
    /// Class selectors (.class).
    pub classes: Vec<String>,
    /// Attribute selectors ([name=value]).
    pub attributes: Vec<AttributeSelector>,
    /// Pseudo-class selectors (:first-child, :not(...), etc.).
    pub pseudo_classes: Vec<PseudoClass>,
    /// Pseudo-element (::before). Never matches an element.
    pub pseudo_element: Option<String>,
}

impl SelectorPart {
    /// Create a new empty selector part.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a type-only selector.
    pub fn type_only(name: impl Into<String>) -> Self {
        Self {
            type_selector: Some(TypeSelector::Type(name.into())),
            ..Default::default()
        }
    }

    /// Create a universal selector part.
    pub fn universal() -> Self {
        Self {
            type_selector: Some(TypeSelector::Universal),
            ..Default::default()
        }
    }

    /// Create a class-only selector.
    pub fn class_only(class_name: impl Into<String>) -> Self {
        Self {
            classes: vec![class_name.into()],
            ..Default::default()
        }
    }

    /// Create an ID-only selector.
    pub fn id_only(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Add an ID selector.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a class selector.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Add an attribute selector.
    pub fn with_attribute(mut self, attribute: AttributeSelector) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Add a pseudo-class selector.
    pub fn with_pseudo(mut self, pseudo: PseudoClass) -> Self {
        self.pseudo_classes.push(pseudo);
        self
    }

    /// Check if nothing has been added to this part yet.
    pub fn is_empty(&self) -> bool {
        self.type_selector.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attributes.is_empty()
            && self.pseudo_classes.is_empty()
            && self.pseudo_element.is_none()
    }
}

impl fmt::Display for SelectorPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.type_selector {
            Some(TypeSelector::Universal) => write!(f, "*")?,
            Some(TypeSelector::Type(t)) => write!(f, "{}", t)?,
            None => {}
        }

        if let Some(id) = &self.id {
            write!(f, "#{}", id)?;
        }

        for class in &self.classes {
            write!(f, ".{}", class)?;
        }

        for attribute in &self.attributes {
            write!(f, "{}", attribute)?;
        }

        for pseudo in &self.pseudo_classes {
            write!(f, ":{}", pseudo)?;
        }

        if let Some(element) = &self.pseudo_element {
            write!(f, "::{}", element)?;
        }

        Ok(())
    }
}

/// Type selector - matches the element name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSelector {
    /// Universal selector (*) - matches any element.
    Universal,
    /// Element name, lowercased (e.g., "div", "a").
    Type(String),
}

/// Combinator between selector parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// Descendant combinator (space): matches any descendant.
    Descendant,
    /// Child combinator (>): matches direct child only.
    Child,
    /// Adjacent sibling (+): matches immediately following sibling.
    AdjacentSibling,
    /// General sibling (~): matches any following sibling.
    GeneralSibling,
}

/// Attribute comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeOperator {
    /// `[a=v]`
    Equals,
    /// `[a~=v]` - whitespace separated list contains v.
    Includes,
    /// `[a|=v]` - equals v or starts with `v-`.
    DashMatch,
    /// `[a^=v]`
    Prefix,
    /// `[a$=v]`
    Suffix,
    /// `[a*=v]`
    Substring,
}

impl fmt::Display for AttributeOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttributeOperator::Equals => "=",
            AttributeOperator::Includes => "~=",
            AttributeOperator::DashMatch => "|=",
            AttributeOperator::Prefix => "^=",
            AttributeOperator::Suffix => "$=",
            AttributeOperator::Substring => "*=",
        })
    }
}

/// An attribute selector (`[name]`, `[name^="value" i]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeSelector {
    /// Attribute name, lowercased.
    pub name: String,
    /// Operator and value; `None` tests presence only.
    pub comparison: Option<(AttributeOperator, String)>,
    /// Compare values ASCII case-insensitively.
    pub case_insensitive: bool,
}

impl AttributeSelector {
    /// Presence test.
    pub fn exists(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comparison: None,
            case_insensitive: false,
        }
    }

    /// Value comparison.
    pub fn compare(name: impl Into<String>, operator: AttributeOperator, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comparison: Some((operator, value.into())),
            case_insensitive: false,
        }
    }

    /// Check an attribute value against this selector.
    pub fn matches_value(&self, actual: &str) -> bool {
        let Some((operator, expected)) = &self.comparison else {
            return true;
        };

        let (actual, expected) = if self.case_insensitive {
            (actual.to_ascii_lowercase(), expected.to_ascii_lowercase())
        } else {
            (actual.to_string(), expected.clone())
        };

        match operator {
            AttributeOperator::Equals => actual == expected,
            AttributeOperator::Includes => {
                !expected.is_empty() && actual.split_ascii_whitespace().any(|word| word == expected)
            }
            AttributeOperator::DashMatch => {
                actual == expected || actual.starts_with(&format!("{expected}-"))
            }
            AttributeOperator::Prefix => !expected.is_empty() && actual.starts_with(&expected),
            AttributeOperator::Suffix => !expected.is_empty() && actual.ends_with(&expected),
            AttributeOperator::Substring => !expected.is_empty() && actual.contains(&expected),
        }
    }
}

impl fmt::Display for AttributeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.comparison {
            None => write!(f, "[{}]", self.name),
            Some((operator, value)) => {
                write!(f, "[{}{}\"{}\"", self.name, operator, value)?;
                if self.case_insensitive {
                    write!(f, " i")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Pseudo-class selectors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PseudoClass {
    /// :root - the document element.
    Root,
    /// :first-child - first among siblings.
    FirstChild,
    /// :last-child - last among siblings.
    LastChild,
    /// :only-child - only child of parent.
    OnlyChild,
    /// :first-of-type
    FirstOfType,
    /// :last-of-type
    LastOfType,
    /// :only-of-type
    OnlyOfType,
    /// :nth-child(An+B)
    NthChild(NthExpr),
    /// :nth-last-child(An+B)
    NthLastChild(NthExpr),
    /// :nth-of-type(An+B)
    NthOfType(NthExpr),
    /// :nth-last-of-type(An+B)
    NthLastOfType(NthExpr),
    /// :empty - has no children.
    Empty,
    /// :link / :any-link - `a` or `area` with an `href`.
    Link,
    /// :checked - `checked` or `selected` attribute present.
    Checked,
    /// :disabled - `disabled` attribute present.
    Disabled,
    /// :enabled - form control without `disabled`.
    Enabled,
    /// Interaction state (:hover, :focus, ...). Never true in a static layout.
    State(String),
    /// :not(list) - negation.
    Not(Box<SelectorList>),
    /// :is(list) / :where(list) - matches any.
    Is(Box<SelectorList>),
}

impl fmt::Display for PseudoClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PseudoClass::Root => write!(f, "root"),
            PseudoClass::FirstChild => write!(f, "first-child"),
            PseudoClass::LastChild => write!(f, "last-child"),
            PseudoClass::OnlyChild => write!(f, "only-child"),
            PseudoClass::FirstOfType => write!(f, "first-of-type"),
            PseudoClass::LastOfType => write!(f, "last-of-type"),
            PseudoClass::OnlyOfType => write!(f, "only-of-type"),
            PseudoClass::NthChild(expr) => write!(f, "nth-child({})", expr),
            PseudoClass::NthLastChild(expr) => write!(f, "nth-last-child({})", expr),
            PseudoClass::NthOfType(expr) => write!(f, "nth-of-type({})", expr),
            PseudoClass::NthLastOfType(expr) => write!(f, "nth-last-of-type({})", expr),
            PseudoClass::Empty => write!(f, "empty"),
            PseudoClass::Link => write!(f, "link"),
            PseudoClass::Checked => write!(f, "checked"),
            PseudoClass::Disabled => write!(f, "disabled"),
            PseudoClass::Enabled => write!(f, "enabled"),
            PseudoClass::State(name) => write!(f, "{}", name),
            PseudoClass::Not(inner) => write!(f, "not({})", inner),
            PseudoClass::Is(inner) => write!(f, "is({})", inner),
        }
    }
}

impl PseudoClass {
    /// Parse an argument-less pseudo-class name.
    pub fn from_css(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "root" => Some(Self::Root),
            "first-child" => Some(Self::FirstChild),
            "last-child" => Some(Self::LastChild),
            "only-child" => Some(Self::OnlyChild),
            "first-of-type" => Some(Self::FirstOfType),
            "last-of-type" => Some(Self::LastOfType),
            "only-of-type" => Some(Self::OnlyOfType),
            "empty" => Some(Self::Empty),
            "link" | "any-link" => Some(Self::Link),
            "checked" => Some(Self::Checked),
            "disabled" => Some(Self::Disabled),
            "enabled" => Some(Self::Enabled),
            state @ ("hover" | "active" | "focus" | "focus-within" | "focus-visible"
            | "visited" | "target" | "placeholder-shown" | "autofill") => {
                Some(Self::State(state.to_string()))
            }
            _ => None,
        }
    }
}

/// Expression for :nth-child (An+B).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NthExpr {
    /// Coefficient (A in An+B).
    pub a: i32,
    /// Offset (B in An+B).
    pub b: i32,
}

impl NthExpr {
    /// Create a new nth expression.
    pub fn new(a: i32, b: i32) -> Self {
        Self { a, b }
    }

    /// Check if a 0-indexed position matches this expression.
    pub fn matches(&self, index: usize) -> bool {
        // 1-indexed, widened so that `n - b` cannot overflow.
        let n = index as i64 + 1;
        let (a, b) = (i64::from(self.a), i64::from(self.b));
        if a == 0 {
            n == b
        } else {
            let diff = n - b;
            if a > 0 {
                diff >= 0 && diff % a == 0
            } else {
                diff <= 0 && diff % a == 0
            }
        }
    }

    /// :nth-child(odd) = 2n+1.
    pub fn odd() -> Self {
        Self { a: 2, b: 1 }
    }

    /// :nth-child(even) = 2n.
    pub fn even() -> Self {
        Self { a: 2, b: 0 }
    }
}

impl fmt::Display for NthExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.a, self.b) {
            (2, 1) => write!(f, "odd"),
            (2, 0) => write!(f, "even"),
            (0, b) => write!(f, "{}", b),
            (1, 0) => write!(f, "n"),
            (a, 0) => write!(f, "{}n", a),
            (1, b) if b > 0 => write!(f, "n+{}", b),
            (1, b) => write!(f, "n{}", b),
            (a, b) if b > 0 => write!(f, "{}n+{}", a, b),
            (a, b) => write!(f, "{}n{}", a, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_display() {
        let sel = Selector::type_selector("nav")
            .descendant(SelectorPart::class_only("item").with_pseudo(PseudoClass::FirstChild));
        assert_eq!(sel.to_string(), "nav .item:first-child");

        let sel = Selector::class("list").child(SelectorPart::type_only("li"));
        assert_eq!(sel.to_string(), ".list > li");
    }

    #[test]
    fn selector_part_display() {
        let part = SelectorPart::type_only("a")
            .with_class("nav")
            .with_attribute(AttributeSelector::compare("href", AttributeOperator::Prefix, "https"))
            .with_pseudo(PseudoClass::Link);
        assert_eq!(part.to_string(), "a.nav[href^=\"https\"]:link");
    }

    #[test]
    fn attribute_value_matching() {
        let includes = AttributeSelector::compare("class", AttributeOperator::Includes, "b");
        assert!(includes.matches_value("a b c"));
        assert!(!includes.matches_value("abc"));

        let dash = AttributeSelector::compare("lang", AttributeOperator::DashMatch, "en");
        assert!(dash.matches_value("en"));
        assert!(dash.matches_value("en-US"));
        assert!(!dash.matches_value("english"));

        let mut suffix = AttributeSelector::compare("src", AttributeOperator::Suffix, ".PNG");
        assert!(!suffix.matches_value("hero.png"));
        suffix.case_insensitive = true;
        assert!(suffix.matches_value("hero.png"));

        let empty = AttributeSelector::compare("href", AttributeOperator::Substring, "");
        assert!(!empty.matches_value("anything"));
        assert!(AttributeSelector::exists("hidden").matches_value(""));
    }

    #[test]
    fn nth_expr_matches() {
        // :nth-child(3)
        let expr = NthExpr::new(0, 3);
        assert!(!expr.matches(0)); // 1st child
        assert!(!expr.matches(1)); // 2nd child
        assert!(expr.matches(2));  // 3rd child
        assert!(!expr.matches(3)); // 4th child

        // :nth-child(odd) = 2n+1
        let expr = NthExpr::odd();
        assert!(expr.matches(0));
        assert!(!expr.matches(1));
        assert!(expr.matches(2));

        // :nth-child(-n+2) = first two
        let expr = NthExpr::new(-1, 2);
        assert!(expr.matches(0));
        assert!(expr.matches(1));
        assert!(!expr.matches(2));

        // Offsets at the ends of the i32 range
        assert!(NthExpr::new(1, i32::MIN).matches(0));
        assert!(NthExpr::new(-1, i32::MAX).matches(0));
        assert!(!NthExpr::new(0, i32::MIN).matches(0));
        assert!(!NthExpr::new(i32::MIN, i32::MAX).matches(3));
    }
}

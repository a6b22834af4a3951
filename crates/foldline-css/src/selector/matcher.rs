//! Selector matching algorithm.

use super::{
    Combinator, NthExpr, PseudoClass, Selector, SelectorList, SelectorPart, TypeSelector,
};

/// An element handle the matcher can navigate.
///
/// Handles are cheap to clone (typically an index plus a reference to the
/// owning tree).
pub trait MatchElement: Clone {
    /// Lowercase element name.
    fn local_name(&self) -> &str;

    /// The `id` attribute.
    fn id(&self) -> Option<&str>;

    /// Whether the element carries `class`.
    fn has_class(&self, class: &str) -> bool;

    /// Attribute value by lowercase name.
    fn attribute(&self, name: &str) -> Option<&str>;

    /// Parent element.
    fn parent(&self) -> Option<Self>;

    /// Previous element sibling.
    fn prev_sibling(&self) -> Option<Self>;

    /// Next element sibling.
    fn next_sibling(&self) -> Option<Self>;

    /// Whether the element has any child elements or text.
    fn has_child_nodes(&self) -> bool;
}

/// Form elements that can be `:enabled`/`:disabled`.
const FORM_ELEMENTS: &[&str] = &[
    "button", "input", "select", "textarea", "option", "optgroup", "fieldset",
];

/// Selector matching engine.
pub struct SelectorMatcher;

impl SelectorMatcher {
    /// Check if any selector of a list matches the element.
    pub fn matches<E: MatchElement>(list: &SelectorList, element: &E) -> bool {
        list.0.iter().any(|selector| Self::matches_selector(selector, element))
    }

    /// Check if a full selector matches, considering combinators.
    ///
    /// This walks the selector from right to left. Descendant and general
    /// sibling combinators backtrack, so `div p` also matches when the
    /// nearest `div` ancestor fails a later constraint but an outer one
    /// satisfies it.
    pub fn matches_selector<E: MatchElement>(selector: &Selector, element: &E) -> bool {
        if selector.parts.is_empty() {
            return false;
        }
        Self::matches_from(selector, selector.parts.len() - 1, element)
    }

    fn matches_from<E: MatchElement>(selector: &Selector, index: usize, element: &E) -> bool {
        if !Self::part_matches(&selector.parts[index], element) {
            return false;
        }

        if index == 0 {
            return true;
        }

        let next = index - 1;
        match selector.combinators[next] {
            Combinator::Descendant => {
                let mut ancestor = element.parent();
                while let Some(candidate) = ancestor {
                    if Self::matches_from(selector, next, &candidate) {
                        return true;
                    }
                    ancestor = candidate.parent();
                }
                false
            }

            Combinator::Child => element
                .parent()
                .is_some_and(|parent| Self::matches_from(selector, next, &parent)),

            Combinator::AdjacentSibling => element
                .prev_sibling()
                .is_some_and(|sibling| Self::matches_from(selector, next, &sibling)),

            Combinator::GeneralSibling => {
                let mut sibling = element.prev_sibling();
                while let Some(candidate) = sibling {
                    if Self::matches_from(selector, next, &candidate) {
                        return true;
                    }
                    sibling = candidate.prev_sibling();
                }
                false
            }
        }
    }

    /// Check if a compound selector matches the element.
    pub fn part_matches<E: MatchElement>(part: &SelectorPart, element: &E) -> bool {
        // Pseudo-elements are not elements.
        if part.pseudo_element.is_some() {
            return false;
        }

        // Check type selector
        if let Some(TypeSelector::Type(name)) = &part.type_selector
            && !element.local_name().eq_ignore_ascii_case(name)
        {
            return false;
        }

        // Check ID selector
        if let Some(id) = &part.id
            && element.id() != Some(id.as_str())
        {
            return false;
        }

        // Check class selectors (all must match)
        if !part.classes.iter().all(|class| element.has_class(class)) {
            return false;
        }

        // Check attribute selectors
        for attribute in &part.attributes {
            match element.attribute(&attribute.name) {
                Some(value) if attribute.matches_value(value) => {}
                _ => return false,
            }
        }

        // Check pseudo-class selectors (all must match)
        part.pseudo_classes
            .iter()
            .all(|pseudo| Self::pseudo_matches(pseudo, element))
    }

    /// Check if a pseudo-class matches the element.
    fn pseudo_matches<E: MatchElement>(pseudo: &PseudoClass, element: &E) -> bool {
        match pseudo {
            PseudoClass::Root => element.parent().is_none(),

            PseudoClass::FirstChild => element.prev_sibling().is_none(),
            PseudoClass::LastChild => element.next_sibling().is_none(),
            PseudoClass::OnlyChild => {
                element.prev_sibling().is_none() && element.next_sibling().is_none()
            }

            PseudoClass::FirstOfType => same_type_before(element) == 0,
            PseudoClass::LastOfType => same_type_after(element) == 0,
            PseudoClass::OnlyOfType => {
                same_type_before(element) == 0 && same_type_after(element) == 0
            }

            PseudoClass::NthChild(expr) => nth(expr, siblings_before(element, |_| true)),
            PseudoClass::NthLastChild(expr) => nth(expr, siblings_after(element, |_| true)),
            PseudoClass::NthOfType(expr) => nth(expr, same_type_before(element)),
            PseudoClass::NthLastOfType(expr) => nth(expr, same_type_after(element)),

            PseudoClass::Empty => !element.has_child_nodes(),

            PseudoClass::Link => {
                matches!(element.local_name(), "a" | "area") && element.attribute("href").is_some()
            }
            PseudoClass::Checked => {
                element.attribute("checked").is_some() || element.attribute("selected").is_some()
            }
            PseudoClass::Disabled => {
                FORM_ELEMENTS.contains(&element.local_name()) && element.attribute("disabled").is_some()
            }
            PseudoClass::Enabled => {
                FORM_ELEMENTS.contains(&element.local_name()) && element.attribute("disabled").is_none()
            }

            PseudoClass::State(_) => false,

            PseudoClass::Not(inner) => !Self::matches(inner, element),
            PseudoClass::Is(inner) => Self::matches(inner, element),
        }
    }
}

fn nth(expr: &NthExpr, index: usize) -> bool {
    expr.matches(index)
}

fn siblings_before<E: MatchElement>(element: &E, filter: impl Fn(&E) -> bool) -> usize {
    let mut count = 0;
    let mut sibling = element.prev_sibling();
    while let Some(candidate) = sibling {
        if filter(&candidate) {
            count += 1;
        }
        sibling = candidate.prev_sibling();
    }
    count
}

fn siblings_after<E: MatchElement>(element: &E, filter: impl Fn(&E) -> bool) -> usize {
    let mut count = 0;
    let mut sibling = element.next_sibling();
    while let Some(candidate) = sibling {
        if filter(&candidate) {
            count += 1;
        }
        sibling = candidate.next_sibling();
    }
    count
}

fn same_type_before<E: MatchElement>(element: &E) -> usize {
    siblings_before(element, |s| s.local_name() == element.local_name())
}

fn same_type_after<E: MatchElement>(element: &E) -> usize {
    siblings_after(element, |s| s.local_name() == element.local_name())
}

//! Removal of presentation-only chrome from a tree copy.

use std::collections::HashSet;

use scrib_renderer::{Element, Node};

/// Tags dropped by default: interactive controls, icons and raw-text elements.
const DEFAULT_PRUNED_TAGS: &[&str] = &["button", "svg", "script", "style", "noscript", "template"];

/// Which elements to drop before rendering.
///
/// An element is dropped, with its whole subtree, when its tag is listed,
/// it carries a listed class, or it has a listed attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneRules {
    /// Lowercase tag names.
    pub tags: HashSet<String>,
    /// Class names.
    pub classes: HashSet<String>,
    /// Attribute names; presence is enough.
    pub attributes: HashSet<String>,
}

impl Default for PruneRules {
    fn default() -> Self {
        Self {
            tags: DEFAULT_PRUNED_TAGS.iter().map(|t| (*t).to_owned()).collect(),
            classes: HashSet::new(),
            attributes: HashSet::new(),
        }
    }
}

impl PruneRules {
    /// Rules that drop nothing.
    #[must_use]
    pub fn none() -> Self {
        Self {
            tags: HashSet::new(),
            classes: HashSet::new(),
            attributes: HashSet::new(),
        }
    }

    /// Add tags to drop.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags
            .extend(tags.into_iter().map(|t| t.as_ref().to_ascii_lowercase()));
        self
    }

    /// Add classes to drop.
    #[must_use]
    pub fn with_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes.extend(classes.into_iter().map(Into::into));
        self
    }

    /// Add attributes whose presence drops an element.
    #[must_use]
    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .extend(attributes.into_iter().map(Into::into));
        self
    }

    /// Check if an element should be dropped.
    #[must_use]
    pub fn matches(&self, element: &Element) -> bool {
        self.tags.contains(&element.tag)
            || element.classes.iter().any(|c| self.classes.contains(c))
            || element.attrs.keys().any(|a| self.attributes.contains(a))
    }
}

/// Return a copy of `node` without the elements `rules` match.
///
/// The root itself is never dropped.
#[must_use]
pub fn prune(node: &Node, rules: &PruneRules) -> Node {
    let mut removed = 0;
    let pruned = match node {
        Node::Text(_) => node.clone(),
        Node::Element(element) => Node::Element(prune_element(element, rules, &mut removed)),
    };
    tracing::debug!(removed, "Pruned chrome elements");
    pruned
}

fn prune_element(element: &Element, rules: &PruneRules, removed: &mut usize) -> Element {
    let children = element
        .children
        .iter()
        .filter_map(|child| match child {
            Node::Text(_) => Some(child.clone()),
            Node::Element(el) if rules.matches(el) => {
                *removed += 1;
                None
            }
            Node::Element(el) => Some(Node::Element(prune_element(el, rules, removed))),
        })
        .collect();

    Element {
        tag: element.tag.clone(),
        attrs: element.attrs.clone(),
        classes: element.classes.clone(),
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Node {
        Element::new("div")
            .with_child(Element::new("p").with_text("keep"))
            .with_child(Element::new("button").with_text("Copy code"))
            .with_child(
                Element::new("div")
                    .with_class("toolbar")
                    .with_child(Element::new("span").with_text("menu")),
            )
            .with_child(
                Element::new("span")
                    .with_attr("data-testid", "icon")
                    .with_text("*"),
            )
            .into()
    }

    #[test]
    fn test_default_rules_drop_buttons() {
        let pruned = prune(&tree(), &PruneRules::default());
        assert_eq!(pruned.text_content(), "keepmenu*");
    }

    #[test]
    fn test_class_and_attribute_rules() {
        let rules = PruneRules::default()
            .with_classes(["toolbar"])
            .with_attributes(["data-testid"]);
        let pruned = prune(&tree(), &rules);
        assert_eq!(pruned.text_content(), "keep");
    }

    #[test]
    fn test_input_untouched() {
        let input = tree();
        let _ = prune(&input, &PruneRules::default());
        assert_eq!(input, tree());
    }

    #[test]
    fn test_root_never_dropped() {
        let root: Node = Element::new("button").with_text("x").into();
        assert_eq!(prune(&root, &PruneRules::default()), root);
    }

    #[test]
    fn test_none_keeps_everything() {
        assert_eq!(prune(&tree(), &PruneRules::none()), tree());
    }

    #[test]
    fn test_with_tags_lowercases() {
        let rules = PruneRules::none().with_tags(["SPAN"]);
        assert!(rules.tags.contains("span"));
    }
}

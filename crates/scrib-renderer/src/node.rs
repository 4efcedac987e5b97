//! Immutable document tree consumed by the renderer.

use std::collections::HashMap;

/// Node in a document snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Raw character data.
    Text(String),
    /// Element with tag, attributes, classes and ordered children.
    Element(Element),
}

impl Node {
    /// Create a text node.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Get the element if this node is one.
    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            Self::Text(_) => None,
        }
    }

    /// Concatenated character data of this node and all descendants.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Text(text) => out.push_str(text),
            Self::Element(element) => {
                for child in &element.children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Number of nodes in this subtree, including itself.
    #[must_use]
    pub fn node_count(&self) -> usize {
        match self {
            Self::Text(_) => 1,
            Self::Element(element) => {
                1 + element.children.iter().map(Self::node_count).sum::<usize>()
            }
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

/// Element node.
///
/// Tag names are stored lowercase. Classes keep document order without
/// duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Lowercase tag name.
    pub tag: String,
    /// Element attributes.
    pub attrs: HashMap<String, String>,
    /// Class list.
    pub classes: Vec<String>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
}

impl Element {
    /// Create an element with the given tag.
    #[must_use]
    pub fn new(tag: impl AsRef<str>) -> Self {
        Self {
            tag: tag.as_ref().to_ascii_lowercase(),
            ..Default::default()
        }
    }

    /// Set an attribute.
    ///
    /// Setting `class` also replaces the class list.
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key.into(), value.into());
        self
    }

    /// Add a class.
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.push_class(class.into());
        self
    }

    /// Append a child node.
    #[must_use]
    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Replace children.
    #[must_use]
    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    /// Append a text child.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Set an attribute in place.
    pub fn set_attr(&mut self, key: String, value: String) {
        if key == "class" {
            self.classes.clear();
            for class in value.split_ascii_whitespace() {
                self.push_class(class.to_owned());
            }
        }
        self.attrs.insert(key, value);
    }

    fn push_class(&mut self, class: String) {
        if !class.is_empty() && !self.classes.contains(&class) {
            self.classes.push(class);
        }
    }

    /// Get an attribute value.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Check if the element carries a class.
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Iterate over child elements, skipping text.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Concatenated character data of all descendants.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.collect_text(&mut out);
        }
        out
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_is_lowercased() {
        assert_eq!(Element::new("DIV").tag, "div");
    }

    #[test]
    fn test_class_attribute_populates_classes() {
        let el = Element::new("code").with_attr("class", "language-rust  hljs language-rust");
        assert_eq!(el.classes, vec!["language-rust", "hljs"]);
        assert_eq!(el.attr("class"), Some("language-rust  hljs language-rust"));
        assert!(el.has_class("hljs"));
    }

    #[test]
    fn test_with_class_deduplicates() {
        let el = Element::new("span").with_class("a").with_class("a").with_class("b");
        assert_eq!(el.classes, vec!["a", "b"]);
    }

    #[test]
    fn test_text_content_concatenates_descendants() {
        let el = Element::new("p")
            .with_text("Hello ")
            .with_child(Element::new("b").with_text("big"))
            .with_text(" world");
        assert_eq!(el.text_content(), "Hello big world");
    }

    #[test]
    fn test_node_count() {
        let node: Node = Element::new("ul")
            .with_child(Element::new("li").with_text("a"))
            .with_child(Element::new("li").with_text("b"))
            .into();
        assert_eq!(node.node_count(), 5);
    }

    #[test]
    fn test_child_elements_skips_text() {
        let el = Element::new("ul")
            .with_text("\n  ")
            .with_child(Element::new("li"))
            .with_text("\n");
        assert_eq!(el.child_elements().count(), 1);
    }
}

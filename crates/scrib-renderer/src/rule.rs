//! Tag-to-strategy dispatch table.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Rendering strategy applied to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Heading with level 1-6.
    Heading(u8),
    Paragraph,
    LineBreak,
    HorizontalRule,
    Blockquote,
    /// Preformatted block rendered as a fenced code block.
    CodeBlock,
    UnorderedList,
    OrderedList,
    /// List item; markup is added by the parent list.
    ListItem,
    Table,
    Bold,
    Italic,
    Strikethrough,
    InlineCode,
    Link,
    Image,
}

/// Error for an unrecognized rule name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rule name: {0}")]
pub struct UnknownRuleError(pub String);

impl FromStr for Rule {
    type Err = UnknownRuleError;

    /// Parse a rule name.
    ///
    /// Accepts the default HTML tag for the rule (`h2`, `ul`, `strong`, ...)
    /// as well as descriptive names (`heading2`, `unordered-list`, `bold`, ...).
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let normalized = name.trim().to_ascii_lowercase().replace('_', "-");
        let rule = match normalized.as_str() {
            "h1" | "heading1" => Self::Heading(1),
            "h2" | "heading2" => Self::Heading(2),
            "h3" | "heading3" => Self::Heading(3),
            "h4" | "heading4" => Self::Heading(4),
            "h5" | "heading5" => Self::Heading(5),
            "h6" | "heading6" => Self::Heading(6),
            "p" | "paragraph" => Self::Paragraph,
            "br" | "line-break" => Self::LineBreak,
            "hr" | "horizontal-rule" => Self::HorizontalRule,
            "blockquote" | "quote" => Self::Blockquote,
            "pre" | "code-block" => Self::CodeBlock,
            "ul" | "unordered-list" => Self::UnorderedList,
            "ol" | "ordered-list" => Self::OrderedList,
            "li" | "list-item" => Self::ListItem,
            "table" => Self::Table,
            "strong" | "b" | "bold" => Self::Bold,
            "em" | "i" | "italic" => Self::Italic,
            "del" | "s" | "strike" | "strikethrough" => Self::Strikethrough,
            "code" | "inline-code" => Self::InlineCode,
            "a" | "link" => Self::Link,
            "img" | "image" => Self::Image,
            _ => return Err(UnknownRuleError(name.to_owned())),
        };
        Ok(rule)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Heading(level) => write!(f, "heading{level}"),
            Self::Paragraph => f.write_str("paragraph"),
            Self::LineBreak => f.write_str("line-break"),
            Self::HorizontalRule => f.write_str("horizontal-rule"),
            Self::Blockquote => f.write_str("blockquote"),
            Self::CodeBlock => f.write_str("code-block"),
            Self::UnorderedList => f.write_str("unordered-list"),
            Self::OrderedList => f.write_str("ordered-list"),
            Self::ListItem => f.write_str("list-item"),
            Self::Table => f.write_str("table"),
            Self::Bold => f.write_str("bold"),
            Self::Italic => f.write_str("italic"),
            Self::Strikethrough => f.write_str("strikethrough"),
            Self::InlineCode => f.write_str("inline-code"),
            Self::Link => f.write_str("link"),
            Self::Image => f.write_str("image"),
        }
    }
}

/// Mapping from lowercase tag name to [`Rule`].
///
/// Tags without an entry fall through to the pass-through policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    rules: HashMap<String, Rule>,
}

impl RuleTable {
    /// Create an empty table.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Table covering the standard HTML tags.
    #[must_use]
    pub fn html() -> Self {
        const HTML_RULES: &[(&str, Rule)] = &[
            ("h1", Rule::Heading(1)),
            ("h2", Rule::Heading(2)),
            ("h3", Rule::Heading(3)),
            ("h4", Rule::Heading(4)),
            ("h5", Rule::Heading(5)),
            ("h6", Rule::Heading(6)),
            ("p", Rule::Paragraph),
            ("br", Rule::LineBreak),
            ("hr", Rule::HorizontalRule),
            ("blockquote", Rule::Blockquote),
            ("pre", Rule::CodeBlock),
            ("ul", Rule::UnorderedList),
            ("ol", Rule::OrderedList),
            ("li", Rule::ListItem),
            ("table", Rule::Table),
            ("strong", Rule::Bold),
            ("b", Rule::Bold),
            ("em", Rule::Italic),
            ("i", Rule::Italic),
            ("del", Rule::Strikethrough),
            ("s", Rule::Strikethrough),
            ("strike", Rule::Strikethrough),
            ("code", Rule::InlineCode),
            ("a", Rule::Link),
            ("img", Rule::Image),
        ];

        let rules = HTML_RULES
            .iter()
            .map(|(tag, rule)| ((*tag).to_owned(), *rule))
            .collect();
        Self { rules }
    }

    /// Add or replace a mapping.
    #[must_use]
    pub fn with_rule(mut self, tag: impl AsRef<str>, rule: Rule) -> Self {
        self.insert(tag, rule);
        self
    }

    /// Add or replace a mapping in place.
    pub fn insert(&mut self, tag: impl AsRef<str>, rule: Rule) {
        self.rules.insert(tag.as_ref().to_ascii_lowercase(), rule);
    }

    /// Add a mapping from a rule name.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownRuleError`] if `rule_name` does not name a rule.
    pub fn insert_named(&mut self, tag: &str, rule_name: &str) -> Result<(), UnknownRuleError> {
        let rule = rule_name.parse()?;
        self.insert(tag, rule);
        Ok(())
    }

    /// Remove a mapping so the tag falls back to pass-through.
    pub fn remove(&mut self, tag: &str) -> Option<Rule> {
        self.rules.remove(&tag.to_ascii_lowercase())
    }

    /// Look up the rule for a lowercase tag.
    #[must_use]
    pub fn get(&self, tag: &str) -> Option<Rule> {
        self.rules.get(tag).copied()
    }

    /// Number of mappings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the table has no mappings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_table_headings() {
        let table = RuleTable::html();
        for level in 1..=6u8 {
            assert_eq!(table.get(&format!("h{level}")), Some(Rule::Heading(level)));
        }
    }

    #[test]
    fn test_html_table_has_no_generic_containers() {
        let table = RuleTable::html();
        assert_eq!(table.get("div"), None);
        assert_eq!(table.get("span"), None);
        assert_eq!(table.get("section"), None);
    }

    #[test]
    fn test_parse_rule_names() {
        assert_eq!("h3".parse::<Rule>(), Ok(Rule::Heading(3)));
        assert_eq!("Unordered_List".parse::<Rule>(), Ok(Rule::UnorderedList));
        assert_eq!("inline-code".parse::<Rule>(), Ok(Rule::InlineCode));
        assert_eq!(
            "marquee".parse::<Rule>(),
            Err(UnknownRuleError("marquee".to_owned()))
        );
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        let rule = Rule::Heading(4);
        assert_eq!(rule.to_string().parse::<Rule>(), Ok(rule));
    }

    #[test]
    fn test_insert_named_lowercases_tag() {
        let mut table = RuleTable::empty();
        table.insert_named("X-Title", "h2").unwrap();
        assert_eq!(table.get("x-title"), Some(Rule::Heading(2)));
    }

    #[test]
    fn test_insert_named_unknown_rule() {
        let mut table = RuleTable::empty();
        assert!(table.insert_named("x", "nope").is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove_falls_back() {
        let mut table = RuleTable::html();
        assert_eq!(table.remove("B"), Some(Rule::Bold));
        assert_eq!(table.get("b"), None);
    }
}

//! Renderer configuration.

use std::collections::HashSet;

use crate::rule::RuleTable;

/// Class marking a non-`code` element as inline code.
const DEFAULT_INLINE_CODE_CLASS: &str = "inline-code";

/// Attributes checked for a code block language.
const DEFAULT_LANGUAGE_ATTRIBUTES: &[&str] = &["data-language", "data-lang"];

/// Placeholder referenced instead of loading spinner images.
const DEFAULT_SPINNER_PLACEHOLDER: &str = "spinner.gif";

/// Image handling policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePolicy {
    /// Decode `data:` image sources into [`CollectedImage`](crate::CollectedImage)s.
    pub extract: bool,
    /// Substrings identifying loading/progress spinner sources.
    pub spinner_patterns: Vec<String>,
    /// Local reference emitted for spinner images.
    pub spinner_placeholder: String,
    /// Prefix prepended to extracted image filenames in references.
    pub reference_prefix: String,
}

impl Default for ImagePolicy {
    fn default() -> Self {
        Self {
            extract: true,
            spinner_patterns: Vec::new(),
            spinner_placeholder: DEFAULT_SPINNER_PLACEHOLDER.to_owned(),
            reference_prefix: String::new(),
        }
    }
}

impl ImagePolicy {
    /// Check if `src` points at a known spinner asset.
    #[must_use]
    pub fn is_spinner(&self, src: &str) -> bool {
        self.spinner_patterns
            .iter()
            .any(|pattern| !pattern.is_empty() && src.contains(pattern.as_str()))
    }
}

/// Configuration for [`MarkdownRenderer`](crate::MarkdownRenderer).
///
/// The transparent set and the rule table describe one source dialect; both
/// are data, so callers tune them per document source instead of per call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Wrapper tags rendered as their concatenated children.
    pub transparent_tags: HashSet<String>,
    /// Tag-to-strategy table.
    pub rules: RuleTable,
    /// Classes marking an element as inline code regardless of its tag.
    pub inline_code_classes: Vec<String>,
    /// Attributes holding a code block language, checked in order.
    pub language_attributes: Vec<String>,
    /// Image handling.
    pub images: ImagePolicy,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            transparent_tags: HashSet::new(),
            rules: RuleTable::html(),
            inline_code_classes: vec![DEFAULT_INLINE_CODE_CLASS.to_owned()],
            language_attributes: DEFAULT_LANGUAGE_ATTRIBUTES
                .iter()
                .map(|attr| (*attr).to_owned())
                .collect(),
            images: ImagePolicy::default(),
        }
    }
}

impl RenderConfig {
    /// Create the default HTML configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add transparent wrapper tags.
    #[must_use]
    pub fn with_transparent_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.transparent_tags
            .extend(tags.into_iter().map(|t| t.as_ref().to_ascii_lowercase()));
        self
    }

    /// Replace the rule table.
    #[must_use]
    pub fn with_rules(mut self, rules: RuleTable) -> Self {
        self.rules = rules;
        self
    }

    /// Replace the inline code marker classes.
    #[must_use]
    pub fn with_inline_code_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inline_code_classes = classes.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the language attributes.
    #[must_use]
    pub fn with_language_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.language_attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable data URI image extraction.
    #[must_use]
    pub fn with_image_extraction(mut self, enabled: bool) -> Self {
        self.images.extract = enabled;
        self
    }

    /// Set spinner source patterns and the placeholder used in their place.
    #[must_use]
    pub fn with_spinner<I, S>(mut self, patterns: I, placeholder: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.images.spinner_patterns = patterns.into_iter().map(Into::into).collect();
        self.images.spinner_placeholder = placeholder.into();
        self
    }

    /// Set the prefix used when referencing extracted images.
    #[must_use]
    pub fn with_image_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.images.reference_prefix = prefix.into();
        self
    }

    /// Check if a tag is transparent.
    #[must_use]
    pub fn is_transparent(&self, tag: &str) -> bool {
        self.transparent_tags.contains(tag)
    }
}

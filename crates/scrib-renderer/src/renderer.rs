//! Recursive tree-to-markdown walk.

use std::fmt::Write;

use crate::config::RenderConfig;
use crate::image::{CollectedImage, DataUri, DataUriError, FilenameAllocator, is_data_uri};
use crate::node::{Element, Node};
use crate::rule::Rule;
use crate::util::{backtick_fence, collapse_newlines, escape_table_cell, join_lines, prefix_lines};

/// Extension assumed for a data URI that cannot be parsed at all.
const UNPARSED_EXTENSION: &str = "png";

/// Result of rendering a tree.
#[derive(Clone, Debug, Default)]
pub struct RenderResult {
    /// Rendered markdown, newline runs collapsed and trimmed.
    pub markdown: String,
    /// Images extracted from data URIs, in document order.
    pub images: Vec<CollectedImage>,
    /// Filenames referenced in the markdown whose data URI failed to decode.
    pub failed_images: Vec<String>,
    /// Warnings generated during rendering.
    pub warnings: Vec<String>,
}

/// Markdown renderer driven by a [`RenderConfig`].
///
/// Every [`render`](Self::render) call starts from fresh state, so one renderer
/// can be shared across independent documents.
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    config: RenderConfig,
}

impl MarkdownRenderer {
    /// Create a renderer with the given configuration.
    #[must_use]
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render a tree to markdown.
    pub fn render(&self, root: &Node) -> RenderResult {
        render(root, &self.config)
    }

    /// Render an optional root; an absent root yields an empty result.
    pub fn render_opt(&self, root: Option<&Node>) -> RenderResult {
        root.map_or_else(RenderResult::default, |node| self.render(node))
    }
}

/// Render a tree with the given configuration.
///
/// Each call owns its filename counter and image list; nothing carries over
/// between calls.
pub fn render(root: &Node, config: &RenderConfig) -> RenderResult {
    let mut walk = Walk::new(config);
    let raw = walk.node(root);
    let markdown = collapse_newlines(&raw);

    tracing::debug!(
        nodes = root.node_count(),
        bytes = markdown.len(),
        images = walk.images.len(),
        failed_images = walk.failed_images.len(),
        "Rendered markdown"
    );

    RenderResult {
        markdown,
        images: walk.images,
        failed_images: walk.failed_images,
        warnings: walk.warnings,
    }
}

/// State for one render call.
struct Walk<'c> {
    config: &'c RenderConfig,
    names: FilenameAllocator,
    images: Vec<CollectedImage>,
    failed_images: Vec<String>,
    warnings: Vec<String>,
}

impl<'c> Walk<'c> {
    fn new(config: &'c RenderConfig) -> Self {
        Self {
            config,
            names: FilenameAllocator::default(),
            images: Vec::new(),
            failed_images: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn node(&mut self, node: &Node) -> String {
        match node {
            Node::Text(text) => text.clone(),
            Node::Element(element) => self.element(element),
        }
    }

    fn children(&mut self, element: &Element) -> String {
        let mut out = String::new();
        for child in &element.children {
            out.push_str(&self.node(child));
        }
        out
    }

    fn element(&mut self, element: &Element) -> String {
        if self.config.is_transparent(&element.tag) {
            return self.children(element);
        }
        match self.rule_for(element) {
            Some(rule) => self.apply(rule, element),
            None => self.children(element),
        }
    }

    fn rule_for(&self, element: &Element) -> Option<Rule> {
        let marked_inline_code = element
            .classes
            .iter()
            .any(|class| self.config.inline_code_classes.contains(class));
        if marked_inline_code {
            return Some(Rule::InlineCode);
        }
        self.config.rules.get(&element.tag)
    }

    fn apply(&mut self, rule: Rule, element: &Element) -> String {
        match rule {
            Rule::Heading(level) => self.heading(level, element),
            Rule::Paragraph => {
                let content = self.children(element);
                let content = content.trim();
                if content.is_empty() {
                    String::new()
                } else {
                    format!("\n\n{content}\n\n")
                }
            }
            Rule::LineBreak => "\n".to_owned(),
            Rule::HorizontalRule => "\n\n---\n\n".to_owned(),
            Rule::Blockquote => self.blockquote(element),
            Rule::CodeBlock => self.code_block(element),
            Rule::UnorderedList => self.list(element, None),
            Rule::OrderedList => {
                let start = element
                    .attr("start")
                    .and_then(|s| s.trim().parse::<i64>().ok())
                    .unwrap_or(1);
                self.list(element, Some(start))
            }
            Rule::ListItem => self.children(element),
            Rule::Table => self.table(element),
            Rule::Bold => self.wrap_non_empty(element, "**"),
            Rule::Italic => self.wrap_non_empty(element, "*"),
            Rule::Strikethrough => {
                let content = self.children(element);
                format!("~~{}~~", content.trim())
            }
            Rule::InlineCode => inline_code(&element.text_content()),
            Rule::Link => {
                let text = self.children(element);
                let text = text.trim();
                let href = element.attr("href").map_or("", str::trim);
                if text.is_empty() || href.is_empty() {
                    text.to_owned()
                } else {
                    format!("[{text}]({href})")
                }
            }
            Rule::Image => self.image(element),
        }
    }

    /// Empty headings emit nothing; multi-line content is joined onto one line.
    fn heading(&mut self, level: u8, element: &Element) -> String {
        let content = join_lines(self.children(element).trim());
        if content.is_empty() {
            return String::new();
        }
        let hashes = "#".repeat(usize::from(level.clamp(1, 6)));
        format!("\n\n{hashes} {content}\n\n")
    }

    fn wrap_non_empty(&mut self, element: &Element, marker: &str) -> String {
        let content = self.children(element);
        let content = content.trim();
        if content.is_empty() {
            String::new()
        } else {
            format!("{marker}{content}{marker}")
        }
    }

    fn blockquote(&mut self, element: &Element) -> String {
        let content = collapse_newlines(&self.children(element));
        if content.is_empty() {
            return String::new();
        }

        let quoted = content
            .lines()
            .map(|line| {
                if line.trim().is_empty() {
                    ">".to_owned()
                } else {
                    format!("> {line}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!("\n\n{quoted}\n\n")
    }

    fn code_block(&self, element: &Element) -> String {
        let language = self.code_language(element).unwrap_or_default();
        let mut text = String::new();
        self.code_text(element, &mut text);
        // A newline right after the opening tag is not part of the content.
        let text = text.strip_prefix('\n').unwrap_or(&text).trim_end();

        let fence = backtick_fence(text, 3);
        format!("\n\n{fence}{language}\n{text}\n{fence}\n\n")
    }

    /// Plain text of a code block: descendant text, with line breaks as newlines.
    fn code_text(&self, element: &Element, out: &mut String) {
        for child in &element.children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Element(el) if self.rule_for(el) == Some(Rule::LineBreak) => out.push('\n'),
                Node::Element(el) => self.code_text(el, out),
            }
        }
    }

    /// Language from a `language-X` class or a language attribute, on the block
    /// itself or its first descendant element carrying one.
    fn code_language(&self, element: &Element) -> Option<String> {
        let from_classes = element
            .classes
            .iter()
            .find_map(|class| class.strip_prefix("language-"))
            .filter(|lang| !lang.is_empty());
        if let Some(lang) = from_classes {
            return Some(lang.to_owned());
        }

        let from_attrs = self
            .config
            .language_attributes
            .iter()
            .filter_map(|attr| element.attr(attr))
            .map(str::trim)
            .find(|lang| !lang.is_empty());
        if let Some(lang) = from_attrs {
            return Some(lang.to_owned());
        }

        element
            .child_elements()
            .find_map(|child| self.code_language(child))
    }

    fn list(&mut self, element: &Element, start: Option<i64>) -> String {
        let mut items = Vec::new();
        self.collect_list_items(element, &mut items);
        if items.is_empty() {
            return self.children(element);
        }

        let mut lines = Vec::with_capacity(items.len());
        let mut number = start.unwrap_or(1);
        for item in items {
            let content = collapse_newlines(&self.children(item));
            if content.is_empty() {
                continue;
            }
            let marker = match start {
                Some(_) => format!("{number}. "),
                None => "- ".to_owned(),
            };
            let indent = " ".repeat(marker.len());
            lines.push(prefix_lines(&content, &marker, &indent));
            number = number.saturating_add(1);
        }

        if lines.is_empty() {
            return String::new();
        }
        format!("\n\n{}\n\n", lines.join("\n"))
    }

    /// List items that are direct children or wrapped only in transparent tags.
    fn collect_list_items<'e>(&self, element: &'e Element, items: &mut Vec<&'e Element>) {
        for child in element.child_elements() {
            if self.config.is_transparent(&child.tag) {
                self.collect_list_items(child, items);
            } else if self.rule_for(child) == Some(Rule::ListItem) {
                items.push(child);
            }
        }
    }

    fn table(&mut self, element: &Element) -> String {
        let mut rows = Vec::new();
        collect_table_rows(element, &mut rows);

        let mut rendered: Vec<Vec<String>> = Vec::with_capacity(rows.len());
        for row in rows {
            let mut cells = Vec::new();
            self.collect_table_cells(row, &mut cells);
            let cells = cells
                .into_iter()
                .map(|cell| {
                    let content = self.children(cell);
                    escape_table_cell(content.trim())
                })
                .collect();
            rendered.push(cells);
        }

        let columns = rendered.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return self.children(element);
        }

        let mut out = String::from("\n\n");
        for (index, cells) in rendered.iter().enumerate() {
            out.push('|');
            for column in 0..columns {
                match cells.get(column).map(String::as_str) {
                    Some(cell) if !cell.is_empty() => write!(out, " {cell} |").unwrap(),
                    _ => out.push_str(" |"),
                }
            }
            out.push('\n');
            if index == 0 {
                out.push('|');
                out.push_str(&" --- |".repeat(columns));
                out.push('\n');
            }
        }
        out.push('\n');
        out
    }

    fn collect_table_cells<'e>(&self, row: &'e Element, cells: &mut Vec<&'e Element>) {
        for child in row.child_elements() {
            if is_cell_tag(&child.tag) {
                cells.push(child);
            } else if self.config.is_transparent(&child.tag) {
                self.collect_table_cells(child, cells);
            }
        }
    }

    fn image(&mut self, element: &Element) -> String {
        let src = element.attr("src").map_or("", str::trim);
        let alt = element.attr("alt").map_or("", str::trim);
        let config = self.config;
        let policy = &config.images;

        if !src.is_empty() && policy.is_spinner(src) {
            return format!("![{alt}]({})", policy.spinner_placeholder);
        }
        if policy.extract && is_data_uri(src) {
            let filename = self.extract_image(src, alt);
            return format!("![{alt}]({}{filename})", policy.reference_prefix);
        }
        if src.is_empty() {
            return String::new();
        }
        format!("![{alt}]({src})")
    }

    /// Decode a data URI image and record it; returns the allocated filename.
    ///
    /// A payload that fails to decode still gets a filename so the reference
    /// stays in the document.
    fn extract_image(&mut self, src: &str, alt: &str) -> String {
        let parsed = DataUri::parse(src);
        let extension = parsed
            .as_ref()
            .map_or_else(|_| UNPARSED_EXTENSION.to_owned(), DataUri::extension);
        let filename = self.names.allocate(alt, &extension);

        let decoded: Result<(String, Vec<u8>), DataUriError> = parsed.and_then(|uri| {
            let data = uri.decode()?;
            Ok((uri.mime_type, data))
        });

        match decoded {
            Ok((mime_type, data)) => {
                self.images.push(CollectedImage {
                    filename: filename.clone(),
                    mime_type,
                    data,
                });
            }
            Err(e) => {
                tracing::warn!(filename = %filename, error = %e, "Failed to decode data URI image");
                self.warnings
                    .push(format!("Image {filename} could not be extracted: {e}"));
                self.failed_images.push(filename.clone());
            }
        }
        filename
    }
}

fn is_cell_tag(tag: &str) -> bool {
    tag == "td" || tag == "th"
}

/// Rows anywhere below the table, not descending into nested tables.
fn collect_table_rows<'e>(element: &'e Element, rows: &mut Vec<&'e Element>) {
    for child in element.child_elements() {
        match child.tag.as_str() {
            "tr" => rows.push(child),
            "table" => {}
            _ => collect_table_rows(child, rows),
        }
    }
}

/// Wrap text in a backtick span long enough to contain it.
fn inline_code(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    let fence = backtick_fence(text, 1);
    if text.starts_with('`') || text.ends_with('`') {
        format!("{fence} {text} {fence}")
    } else {
        format!("{fence}{text}{fence}")
    }
}

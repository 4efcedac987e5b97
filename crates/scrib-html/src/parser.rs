//! Lenient HTML fragment parser producing a [`Node`] snapshot.

use std::sync::LazyLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;
use scrib_renderer::{Element, Node};

use crate::entities::normalize_entities;
use crate::error::ParseError;

/// Tag of the synthetic element wrapping every parsed fragment.
pub const ROOT_TAG: &str = "root";

/// Elements that never have content in HTML.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose whitespace is significant.
const PRESERVE_WHITESPACE: &[&str] = &["pre", "textarea"];

/// Block elements that implicitly close an open `<p>`.
const CLOSES_PARAGRAPH: &[&str] = &[
    "address", "blockquote", "div", "dl", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "ol", "p",
    "pre", "section", "table", "ul",
];

/// Script and style bodies are raw text in HTML and would confuse the reader.
static RAW_TEXT_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
        .expect("invalid raw text element regex")
});

/// A `<` that cannot start a tag is literal text in HTML.
static BARE_LESS_THAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?[^A-Za-z/!?]|/?$)").expect("invalid bare less-than regex"));

/// Parse an HTML fragment into a tree rooted at a synthetic `root` element.
///
/// The parser is lenient in the ways live page markup needs:
/// - void elements (`<br>`, `<img ...>`) need no closing tag
/// - unquoted and valueless attributes are accepted
/// - stray end tags are ignored; an end tag closes every element opened
///   after its matching start tag
/// - a `<` that cannot start a tag is kept as text
/// - comments, doctype and processing instructions are skipped
/// - `<script>` and `<style>` elements are dropped
///
/// Whitespace-only text containing a newline is formatting between elements
/// and is dropped, except inside `<pre>`.
///
/// # Errors
///
/// Returns an error if the markup cannot be tokenized.
pub fn parse_fragment(html: &str) -> Result<Node, ParseError> {
    let stripped = RAW_TEXT_ELEMENT.replace_all(html, "");
    let escaped = BARE_LESS_THAN.replace_all(&stripped, "&lt;${1}");
    let normalized = normalize_entities(&escaped);

    let mut reader = Reader::from_str(&normalized);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut builder = TreeBuilder::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let element = decode_element(&reader, &e);
                builder.close_implied(&element.tag);
                if is_void(&element.tag) {
                    builder.append(element.into());
                } else {
                    builder.open(element);
                }
            }
            Event::Empty(e) => {
                let element = decode_element(&reader, &e);
                builder.close_implied(&element.tag);
                builder.append(element.into());
            }
            Event::End(e) => {
                let tag = decode_name(&reader, e.name().as_ref());
                builder.close(&tag);
            }
            Event::Text(e) => {
                let text = reader.decoder().decode(&e)?;
                builder.text(&text);
            }
            Event::GeneralRef(e) => {
                let entity = reader.decoder().decode(&e)?;
                builder.text(&decode_entity(&entity));
            }
            Event::CData(e) => {
                builder.text(&String::from_utf8_lossy(&e));
            }
            Event::Eof => break,
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
        buf.clear();
    }

    let root = builder.finish();
    tracing::debug!(nodes = root.node_count(), bytes = html.len(), "Parsed HTML fragment");
    Ok(root)
}

/// Stack of open elements; the bottom entry is the synthetic root.
struct TreeBuilder {
    stack: Vec<Element>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self {
            stack: vec![Element::new(ROOT_TAG)],
        }
    }
}

impl TreeBuilder {
    fn open(&mut self, element: Element) {
        self.stack.push(element);
    }

    fn append(&mut self, node: Node) {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(node);
        }
    }

    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let preserve = self
            .stack
            .iter()
            .any(|el| PRESERVE_WHITESPACE.contains(&el.tag.as_str()));
        if !preserve && text.trim().is_empty() && text.contains('\n') {
            return;
        }

        let Some(parent) = self.stack.last_mut() else {
            return;
        };
        // Entity references arrive as separate events; merge adjacent text.
        if let Some(Node::Text(last)) = parent.children.last_mut() {
            last.push_str(text);
        } else {
            parent.children.push(Node::Text(text.to_owned()));
        }
    }

    /// Close elements whose end tag HTML leaves implicit when `tag` opens.
    fn close_implied(&mut self, tag: &str) {
        let (targets, boundaries): (&[&str], &[&str]) = match tag {
            "li" => (&["li"], &["ul", "ol", "menu"]),
            "dt" | "dd" => (&["dt", "dd"], &["dl"]),
            "tr" => (&["tr"], &["table", "thead", "tbody", "tfoot"]),
            "td" | "th" => (&["td", "th"], &["tr", "table"]),
            "thead" | "tbody" | "tfoot" => (&["thead", "tbody", "tfoot"], &["table"]),
            "option" => (&["option"], &["select", "datalist"]),
            t if CLOSES_PARAGRAPH.contains(&t) => {
                if self.stack.last().is_some_and(|el| el.tag == "p") {
                    self.pop();
                }
                return;
            }
            _ => return,
        };

        let nearest = self.stack.iter().rposition(|open| {
            let tag = open.tag.as_str();
            targets.contains(&tag) || boundaries.contains(&tag)
        });
        if let Some(position) = nearest
            && targets.contains(&self.stack[position].tag.as_str())
        {
            while self.stack.len() > position {
                self.pop();
            }
        }
    }

    /// Close the innermost open element named `tag` and everything above it.
    fn close(&mut self, tag: &str) {
        let Some(position) = self
            .stack
            .iter()
            .rposition(|el| el.tag == tag)
            .filter(|&position| position > 0)
        else {
            return;
        };
        while self.stack.len() > position {
            self.pop();
        }
    }

    /// Move the innermost open element into its parent. The root stays open.
    fn pop(&mut self) {
        if self.stack.len() <= 1 {
            return;
        }
        if let Some(element) = self.stack.pop()
            && let Some(parent) = self.stack.last_mut()
        {
            parent.children.push(element.into());
        }
    }

    fn finish(mut self) -> Node {
        while self.stack.len() > 1 {
            self.pop();
        }
        self.stack
            .pop()
            .unwrap_or_else(|| Element::new(ROOT_TAG))
            .into()
    }
}

fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

fn decode_element<R>(reader: &Reader<R>, e: &BytesStart) -> Element {
    let mut element = Element::new(decode_name(reader, e.name().as_ref()));
    for attr in e.html_attributes().flatten() {
        let key = decode_name(reader, attr.key.as_ref());
        let value = attr.unescape_value().map_or_else(
            |_| String::from_utf8_lossy(&attr.value).into_owned(),
            std::borrow::Cow::into_owned,
        );
        element.set_attr(key, value);
    }
    element
}

/// Decode a tag or attribute name, lowercased.
fn decode_name<R>(reader: &Reader<R>, name: &[u8]) -> String {
    reader
        .decoder()
        .decode(name)
        .map_or_else(
            |_| String::from_utf8_lossy(name).into_owned(),
            std::borrow::Cow::into_owned,
        )
        .to_ascii_lowercase()
}

/// Decode an XML entity or numeric character reference name.
fn decode_entity(entity: &str) -> String {
    match entity {
        "lt" => "<".to_owned(),
        "gt" => ">".to_owned(),
        "amp" => "&".to_owned(),
        "apos" => "'".to_owned(),
        "quot" => "\"".to_owned(),
        s if s.starts_with('#') => {
            let code = if let Some(hex) = s.strip_prefix("#x").or_else(|| s.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()
            } else {
                s[1..].parse::<u32>().ok()
            };
            code.and_then(char::from_u32)
                .map_or_else(|| format!("&{entity};"), |c| c.to_string())
        }
        _ => format!("&{entity};"),
    }
}

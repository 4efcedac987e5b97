//! HTML entity normalization ahead of XML parsing.
//!
//! Named HTML entities the XML reader does not know are replaced with their
//! Unicode characters, and bare ampersands are escaped. The five XML entities
//! and numeric references are left for the reader.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// An ampersand, optionally starting a complete character reference.
static AMPERSAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]+;|#[0-9]+;|[a-zA-Z][a-zA-Z0-9]*;)?").expect("invalid ampersand regex"));

/// Entities understood by the XML reader itself.
const XML_ENTITIES: &[&str] = &["amp", "lt", "gt", "quot", "apos"];

/// Named HTML entities, sorted by name for binary search.
const HTML_ENTITIES: &[(&str, char)] = &[
    ("Dagger", '\u{2021}'),
    ("acute", '\u{00b4}'),
    ("bull", '\u{2022}'),
    ("cedil", '\u{00b8}'),
    ("cent", '\u{00a2}'),
    ("check", '\u{2713}'),
    ("copy", '\u{00a9}'),
    ("dagger", '\u{2020}'),
    ("darr", '\u{2193}'),
    ("deg", '\u{00b0}'),
    ("divide", '\u{00f7}'),
    ("emsp", '\u{2003}'),
    ("ensp", '\u{2002}'),
    ("euro", '\u{20ac}'),
    ("frac12", '\u{00bd}'),
    ("frac14", '\u{00bc}'),
    ("frac34", '\u{00be}'),
    ("ge", '\u{2265}'),
    ("harr", '\u{2194}'),
    ("hellip", '\u{2026}'),
    ("iexcl", '\u{00a1}'),
    ("infin", '\u{221e}'),
    ("iquest", '\u{00bf}'),
    ("laquo", '\u{00ab}'),
    ("larr", '\u{2190}'),
    ("ldquo", '\u{201c}'),
    ("le", '\u{2264}'),
    ("lsaquo", '\u{2039}'),
    ("lsquo", '\u{2018}'),
    ("mdash", '\u{2014}'),
    ("micro", '\u{00b5}'),
    ("middot", '\u{00b7}'),
    ("minus", '\u{2212}'),
    ("nbsp", '\u{00a0}'),
    ("ndash", '\u{2013}'),
    ("ne", '\u{2260}'),
    ("ordf", '\u{00aa}'),
    ("ordm", '\u{00ba}'),
    ("para", '\u{00b6}'),
    ("plusmn", '\u{00b1}'),
    ("pound", '\u{00a3}'),
    ("raquo", '\u{00bb}'),
    ("rarr", '\u{2192}'),
    ("rdquo", '\u{201d}'),
    ("reg", '\u{00ae}'),
    ("rsaquo", '\u{203a}'),
    ("rsquo", '\u{2019}'),
    ("sect", '\u{00a7}'),
    ("shy", '\u{00ad}'),
    ("sup1", '\u{00b9}'),
    ("sup2", '\u{00b2}'),
    ("sup3", '\u{00b3}'),
    ("thinsp", '\u{2009}'),
    ("times", '\u{00d7}'),
    ("trade", '\u{2122}'),
    ("uarr", '\u{2191}'),
    ("yen", '\u{00a5}'),
    ("zwj", '\u{200d}'),
    ("zwnj", '\u{200c}'),
];

/// Prepare HTML text for the XML reader.
///
/// Known named entities become characters, unknown named entities and stray
/// ampersands become `&amp;` so they survive as literal text.
pub(crate) fn normalize_entities(html: &str) -> String {
    AMPERSAND
        .replace_all(html, |caps: &Captures| {
            let Some(reference) = caps.get(1).map(|m| m.as_str()) else {
                return "&amp;".to_owned();
            };
            if reference.starts_with('#') {
                return caps[0].to_owned();
            }
            let name = reference.trim_end_matches(';');
            if XML_ENTITIES.contains(&name) {
                return caps[0].to_owned();
            }
            match lookup(name) {
                Some(ch) => ch.to_string(),
                None => format!("&amp;{reference}"),
            }
        })
        .into_owned()
}

fn lookup(name: &str) -> Option<char> {
    HTML_ENTITIES
        .binary_search_by(|(entry, _)| entry.cmp(&name))
        .ok()
        .map(|index| HTML_ENTITIES[index].1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted() {
        assert!(HTML_ENTITIES.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_named_entities_become_characters() {
        assert_eq!(
            normalize_entities("a&nbsp;b&mdash;c &copy;"),
            "a\u{00a0}b\u{2014}c \u{00a9}"
        );
    }

    #[test]
    fn test_xml_entities_preserved() {
        assert_eq!(normalize_entities("&amp;&lt;&gt;&quot;&apos;"), "&amp;&lt;&gt;&quot;&apos;");
    }

    #[test]
    fn test_numeric_references_preserved() {
        assert_eq!(normalize_entities("&#169; &#x2603;"), "&#169; &#x2603;");
    }

    #[test]
    fn test_bare_ampersand_escaped() {
        assert_eq!(normalize_entities("Q&A & more"), "Q&amp;A &amp; more");
        assert_eq!(normalize_entities("a?x=1&y=2"), "a?x=1&amp;y=2");
    }

    #[test]
    fn test_unknown_entity_kept_literal() {
        assert_eq!(normalize_entities("&bogus;"), "&amp;bogus;");
    }
}

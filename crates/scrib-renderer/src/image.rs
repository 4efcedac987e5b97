//! Data URI decoding and extracted image naming.

use std::collections::HashSet;

use base64::Engine;
use base64::prelude::{BASE64_STANDARD, BASE64_STANDARD_NO_PAD};
use percent_encoding::percent_decode_str;

/// MIME type assumed when a data URI does not declare one.
const DEFAULT_MIME_TYPE: &str = "image/png";

/// Extension used when the MIME type gives no usable hint.
const DEFAULT_EXTENSION: &str = "png";

/// Base name for images without usable alt text.
const FALLBACK_BASE_NAME: &str = "image";

/// Longest base name derived from alt text.
const MAX_BASE_NAME_LEN: usize = 64;

/// Image decoded from a data URI during one render call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedImage {
    /// Filename unique within the render call.
    pub filename: String,
    /// MIME type declared by the data URI.
    pub mime_type: String,
    /// Decoded bytes.
    pub data: Vec<u8>,
}

/// Error decoding a data URI payload.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DataUriError {
    /// The `,` separating metadata from payload is missing.
    #[error("data URI has no payload separator")]
    MissingSeparator,

    /// The base64 payload is malformed.
    #[error("invalid base64 payload")]
    Base64(#[from] base64::DecodeError),
}

/// Parsed `data:` URI borrowing its payload from the source attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DataUri<'a> {
    pub(crate) mime_type: String,
    base64: bool,
    payload: &'a str,
}

/// Check if `src` uses the `data:` scheme.
pub(crate) fn is_data_uri(src: &str) -> bool {
    src.get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

impl<'a> DataUri<'a> {
    /// Parse `data:[<mime>][;param]*[;base64],<payload>`.
    ///
    /// The caller checks [`is_data_uri`] first.
    pub(crate) fn parse(src: &'a str) -> Result<Self, DataUriError> {
        let rest = src.get(5..).unwrap_or_default();
        let (meta, payload) = rest
            .split_once(',')
            .ok_or(DataUriError::MissingSeparator)?;

        let mut parts = meta.split(';');
        let mime_type = parts
            .next()
            .map(|m| m.trim().to_ascii_lowercase())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_owned());
        let base64 = parts.any(|p| p.trim().eq_ignore_ascii_case("base64"));

        Ok(Self {
            mime_type,
            base64,
            payload,
        })
    }

    /// Decode the payload bytes.
    pub(crate) fn decode(&self) -> Result<Vec<u8>, DataUriError> {
        let unescaped: Vec<u8> = percent_decode_str(self.payload).collect();
        if !self.base64 {
            return Ok(unescaped);
        }

        let compact: Vec<u8> = unescaped
            .into_iter()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        match BASE64_STANDARD.decode(&compact) {
            Ok(data) => Ok(data),
            Err(_) => Ok(BASE64_STANDARD_NO_PAD.decode(&compact)?),
        }
    }

    /// File extension implied by the MIME type.
    pub(crate) fn extension(&self) -> String {
        extension_for_mime(&self.mime_type)
    }
}

/// Map a MIME type to a file extension, defaulting to `png`.
pub(crate) fn extension_for_mime(mime_type: &str) -> String {
    let subtype = mime_type.split_once('/').map_or("", |(_, sub)| sub.trim());
    match subtype {
        "jpeg" | "pjpeg" => "jpg".to_owned(),
        "svg+xml" => "svg".to_owned(),
        "x-icon" | "vnd.microsoft.icon" => "ico".to_owned(),
        s if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric()) => s.to_owned(),
        _ => DEFAULT_EXTENSION.to_owned(),
    }
}

/// Reduce alt text to `[A-Za-z0-9_-]`, collapsing other runs into `_`.
pub(crate) fn sanitize_base_name(alt: &str) -> String {
    let mut out = String::with_capacity(alt.len().min(MAX_BASE_NAME_LEN));
    let mut pending_separator = false;

    for ch in alt.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.push(ch);
        } else {
            pending_separator = true;
        }
        if out.len() >= MAX_BASE_NAME_LEN {
            break;
        }
    }

    out.truncate(MAX_BASE_NAME_LEN);
    out.trim_matches(|c| c == '_' || c == '-').to_owned()
}

/// Hands out collision-free filenames for one render call.
///
/// Uniqueness is case-insensitive so the names survive case-folding filesystems.
#[derive(Debug, Default)]
pub(crate) struct FilenameAllocator {
    counter: usize,
    used: HashSet<String>,
}

impl FilenameAllocator {
    /// Allocate a filename derived from `alt` with the given extension.
    pub(crate) fn allocate(&mut self, alt: &str, extension: &str) -> String {
        let base = sanitize_base_name(alt);
        let stem = if base.is_empty() {
            FALLBACK_BASE_NAME
        } else {
            base.as_str()
        };

        let mut candidate = if base.is_empty() {
            self.numbered(stem, extension)
        } else {
            format!("{stem}.{extension}")
        };
        while self.used.contains(&candidate.to_ascii_lowercase()) {
            candidate = self.numbered(stem, extension);
        }

        self.used.insert(candidate.to_ascii_lowercase());
        candidate
    }

    fn numbered(&mut self, stem: &str, extension: &str) -> String {
        self.counter += 1;
        format!("{stem}_{}.{extension}", self.counter)
    }
}

//! Error types for HTML parsing.

/// Error while reading HTML markup.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Markup could not be tokenized.
    #[error("HTML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Text could not be decoded.
    #[error("encoding error: {0}")]
    Encoding(#[from] quick_xml::encoding::EncodingError),
}

//! Rule-table driven document tree to Markdown renderer.
//!
//! This crate converts an immutable snapshot of a DOM-like tree ([`Node`])
//! into Markdown. Behavior is data, not code:
//!
//! - [`RuleTable`] maps tag names to a closed set of [`Rule`] strategies
//! - transparent tags (see [`RenderConfig::with_transparent_tags`]) are unwrapped
//! - every other tag passes its children through unchanged
//!
//! Images whose source is a `data:` URI can be decoded into
//! [`CollectedImage`]s with unique filenames, referenced from the Markdown.
//!
//! Rendering never fails: malformed structure degrades to the text it contains.
//!
//! # Example
//!
//! ```
//! use scrib_renderer::{Element, MarkdownRenderer, RenderConfig};
//!
//! let tree = Element::new("div")
//!     .with_child(Element::new("h2").with_text("Notes"))
//!     .with_child(
//!         Element::new("ul")
//!             .with_child(Element::new("li").with_text("first"))
//!             .with_child(Element::new("li").with_text("second")),
//!     );
//!
//! let renderer = MarkdownRenderer::new(RenderConfig::default());
//! let result = renderer.render(&tree.into());
//! assert_eq!(result.markdown, "## Notes\n\n- first\n- second");
//! ```

mod config;
mod image;
mod node;
mod renderer;
mod rule;
mod util;

pub use config::{ImagePolicy, RenderConfig};
pub use image::CollectedImage;
pub use node::{Element, Node};
pub use renderer::{MarkdownRenderer, RenderResult, render};
pub use rule::{Rule, RuleTable, UnknownRuleError};
pub use util::collapse_newlines;

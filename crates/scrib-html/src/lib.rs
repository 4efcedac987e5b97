//! HTML input for the scrib renderer.
//!
//! Turns page markup into the immutable [`Node`](scrib_renderer::Node)
//! snapshot the renderer consumes, and strips presentation chrome from a copy
//! of that snapshot before rendering.
//!
//! # Example
//!
//! ```
//! use scrib_html::{PruneRules, parse_fragment, prune};
//! use scrib_renderer::{RenderConfig, render};
//!
//! let tree = parse_fragment("<p>Hi <b>there</b><button>Copy</button></p>").unwrap();
//! let tree = prune(&tree, &PruneRules::default());
//! assert_eq!(render(&tree, &RenderConfig::default()).markdown, "Hi **there**");
//! ```

mod entities;
mod error;
mod parser;
mod prune;

pub use error::ParseError;
pub use parser::{ROOT_TAG, parse_fragment};
pub use prune::{PruneRules, prune};

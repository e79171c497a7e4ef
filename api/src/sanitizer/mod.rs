//! Template content processing
//!
//! - `html`: cleans untrusted HTML and reports what it changed
//! - `merge`: finds and renders `{{ key }}` / `{{> partial }}` tokens
//! - `word`: converts `.docx` uploads into HTML

pub mod html;
pub mod merge;
pub mod word;

pub use html::{Catalog, SanitizeOptions, SanitizeReport};
pub use merge::RenderContext;

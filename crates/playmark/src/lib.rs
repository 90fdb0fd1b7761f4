//! # playmark
//!
//! Markdown rendering with pluggable code block handlers, built to turn fenced
//! code samples into placeholders that a page later hydrates into live editors.
//!
//! playmark parses markdown documents and renders them to HTML, with support for:
//! - **Interactive fences**: ```` ```py runner Title ```` becomes an
//!   `interactive-code-block` placeholder carrying the language, a runnable flag,
//!   and base64-encoded title and source
//! - **Code blocks**: pluggable handlers keyed by language, with a default handler
//! - **Frontmatter**: `---`/`+++` metadata blocks are captured raw and kept out of the HTML
//!
//! ## Example
//!
//! ```text
//! use playmark::{render, RenderOptions};
//!
//! let markdown = "```js runner Hello\nconsole.log('hi')\n```";
//! let doc = render(markdown, &RenderOptions::interactive()).await?;
//!
//! println!("HTML: {}", doc.html);
//! println!("Blocks: {:?}", doc.blocks);
//! ```

mod fence;
mod handler;
mod placeholder;
mod render;

pub use fence::{
    CodeBlockDescriptor, EXECUTABLE_LANGUAGES, FenceInfo, InteractiveCodeHandler, is_executable,
    normalize_language, parse_fence_info,
};
pub use handler::{BoxedHandler, CodeBlockHandler, RawCodeHandler, fence_language};
pub use placeholder::{PLACEHOLDER_CLASS, extract_placeholders};
pub use render::{Document, RenderOptions, render};

/// Error type for playmark operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Code block handler failed
    #[error("code block handler error for language '{language}': {message}")]
    CodeBlockHandler { language: String, message: String },

    /// A placeholder attribute could not be decoded during hydration
    #[error("invalid placeholder attribute '{attribute}': {message}")]
    Placeholder {
        attribute: &'static str,
        message: String,
    },
}

/// Result type alias for playmark operations.
pub type Result<T> = std::result::Result<T, Error>;

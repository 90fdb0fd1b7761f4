//! Headless live-editor model for playdoc snippets.
//!
//! A session is configured by an ordered list of [`Extension`]s built by
//! [`build_extensions`]: baseline behaviour, language capabilities resolved by
//! the [`ExtensionRegistry`], indentation, autocompletion, a merged [`Theme`],
//! a change listener, key bindings or read-only mode, and a light/dark variant.

mod builder;
mod clipboard;
mod completion;
#[cfg(feature = "highlight")]
mod highlight;
mod registry;
mod session;
mod theme;

pub use builder::{
    AutocompletionConfig, ChangeListener, Command, Extension, Key, KeyBinding, SessionOptions,
    build_extensions, runnable_keymap,
};
pub use clipboard::{Clipboard, MemoryClipboard, SystemClipboard};
pub use completion::{
    CURSOR_MARKER, Completion, CompletionContext, CompletionKind, CompletionResult,
    CompletionSource, javascript_completions, python_completions,
};
#[cfg(feature = "highlight")]
pub use highlight::ArboriumProvider;
pub use registry::{ExtensionRegistry, Grammar, HighlightProvider, KNOWN_GRAMMARS, StaticGrammars};
pub use session::{ActiveCompletion, Anchor, EditorSession, FixedTheme, ThemeProbe};
pub use theme::{StyleValue, Theme, ThemeVariant};

/// Errors from editor operations.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("document is read-only")]
    ReadOnly,

    #[error("position {pos} is outside the document (length {len}) or not on a character boundary")]
    OutOfBounds { pos: usize, len: usize },

    #[error("clipboard write failed: {0}")]
    Clipboard(String),
}

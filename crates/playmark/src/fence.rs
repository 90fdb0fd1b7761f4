//! Interactive fence recognition.
//!
//! A fence info string of the form `<lang> [runner] [title...]` turns the block
//! into a playground placeholder. Only the executable languages honour the
//! `runner` directive; every other language renders read-only.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::Result;
use crate::handler::{BoxedHandler, CodeBlockHandler, RawCodeHandler};

/// Canonical tags of the languages that can be executed in-page.
pub const EXECUTABLE_LANGUAGES: [&str; 2] = ["js", "py"];

static FENCE_INFO_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9_]+)(?:\s+(runner))?(?:\s+(.+))?").expect("fence info regex")
});

/// The parsed parts of a fence info string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenceInfo {
    /// Normalized language tag
    pub language: String,
    /// Whether the `runner` directive was present
    pub runner: bool,
    /// Display title (everything after the language and directive)
    pub title: Option<String>,
}

/// Parse a fence info string.
///
/// Returns `None` when the info string does not start with a word token,
/// in which case the block falls through to the default fence rendering.
pub fn parse_fence_info(info: &str) -> Option<FenceInfo> {
    let caps = FENCE_INFO_REGEX.captures(info.trim())?;
    let language = normalize_language(caps.get(1)?.as_str());

    Some(FenceInfo {
        language: language.to_string(),
        runner: caps.get(2).is_some(),
        title: caps.get(3).map(|m| m.as_str().to_string()),
    })
}

/// Collapse long language names to their canonical short tag.
pub fn normalize_language(tag: &str) -> &str {
    match tag {
        "javascript" => "js",
        "python" => "py",
        "typescript" => "ts",
        other => other,
    }
}

/// Whether a canonical tag names an executable language.
pub fn is_executable(tag: &str) -> bool {
    EXECUTABLE_LANGUAGES.contains(&tag)
}

/// An interactive code block extracted from a fence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlockDescriptor {
    /// Normalized language tag
    pub language: String,
    /// True only for executable languages whose fence carried `runner`
    pub runnable: bool,
    /// Optional display title
    pub title: Option<String>,
    /// Raw source, trimmed
    pub source: String,
}

impl CodeBlockDescriptor {
    /// Build a descriptor from a fence info string and its content.
    pub fn from_fence(info: &str, code: &str) -> Option<Self> {
        let FenceInfo {
            language,
            runner,
            title,
        } = parse_fence_info(info)?;

        let runnable = runner && is_executable(&language);

        Some(Self {
            language,
            runnable,
            title,
            source: code.trim().to_string(),
        })
    }
}

/// Renders interactive fences as hydration placeholders.
///
/// Fences whose info string is not recognised are handed to the fallback
/// handler unchanged.
pub struct InteractiveCodeHandler {
    fallback: BoxedHandler,
}

impl InteractiveCodeHandler {
    /// Create a handler that falls back to plain `<pre><code>` rendering.
    pub fn new() -> Self {
        Self {
            fallback: Arc::new(RawCodeHandler),
        }
    }

    /// Create a handler with a custom fallback for unrecognised fences.
    pub fn with_fallback<H: CodeBlockHandler + 'static>(fallback: H) -> Self {
        Self {
            fallback: Arc::new(fallback),
        }
    }
}

impl Default for InteractiveCodeHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeBlockHandler for InteractiveCodeHandler {
    fn render<'a>(
        &'a self,
        info: &'a str,
        code: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            match CodeBlockDescriptor::from_fence(info, code) {
                Some(descriptor) => {
                    tracing::debug!(
                        language = %descriptor.language,
                        runnable = descriptor.runnable,
                        "emitting playground placeholder"
                    );
                    Ok(descriptor.to_placeholder_html())
                }
                None => self.fallback.render(info, code).await,
            }
        })
    }
}

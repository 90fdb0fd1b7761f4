//! Language capability lookup.

use std::sync::Arc;

use crate::builder::Extension;
use crate::completion::{CompletionSource, javascript_completions, python_completions};

/// A syntax grammar handed out by a [`HighlightProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    /// Grammar name as the provider knows it (e.g. `javascript`)
    pub name: String,
}

impl Grammar {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Supplies syntax-aware editing capabilities per language.
pub trait HighlightProvider: Send + Sync {
    /// The grammar for a full language name, if this provider has one.
    fn grammar(&self, language: &str) -> Option<Grammar>;

    /// Highlight `code` to HTML. `None` means render it as plain text.
    fn highlight(&self, _grammar: &Grammar, _code: &str) -> Option<String> {
        None
    }
}

/// Grammar names known to every provider shipped with this crate.
pub const KNOWN_GRAMMARS: [&str; 6] = ["javascript", "typescript", "python", "html", "css", "json"];

/// A provider that recognises the known grammars but does not highlight.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticGrammars;

impl HighlightProvider for StaticGrammars {
    fn grammar(&self, language: &str) -> Option<Grammar> {
        KNOWN_GRAMMARS
            .contains(&language)
            .then(|| Grammar::new(language))
    }
}

/// Resolves language tags to capability sets.
#[derive(Clone)]
pub struct ExtensionRegistry {
    provider: Arc<dyn HighlightProvider>,
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::new(StaticGrammars)
    }
}

impl ExtensionRegistry {
    pub fn new<P: HighlightProvider + 'static>(provider: P) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }

    pub fn provider(&self) -> &dyn HighlightProvider {
        self.provider.as_ref()
    }

    /// Capabilities for `tag`, or `None` when the tag is unsupported or the
    /// provider has no grammar for it.
    pub fn resolve(&self, tag: &str) -> Option<Vec<Extension>> {
        let (grammar, completions): (&str, Option<CompletionSource>) = match tag {
            "js" | "javascript" => ("javascript", Some(javascript_completions)),
            "ts" | "typescript" => ("typescript", Some(javascript_completions)),
            "py" | "python" => ("python", Some(python_completions)),
            "html" | "css" | "json" => (tag, None),
            _ => return None,
        };

        let Some(grammar) = self.provider.grammar(grammar) else {
            tracing::warn!(tag, "language support not available");
            return None;
        };

        let mut extensions = vec![Extension::Language(grammar)];
        if let Some(source) = completions {
            extensions.push(Extension::Completions(source));
        }
        Some(extensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executable_languages_get_completions() {
        let registry = ExtensionRegistry::default();

        for tag in ["js", "javascript", "ts", "py", "python"] {
            let exts = registry.resolve(tag).unwrap();
            assert_eq!(exts.len(), 2, "{tag}");
            assert!(matches!(exts[0], Extension::Language(_)));
            assert!(matches!(exts[1], Extension::Completions(_)));
        }
    }

    #[test]
    fn test_typescript_uses_typescript_grammar() {
        let exts = ExtensionRegistry::default().resolve("ts").unwrap();
        match &exts[0] {
            Extension::Language(g) => assert_eq!(g.name, "typescript"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_markup_languages_get_grammar_only() {
        let registry = ExtensionRegistry::default();
        for tag in ["html", "css", "json"] {
            let exts = registry.resolve(tag).unwrap();
            assert_eq!(exts.len(), 1);
        }
    }

    #[test]
    fn test_unsupported_tag_resolves_to_none() {
        let registry = ExtensionRegistry::default();
        assert!(registry.resolve("rust").is_none());
        assert!(registry.resolve("").is_none());
    }

    #[test]
    fn test_provider_without_grammar_degrades() {
        struct PythonOnly;
        impl HighlightProvider for PythonOnly {
            fn grammar(&self, language: &str) -> Option<Grammar> {
                (language == "python").then(|| Grammar::new("python"))
            }
        }

        let registry = ExtensionRegistry::new(PythonOnly);
        assert!(registry.resolve("py").is_some());
        assert!(registry.resolve("js").is_none());
    }
}

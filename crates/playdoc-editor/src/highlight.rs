//! Tree-sitter highlighting via arborium.

use crate::registry::{Grammar, HighlightProvider, KNOWN_GRAMMARS};

/// Highlights editor contents with arborium.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArboriumProvider;

impl HighlightProvider for ArboriumProvider {
    fn grammar(&self, language: &str) -> Option<Grammar> {
        KNOWN_GRAMMARS
            .contains(&language)
            .then(|| Grammar::new(language))
    }

    fn highlight(&self, grammar: &Grammar, code: &str) -> Option<String> {
        // tree-sitter has edge-case panics; fall back to plain text on those
        let result = std::panic::catch_unwind(|| {
            let mut highlighter = arborium::Highlighter::new();
            highlighter.highlight(&grammar.name, code)
        });

        match result {
            Ok(Ok(html)) => Some(html),
            Ok(Err(_)) => {
                tracing::debug!(grammar = %grammar.name, "highlighting failed");
                None
            }
            Err(_) => {
                tracing::warn!(grammar = %grammar.name, "highlighter panicked");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlights_known_grammar() {
        let provider = ArboriumProvider;
        let grammar = provider.grammar("python").unwrap();
        let html = provider.highlight(&grammar, "print(1)").unwrap();
        assert!(html.contains("print"));
    }

    #[test]
    fn test_unknown_grammar() {
        assert!(ArboriumProvider.grammar("cobol").is_none());
    }
}

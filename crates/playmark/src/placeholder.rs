//! Placeholder markup emitted for interactive blocks, and its decoding.
//!
//! The title and source travel base64-encoded so that quotes, angle brackets
//! and multi-byte characters can never break out of the attribute.

use std::sync::LazyLock;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;

use crate::fence::CodeBlockDescriptor;
use crate::{Error, Result};

/// CSS class carried by every placeholder element.
pub const PLACEHOLDER_CLASS: &str = "interactive-code-block";

static PLACEHOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"<div class="interactive-code-block" data-lang="([^"]*)" data-title="([^"]*)" data-code="([^"]*)" data-runnable="([^"]*)"></div>"#,
    )
    .expect("placeholder regex")
});

impl CodeBlockDescriptor {
    /// Render this block as a placeholder element for later hydration.
    pub fn to_placeholder_html(&self) -> String {
        let encoded_title = self
            .title
            .as_deref()
            .map(|t| STANDARD.encode(t.as_bytes()))
            .unwrap_or_default();
        let encoded_code = STANDARD.encode(self.source.as_bytes());

        format!(
            "<div class=\"{}\" data-lang=\"{}\" data-title=\"{}\" data-code=\"{}\" data-runnable=\"{}\"></div>\n",
            PLACEHOLDER_CLASS, self.language, encoded_title, encoded_code, self.runnable
        )
    }

    /// Rebuild a block from the raw attribute values of a placeholder.
    ///
    /// An empty title attribute means "no title".
    pub fn from_placeholder_attributes(
        language: &str,
        title: &str,
        code: &str,
        runnable: &str,
    ) -> Result<Self> {
        let title = if title.is_empty() {
            None
        } else {
            Some(decode_attribute("data-title", title)?)
        };
        let source = decode_attribute("data-code", code)?;
        let runnable = match runnable {
            "true" => true,
            "false" => false,
            other => {
                return Err(Error::Placeholder {
                    attribute: "data-runnable",
                    message: format!("expected \"true\" or \"false\", got {other:?}"),
                });
            }
        };

        Ok(Self {
            language: language.to_string(),
            runnable,
            title,
            source,
        })
    }
}

fn decode_attribute(attribute: &'static str, value: &str) -> Result<String> {
    let bytes = STANDARD.decode(value).map_err(|e| Error::Placeholder {
        attribute,
        message: e.to_string(),
    })?;
    String::from_utf8(bytes).map_err(|e| Error::Placeholder {
        attribute,
        message: e.to_string(),
    })
}

/// Find and decode every placeholder in rendered HTML, in document order.
pub fn extract_placeholders(html: &str) -> Result<Vec<CodeBlockDescriptor>> {
    PLACEHOLDER_REGEX
        .captures_iter(html)
        .map(|caps| {
            CodeBlockDescriptor::from_placeholder_attributes(
                &caps[1], &caps[2], &caps[3], &caps[4],
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(title: Option<&str>, source: &str) -> CodeBlockDescriptor {
        CodeBlockDescriptor {
            language: "py".to_string(),
            runnable: true,
            title: title.map(str::to_string),
            source: source.to_string(),
        }
    }

    #[test]
    fn test_payload_survives_hostile_characters() {
        let original = block(
            Some("\"Quotes\" & <tags> — 日本語"),
            "print(\"</div><script>alert('x')</script>\")\nprint('héllo ✓')",
        );
        let html = original.to_placeholder_html();

        assert!(!html.contains("<script>"));
        let decoded = extract_placeholders(&html).unwrap();
        assert_eq!(decoded, vec![original]);
    }

    #[test]
    fn test_missing_title_is_none() {
        let html = block(None, "x = 1").to_placeholder_html();
        assert!(html.contains("data-title=\"\""));

        let decoded = extract_placeholders(&html).unwrap();
        assert_eq!(decoded[0].title, None);
    }

    #[test]
    fn test_invalid_base64_is_reported() {
        let err = CodeBlockDescriptor::from_placeholder_attributes("js", "", "!!!", "true")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Placeholder {
                attribute: "data-code",
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_runnable_flag_is_reported() {
        let err = CodeBlockDescriptor::from_placeholder_attributes("js", "", "", "yes")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Placeholder {
                attribute: "data-runnable",
                ..
            }
        ));
    }

    #[test]
    fn test_extracts_in_document_order() {
        let first = block(Some("one"), "a");
        let second = CodeBlockDescriptor {
            language: "html".to_string(),
            runnable: false,
            title: None,
            source: "<p>b</p>".to_string(),
        };
        let html = format!(
            "<p>intro</p>{}<p>middle</p>{}",
            first.to_placeholder_html(),
            second.to_placeholder_html()
        );

        assert_eq!(extract_placeholders(&html).unwrap(), vec![first, second]);
    }
}

//! Pluggable rendering of fenced code blocks.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::Result;

/// Renders one code block to HTML.
///
/// Handlers see the whole fence info string, so directives after the
/// language token (`runner`, a title) reach them intact.
///
/// ```rust,ignore
/// struct Shouting;
///
/// impl CodeBlockHandler for Shouting {
///     fn render<'a>(
///         &'a self,
///         _info: &'a str,
///         code: &'a str,
///     ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
///         Box::pin(async move { Ok(format!("<pre>{}</pre>", code.to_uppercase())) })
///     }
/// }
/// ```
pub trait CodeBlockHandler: Send + Sync {
    /// `info` is the full info string (`py runner Lists`), `code` the raw body.
    fn render<'a>(
        &'a self,
        info: &'a str,
        code: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;
}

/// A shared, type-erased handler.
pub type BoxedHandler = Arc<dyn CodeBlockHandler>;

/// The language token of a fence info string (its first whitespace-separated word).
pub fn fence_language(info: &str) -> &str {
    info.split_whitespace().next().unwrap_or("")
}

/// Stock fence rendering: escaped code in `<pre><code class="language-x">`.
pub struct RawCodeHandler;

impl CodeBlockHandler for RawCodeHandler {
    fn render<'a>(
        &'a self,
        info: &'a str,
        code: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let code = html_escape::encode_text(code);
            Ok(match fence_language(info) {
                "" => format!("<pre><code>{code}</code></pre>\n"),
                language => format!(
                    "<pre><code class=\"language-{}\">{code}</code></pre>\n",
                    html_escape::encode_double_quoted_attribute(language)
                ),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fence_language() {
        assert_eq!(fence_language("py runner Title"), "py");
        assert_eq!(fence_language("  rust  "), "rust");
        assert_eq!(fence_language(""), "");
    }

    #[tokio::test]
    async fn test_raw_code_handler() {
        let result = RawCodeHandler
            .render("rust ignore", "fn main() {}")
            .await
            .unwrap();
        assert_eq!(
            result,
            "<pre><code class=\"language-rust\">fn main() {}</code></pre>\n"
        );
    }

    #[tokio::test]
    async fn test_raw_code_handler_escapes_html() {
        let result = RawCodeHandler
            .render("html", "<div>a & b</div>")
            .await
            .unwrap();
        assert!(result.contains("&lt;div&gt;a &amp; b&lt;/div&gt;"));
    }
}

//! Main rendering pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use crate::Result;
use crate::fence::{CodeBlockDescriptor, InteractiveCodeHandler};
use crate::handler::{BoxedHandler, CodeBlockHandler, RawCodeHandler, fence_language};
use crate::placeholder::extract_placeholders;

/// Options for rendering markdown.
#[derive(Default)]
pub struct RenderOptions {
    /// Code block handlers keyed by language
    pub code_handlers: HashMap<String, BoxedHandler>,

    /// Default handler for languages without a specific handler
    pub default_handler: Option<BoxedHandler>,
}

impl RenderOptions {
    /// Create new render options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that render every recognised fence as a playground placeholder.
    pub fn interactive() -> Self {
        Self::new().with_default_handler(InteractiveCodeHandler::new())
    }

    /// Register a handler for a specific language.
    pub fn with_handler<H: CodeBlockHandler + 'static>(
        mut self,
        language: &str,
        handler: H,
    ) -> Self {
        self.code_handlers
            .insert(language.to_string(), Arc::new(handler));
        self
    }

    /// Set the default handler for unregistered languages.
    pub fn with_default_handler<H: CodeBlockHandler + 'static>(mut self, handler: H) -> Self {
        self.default_handler = Some(Arc::new(handler));
        self
    }
}

/// A rendered markdown document.
#[derive(Debug, Clone)]
pub struct Document {
    /// Raw metadata content (without delimiters)
    pub raw_metadata: Option<String>,

    /// Rendered HTML content
    pub html: String,

    /// Blocks emitted as playground placeholders, in document order.
    ///
    /// Fences a handler rendered some other way are not listed.
    pub blocks: Vec<CodeBlockDescriptor>,
}

/// Render markdown to HTML.
///
/// # Example
///
/// ```rust,ignore
/// use playmark::{render, RenderOptions};
///
/// let markdown = "# Lists\n\n```py runner\nprint([1, 2])\n```\n";
///
/// let doc = render(markdown, &RenderOptions::interactive()).await?;
/// assert_eq!(doc.blocks.len(), 1);
/// ```
pub async fn render(markdown: &str, options: &RenderOptions) -> Result<Document> {
    let (segments, raw_metadata) = split_segments(markdown);

    let fallback: BoxedHandler = Arc::new(RawCodeHandler);
    let mut html = String::new();
    let mut blocks = Vec::new();

    for segment in segments {
        match segment {
            Segment::Markup(events) => {
                pulldown_cmark::html::push_html(&mut html, events.into_iter());
            }
            Segment::Fence { info, code } => {
                let handler = options
                    .code_handlers
                    .get(fence_language(&info))
                    .or(options.default_handler.as_ref())
                    .unwrap_or(&fallback);
                let rendered = handler.render(&info, &code).await?;
                blocks.extend(extract_placeholders(&rendered)?);
                html.push_str(&rendered);
            }
        }
    }

    tracing::debug!(
        blocks = blocks.len(),
        runnable = blocks.iter().filter(|b| b.runnable).count(),
        "rendered markdown"
    );

    Ok(Document {
        raw_metadata,
        html,
        blocks,
    })
}

/// A run of ordinary markdown, or one code block lifted out of it.
enum Segment<'a> {
    Markup(Vec<Event<'a>>),
    Fence { info: String, code: String },
}

const PARSER_OPTIONS: Options = Options::ENABLE_TABLES
    .union(Options::ENABLE_FOOTNOTES)
    .union(Options::ENABLE_STRIKETHROUGH)
    .union(Options::ENABLE_HEADING_ATTRIBUTES)
    .union(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS)
    .union(Options::ENABLE_PLUSES_DELIMITED_METADATA_BLOCKS);

/// Lift code blocks out of the event stream and capture front matter.
fn split_segments(markdown: &str) -> (Vec<Segment<'_>>, Option<String>) {
    let mut segments = Vec::new();
    let mut markup = Vec::new();
    let mut fence: Option<(String, String)> = None;
    let mut raw_metadata = None;
    let mut in_metadata = false;

    for event in Parser::new_ext(markdown, PARSER_OPTIONS) {
        match event {
            Event::Start(Tag::MetadataBlock(_)) => in_metadata = true,
            Event::End(TagEnd::MetadataBlock(_)) => in_metadata = false,
            Event::Text(text) if in_metadata => raw_metadata = Some(text.to_string()),
            Event::Start(Tag::CodeBlock(kind)) => {
                let info = match kind {
                    CodeBlockKind::Fenced(info) => info.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                fence = Some((info, String::new()));
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((info, code)) = fence.take() {
                    if !markup.is_empty() {
                        segments.push(Segment::Markup(std::mem::take(&mut markup)));
                    }
                    segments.push(Segment::Fence { info, code });
                }
            }
            Event::Text(text) if fence.is_some() => {
                if let Some((_, code)) = fence.as_mut() {
                    code.push_str(&text);
                }
            }
            event => markup.push(event),
        }
    }

    if !markup.is_empty() {
        segments.push(Segment::Markup(markup));
    }
    (segments, raw_metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_render_simple() {
        let md = "# Hello\n\nWorld.";
        let doc = render(md, &RenderOptions::default()).await.unwrap();

        assert!(doc.html.contains("<h1"));
        assert!(doc.html.contains("Hello"));
        assert!(doc.html.contains("World"));
        assert!(doc.blocks.is_empty());
    }

    #[tokio::test]
    async fn test_render_code_block_default() {
        let md = "```rust\nfn main() {}\n```\n";
        let doc = render(md, &RenderOptions::default()).await.unwrap();

        assert!(doc.html.contains("<pre><code class=\"language-rust\">"));
        assert!(doc.html.contains("fn main()"));
    }

    #[tokio::test]
    async fn test_plain_rendering_lists_no_blocks() {
        let md = "```py runner\nprint(1)\n```\n";
        let doc = render(md, &RenderOptions::default()).await.unwrap();

        assert!(doc.html.contains("<pre><code class=\"language-py\">"));
        assert!(doc.blocks.is_empty());
        assert!(extract_placeholders(&doc.html).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_render_interactive_blocks() {
        let md = "# Lists\n\n```python runner Appending\nxs = [1]\nxs.append(2)\nprint(xs)\n```\n\n```html runner\n<p>hi</p>\n```\n";
        let doc = render(md, &RenderOptions::interactive()).await.unwrap();

        assert_eq!(doc.blocks.len(), 2);
        assert_eq!(doc.blocks[0].language, "py");
        assert!(doc.blocks[0].runnable);
        assert_eq!(doc.blocks[0].title.as_deref(), Some("Appending"));
        assert_eq!(doc.blocks[0].source, "xs = [1]\nxs.append(2)\nprint(xs)");
        assert_eq!(doc.blocks[1].language, "html");
        assert!(!doc.blocks[1].runnable);

        // The raw source never reaches the HTML
        assert!(!doc.html.contains("xs.append"));
        assert!(!doc.html.contains("<p>hi</p>"));
        assert_eq!(extract_placeholders(&doc.html).unwrap(), doc.blocks);
    }

    #[tokio::test]
    async fn test_indented_code_falls_through() {
        let md = "Para.\n\n    indented code\n";
        let doc = render(md, &RenderOptions::interactive()).await.unwrap();

        assert!(doc.blocks.is_empty());
        assert!(doc.html.contains("<pre><code>indented code"));
    }

    #[tokio::test]
    async fn test_frontmatter_is_captured_not_rendered() {
        let md = "---\ntitle: Loops\n---\n# Loops\n";
        let doc = render(md, &RenderOptions::interactive()).await.unwrap();

        assert_eq!(doc.raw_metadata.as_deref().map(str::trim), Some("title: Loops"));
        assert!(!doc.html.contains("title: Loops"));
    }

    #[tokio::test]
    async fn test_language_specific_handler_wins() {
        use std::future::Future;
        use std::pin::Pin;

        struct MermaidHandler;

        impl CodeBlockHandler for MermaidHandler {
            fn render<'a>(
                &'a self,
                _info: &'a str,
                code: &'a str,
            ) -> Pin<Box<dyn Future<Output = crate::Result<String>> + Send + 'a>> {
                Box::pin(async move { Ok(format!("<pre class=\"mermaid\">{}</pre>", code.trim())) })
            }
        }

        let md = "```mermaid\ngraph TD\n```\n\n```js\n1\n```\n";
        let opts = RenderOptions::interactive().with_handler("mermaid", MermaidHandler);
        let doc = render(md, &opts).await.unwrap();

        assert!(doc.html.contains("<pre class=\"mermaid\">graph TD</pre>"));
        assert!(doc.html.contains("data-lang=\"js\""));

        // Only the block that became a placeholder is listed
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.blocks[0].language, "js");
        assert_eq!(extract_placeholders(&doc.html).unwrap(), doc.blocks);
    }
}

//! Hydration of placeholders into live snippets.
//!
//! A [`Snippet`] pairs one editor session with one executor. Sessions for
//! different snippets share nothing except the process-wide Python loader.

use std::sync::Arc;

use playdoc_config::{EditorSettings, RuntimeSettings};
use playdoc_editor::{
    Anchor, Clipboard, EditorSession, ExtensionRegistry, FixedTheme, SessionOptions, ThemeProbe,
};
use playdoc_runtime::{Executor, PythonAsset, RuntimeLoader, ScriptLanguage, python_loader};
use playmark::{CodeBlockDescriptor, extract_placeholders};

use crate::config::ResolvedConfig;

/// Everything needed to turn descriptors into live snippets.
pub struct HydrationContext {
    registry: ExtensionRegistry,
    editor: EditorSettings,
    runtime: RuntimeSettings,
    python: Arc<RuntimeLoader<PythonAsset>>,
    probe: Box<dyn ThemeProbe>,
}

impl HydrationContext {
    /// A context backed by the process-wide Python loader.
    pub fn new(config: &ResolvedConfig) -> Self {
        Self {
            registry: default_registry(),
            editor: config.editor.clone(),
            runtime: config.runtime.clone(),
            python: python_loader(&config.runtime),
            probe: Box::new(FixedTheme(false)),
        }
    }

    pub fn with_registry(mut self, registry: ExtensionRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_probe(mut self, probe: impl ThemeProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    /// Use a dedicated Python loader instead of the shared one.
    pub fn with_python_loader(mut self, python: Arc<RuntimeLoader<PythonAsset>>) -> Self {
        self.python = python;
        self
    }

    pub fn probe(&self) -> &dyn ThemeProbe {
        self.probe.as_ref()
    }

    pub fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn open_session(
        &self,
        anchor: Anchor,
        language: &str,
        runnable: bool,
        text: String,
    ) -> EditorSession {
        let options = SessionOptions::new(language, runnable).with_settings(&self.editor);
        EditorSession::create(anchor, self.registry.clone(), options, text, self.probe())
    }
}

#[cfg(feature = "highlight")]
fn default_registry() -> ExtensionRegistry {
    ExtensionRegistry::new(playdoc_editor::ArboriumProvider)
}

#[cfg(not(feature = "highlight"))]
fn default_registry() -> ExtensionRegistry {
    ExtensionRegistry::default()
}

/// One hydrated code block.
pub struct Snippet {
    descriptor: CodeBlockDescriptor,
    language: Option<ScriptLanguage>,
    session: EditorSession,
    executor: Executor,
    copy_success: bool,
}

impl Snippet {
    /// Mount a live editor for `descriptor` at `anchor`.
    ///
    /// Blocks in a language execution is disabled for are mounted read-only.
    pub fn hydrate(
        descriptor: CodeBlockDescriptor,
        anchor: Anchor,
        ctx: &HydrationContext,
    ) -> Self {
        let language = ScriptLanguage::from_tag(&descriptor.language)
            .filter(|lang| descriptor.runnable && ctx.runtime.is_enabled(lang.tag()));

        if descriptor.runnable && language.is_none() {
            tracing::info!(
                anchor = %anchor,
                language = %descriptor.language,
                "execution disabled for language, mounting read-only"
            );
        }

        let session = ctx.open_session(
            anchor,
            &descriptor.language,
            language.is_some(),
            descriptor.source.clone(),
        );

        Self {
            descriptor,
            language,
            session,
            executor: Executor::new(ctx.python.clone()),
            copy_success: false,
        }
    }

    pub fn descriptor(&self) -> &CodeBlockDescriptor {
        &self.descriptor
    }

    pub fn title(&self) -> Option<&str> {
        self.descriptor.title.as_deref()
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EditorSession {
        &mut self.session
    }

    pub fn is_runnable(&self) -> bool {
        self.language.is_some()
    }

    /// Execute the editor's current text.
    ///
    /// Python snippets wait for the runtime first. Returns whether a run was
    /// dispatched; a dropped request leaves the previous output in place.
    pub async fn run(&self) -> bool {
        let Some(language) = self.language else {
            return false;
        };
        if !self.executor.prepare(language).await {
            return false;
        }
        self.executor.run(language, self.session.content()).await
    }

    /// Copy the editor's current text.
    pub fn copy(&mut self, clipboard: &dyn Clipboard) -> bool {
        self.copy_success = self.session.copy_to(clipboard);
        self.copy_success
    }

    /// Whether the last copy succeeded and has not been acknowledged yet.
    pub fn copy_success(&self) -> bool {
        self.copy_success
    }

    pub fn acknowledge_copy(&mut self) {
        self.copy_success = false;
    }

    /// Output of the last run.
    pub fn output(&self) -> String {
        self.executor.output()
    }

    pub fn has_error(&self) -> bool {
        self.executor.has_error()
    }

    pub fn is_running(&self) -> bool {
        self.executor.is_running()
    }

    /// Run button label, `None` for blocks that cannot run.
    pub fn run_label(&self) -> Option<&'static str> {
        self.language.map(|lang| self.executor.run_label(lang))
    }

    /// The page theme changed: rebuild the editor keeping its text.
    pub fn handle_theme_change(&mut self, ctx: &HydrationContext) {
        self.session.handle_theme_change(ctx.probe());
    }

    /// Replace the editor session, keeping its text. The old session is torn
    /// down, so an anchor never holds two editors.
    pub fn remount(&mut self, ctx: &HydrationContext) {
        let fresh = ctx.open_session(
            self.session.anchor().clone(),
            &self.descriptor.language,
            self.language.is_some(),
            self.session.content().to_string(),
        );
        let old = std::mem::replace(&mut self.session, fresh);
        old.destroy();
    }

    /// Tear the snippet down and release its anchor.
    pub fn unmount(self) -> Anchor {
        self.session.destroy()
    }

    /// Editor, controls and output as one HTML fragment.
    pub fn render_html(&self) -> String {
        let mut html = String::from("<div class=\"playdoc-snippet\">");
        if let Some(title) = self.title() {
            html.push_str(&format!(
                "<div class=\"playdoc-title\">{}</div>",
                html_escape::encode_text(title)
            ));
        }
        html.push_str(&self.session.render_html());
        if let Some(label) = self.run_label() {
            html.push_str(&format!("<button class=\"playdoc-run\">{label}</button>"));
            let output = self.output();
            if !output.is_empty() {
                let class = if self.has_error() {
                    "playdoc-output error"
                } else {
                    "playdoc-output"
                };
                html.push_str(&format!(
                    "<pre class=\"{class}\">{}</pre>",
                    html_escape::encode_text(&output)
                ));
            }
        }
        html.push_str("</div>");
        html
    }
}

/// Every snippet of one rendered page, in document order.
pub struct Page {
    snippets: Vec<Snippet>,
}

impl Page {
    /// Hydrate every placeholder in `html`. Anchors are `snippet-<n>`.
    pub fn hydrate(html: &str, ctx: &HydrationContext) -> playmark::Result<Self> {
        let snippets: Vec<Snippet> = extract_placeholders(html)?
            .into_iter()
            .enumerate()
            .map(|(i, descriptor)| {
                Snippet::hydrate(descriptor, Anchor::new(format!("snippet-{i}")), ctx)
            })
            .collect();

        tracing::debug!(count = snippets.len(), "page hydrated");
        Ok(Self { snippets })
    }

    pub fn snippets(&self) -> &[Snippet] {
        &self.snippets
    }

    pub fn snippets_mut(&mut self) -> &mut [Snippet] {
        &mut self.snippets
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    pub fn handle_theme_change(&mut self, ctx: &HydrationContext) {
        for snippet in &mut self.snippets {
            snippet.handle_theme_change(ctx);
        }
    }

    /// Tear down every snippet, returning the released anchors.
    pub fn unmount(self) -> Vec<Anchor> {
        self.snippets.into_iter().map(Snippet::unmount).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use playdoc_editor::{Extension, MemoryClipboard};

    use super::*;

    fn ctx() -> HydrationContext {
        HydrationContext::new(&ResolvedConfig::default())
            .with_registry(ExtensionRegistry::default())
            .with_python_loader(Arc::new(RuntimeLoader::new(PythonAsset::new(
                "python3",
                Duration::from_secs(30),
            ))))
    }

    fn descriptor(language: &str, runnable: bool, source: &str) -> CodeBlockDescriptor {
        CodeBlockDescriptor {
            language: language.to_string(),
            runnable,
            title: Some("Example".to_string()),
            source: source.to_string(),
        }
    }

    #[tokio::test]
    async fn test_runnable_snippet_is_editable_and_runs() {
        let ctx = ctx();
        let mut snippet =
            Snippet::hydrate(descriptor("js", true, "1 + 2"), Anchor::new("a"), &ctx);

        assert!(snippet.is_runnable());
        assert!(!snippet.session().is_read_only());
        assert_eq!(snippet.run_label(), Some("Run"));

        assert!(snippet.run().await);
        assert_eq!(snippet.output(), "3");

        // Runs read the live text, not the fenced source
        let end = snippet.session().content().len();
        snippet.session_mut().set_cursor(end).unwrap();
        snippet.session_mut().insert_text(" + 4").unwrap();
        assert!(snippet.run().await);
        assert_eq!(snippet.output(), "7");
    }

    #[tokio::test]
    async fn test_passive_snippet_is_read_only() {
        let ctx = ctx();
        let snippet = Snippet::hydrate(
            descriptor("html", false, "<p>hi</p>"),
            Anchor::new("a"),
            &ctx,
        );

        assert!(!snippet.is_runnable());
        assert!(snippet.session().is_read_only());
        assert!(
            snippet
                .session()
                .extensions()
                .iter()
                .any(|e| matches!(e, Extension::ReadOnly))
        );
        assert_eq!(snippet.run_label(), None);
        assert!(!snippet.run().await);
    }

    #[tokio::test]
    async fn test_disabled_language_mounts_read_only() {
        let mut config = ResolvedConfig::default();
        config.runtime.enabled_languages = vec!["py".to_string()];
        let ctx = HydrationContext::new(&config).with_registry(ExtensionRegistry::default());

        let snippet = Snippet::hydrate(descriptor("js", true, "1"), Anchor::new("a"), &ctx);
        assert!(!snippet.is_runnable());
        assert!(snippet.session().is_read_only());
    }

    #[test]
    fn test_copy_sets_transient_flag() {
        let ctx = ctx();
        let mut snippet =
            Snippet::hydrate(descriptor("py", true, "print(1)"), Anchor::new("a"), &ctx);
        let clipboard = MemoryClipboard::new();

        assert!(snippet.copy(&clipboard));
        assert!(snippet.copy_success());
        assert_eq!(clipboard.contents().as_deref(), Some("print(1)"));

        snippet.acknowledge_copy();
        assert!(!snippet.copy_success());
    }

    #[test]
    fn test_remount_replaces_session() {
        let ctx = ctx();
        let mut snippet = Snippet::hydrate(descriptor("js", true, "x"), Anchor::new("a"), &ctx);
        snippet.session_mut().set_cursor(1).unwrap();
        snippet.session_mut().insert_text("y").unwrap();

        snippet.remount(&ctx);
        assert_eq!(snippet.session().content(), "xy");
        assert_eq!(snippet.session().revision(), 0);
        assert_eq!(snippet.unmount(), Anchor::new("a"));
    }

    #[test]
    fn test_theme_change_follows_probe() {
        let ctx = ctx();
        let mut snippet = Snippet::hydrate(descriptor("js", true, "x"), Anchor::new("a"), &ctx);
        assert!(!snippet.session().is_dark());

        let dark = ctx.with_probe(FixedTheme(true));
        snippet.handle_theme_change(&dark);
        assert!(snippet.session().is_dark());
        assert_eq!(snippet.session().content(), "x");
    }

    #[tokio::test]
    async fn test_render_html_includes_output() {
        let ctx = ctx();
        let snippet = Snippet::hydrate(
            descriptor("js", true, "throw new Error('<b>')"),
            Anchor::new("a"),
            &ctx,
        );
        assert!(snippet.run().await);

        let html = snippet.render_html();
        assert!(html.contains("playdoc-title\">Example<"));
        assert!(html.contains("<button class=\"playdoc-run\">Run</button>"));
        assert!(html.contains("playdoc-output error\">Error: &lt;b&gt;</pre>"));
    }

    #[test]
    fn test_page_anchors_follow_document_order() {
        let ctx = ctx();
        let html = [
            descriptor("js", true, "1").to_placeholder_html(),
            "<p>between</p>".to_string(),
            descriptor("css", false, "a {}").to_placeholder_html(),
        ]
        .concat();

        let page = Page::hydrate(&html, &ctx).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page.snippets()[1].descriptor().language, "css");

        let anchors = page.unmount();
        assert_eq!(anchors, vec![Anchor::new("snippet-0"), Anchor::new("snippet-1")]);
    }
}

//! Live editor sessions.

use std::fmt;

use crate::EditorError;
use crate::builder::{
    AutocompletionConfig, Command, Extension, Key, SessionOptions, build_extensions,
};
use crate::clipboard::Clipboard;
use crate::completion::{Completion, CompletionContext, CompletionSource, is_word_char};
use crate::registry::{ExtensionRegistry, Grammar};
use crate::theme::{Theme, ThemeVariant};

/// Samples whether the surrounding page is currently dark.
pub trait ThemeProbe {
    fn is_dark(&self) -> bool;
}

/// A probe that always answers the same.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedTheme(pub bool);

impl ThemeProbe for FixedTheme {
    fn is_dark(&self) -> bool {
        self.0
    }
}

/// The display region a session is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Anchor {
    id: String,
}

impl Anchor {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// An open completion list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveCompletion {
    /// Start of the word the selected option replaces
    pub from: usize,
    pub options: Vec<Completion>,
    pub selected: usize,
}

impl ActiveCompletion {
    pub fn selected_option(&self) -> Option<&Completion> {
        self.options.get(self.selected)
    }
}

/// Everything that is rebuilt from scratch on reconfiguration.
struct EditorState {
    doc: String,
    cursor: usize,
    extensions: Vec<Extension>,
    dark: bool,
    completion: Option<ActiveCompletion>,
}

impl EditorState {
    fn new(registry: &ExtensionRegistry, options: &SessionOptions, doc: String, dark: bool) -> Self {
        Self {
            doc,
            cursor: 0,
            extensions: build_extensions(registry, options, dark),
            dark,
            completion: None,
        }
    }

    fn read_only(&self) -> bool {
        self.extensions
            .iter()
            .any(|e| matches!(e, Extension::ReadOnly))
    }

    fn basic_setup(&self) -> bool {
        self.extensions
            .iter()
            .any(|e| matches!(e, Extension::BasicSetup))
    }

    fn indent_unit(&self) -> &str {
        self.extensions
            .iter()
            .find_map(|e| match e {
                Extension::IndentUnit(unit) => Some(unit.as_str()),
                _ => None,
            })
            .unwrap_or("    ")
    }

    fn autocompletion(&self) -> Option<AutocompletionConfig> {
        self.extensions.iter().find_map(|e| match e {
            Extension::Autocompletion(config) => Some(*config),
            _ => None,
        })
    }

    fn completion_source(&self) -> Option<CompletionSource> {
        self.extensions.iter().find_map(|e| match e {
            Extension::Completions(source) => Some(*source),
            _ => None,
        })
    }

    fn grammar(&self) -> Option<&Grammar> {
        self.extensions.iter().find_map(|e| match e {
            Extension::Language(grammar) => Some(grammar),
            _ => None,
        })
    }

    fn theme(&self) -> Option<&Theme> {
        self.extensions.iter().find_map(|e| match e {
            Extension::Theme(theme) => Some(theme),
            _ => None,
        })
    }

    fn bindings(&self, key: Key) -> Vec<Command> {
        self.extensions
            .iter()
            .filter_map(|e| match e {
                Extension::Keymap(bindings) => Some(bindings),
                _ => None,
            })
            .flatten()
            .filter(|binding| binding.key == key)
            .map(|b| b.command)
            .collect()
    }

    fn line_start(&self) -> usize {
        self.doc[..self.cursor]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0)
    }
}

/// One live editor bound to an anchor.
///
/// Reconfiguration (language or theme change) rebuilds the whole extension
/// set and replaces the editor state; there is never more than one state per
/// session.
pub struct EditorSession {
    anchor: Anchor,
    registry: ExtensionRegistry,
    options: SessionOptions,
    state: EditorState,
    revision: u64,
}

impl EditorSession {
    pub fn create(
        anchor: Anchor,
        registry: ExtensionRegistry,
        options: SessionOptions,
        text: impl Into<String>,
        probe: &dyn ThemeProbe,
    ) -> Self {
        let state = EditorState::new(&registry, &options, text.into(), probe.is_dark());

        tracing::debug!(
            anchor = %anchor,
            language = %options.language,
            runnable = options.runnable,
            dark = state.dark,
            "editor session created"
        );

        Self {
            anchor,
            registry,
            options,
            state,
            revision: 0,
        }
    }

    /// Switch language, keeping the current text unless `new_text` is given.
    pub fn update(&mut self, language: &str, new_text: Option<String>, probe: &dyn ThemeProbe) {
        self.options.language = language.to_string();
        let doc = new_text.unwrap_or_else(|| std::mem::take(&mut self.state.doc));
        self.reconfigure(doc, probe);
    }

    /// Re-sample the page theme and rebuild, keeping the current text.
    pub fn handle_theme_change(&mut self, probe: &dyn ThemeProbe) {
        let doc = std::mem::take(&mut self.state.doc);
        self.reconfigure(doc, probe);
    }

    fn reconfigure(&mut self, doc: String, probe: &dyn ThemeProbe) {
        self.state = EditorState::new(&self.registry, &self.options, doc, probe.is_dark());
        tracing::debug!(
            anchor = %self.anchor,
            language = %self.options.language,
            dark = self.state.dark,
            "editor session reconfigured"
        );
    }

    pub fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    pub fn language(&self) -> &str {
        &self.options.language
    }

    pub fn is_runnable(&self) -> bool {
        self.options.runnable
    }

    pub fn is_read_only(&self) -> bool {
        self.state.read_only()
    }

    pub fn is_dark(&self) -> bool {
        self.state.dark
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.state.extensions
    }

    pub fn content(&self) -> &str {
        &self.state.doc
    }

    pub fn cursor(&self) -> usize {
        self.state.cursor
    }

    /// Number of document mutations so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn active_completion(&self) -> Option<&ActiveCompletion> {
        self.state.completion.as_ref()
    }

    pub fn set_cursor(&mut self, pos: usize) -> Result<(), EditorError> {
        if pos > self.state.doc.len() || !self.state.doc.is_char_boundary(pos) {
            return Err(EditorError::OutOfBounds {
                pos,
                len: self.state.doc.len(),
            });
        }
        self.state.cursor = pos;
        self.state.completion = None;
        Ok(())
    }

    /// Type `text` at the cursor.
    pub fn insert_text(&mut self, text: &str) -> Result<(), EditorError> {
        if self.is_read_only() {
            return Err(EditorError::ReadOnly);
        }

        let at = self.state.cursor;
        self.apply_change(at, at, text);
        self.state.cursor = at + text.len();

        let typed_word = text.chars().last().is_some_and(is_word_char);
        match self.state.autocompletion() {
            Some(config) if config.activate_on_typing && typed_word => {
                self.open_completion(false);
            }
            _ => self.state.completion = None,
        }
        Ok(())
    }

    /// Open the completion list on demand, even outside a word.
    pub fn request_completion(&mut self) -> Option<&ActiveCompletion> {
        self.open_completion(true)
    }

    /// Handle a key press. Returns whether anything handled it.
    pub fn press_key(&mut self, key: Key) -> bool {
        if self.state.completion.is_some()
            && self.state.autocompletion().is_some_and(|c| c.default_keymap)
        {
            match key {
                Key::Enter => return self.accept_completion(),
                Key::Escape => {
                    self.state.completion = None;
                    return true;
                }
                Key::ArrowDown | Key::ArrowUp => {
                    if let Some(active) = &mut self.state.completion {
                        let n = active.options.len();
                        active.selected = if key == Key::ArrowDown {
                            (active.selected + 1) % n
                        } else {
                            (active.selected + n - 1) % n
                        };
                    }
                    return true;
                }
                _ => {}
            }
        }

        for command in self.state.bindings(key) {
            if self.run_command(command) {
                return true;
            }
        }

        if key == Key::Enter && self.state.basic_setup() && !self.is_read_only() {
            return self.insert_text("\n").is_ok();
        }

        false
    }

    /// Focus left the editor.
    pub fn blur(&mut self) {
        if self.state.autocompletion().is_some_and(|c| c.close_on_blur) {
            self.state.completion = None;
        }
    }

    /// Copy the current text. Failures are logged, never surfaced.
    pub fn copy_to(&self, clipboard: &dyn Clipboard) -> bool {
        match clipboard.write_text(self.content()) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(anchor = %self.anchor, error = %e, "copy to clipboard failed");
                false
            }
        }
    }

    /// Render the editor as a self-contained HTML fragment.
    pub fn render_html(&self) -> String {
        let id = html_escape::encode_double_quoted_attribute(self.anchor.id());
        let css = self
            .state
            .theme()
            .map(|t| t.to_css(&format!("#{}", self.anchor.id())))
            .unwrap_or_default();
        let body = self
            .state
            .grammar()
            .and_then(|g| self.registry.provider().highlight(g, &self.state.doc))
            .unwrap_or_else(|| html_escape::encode_text(&self.state.doc).into_owned());
        let variant = ThemeVariant::from_dark(self.state.dark);
        let read_only = if self.is_read_only() {
            " data-readonly=\"true\""
        } else {
            ""
        };

        format!(
            "<div id=\"{}\" class=\"cm-editor {}\" data-language=\"{}\"{}><style>{}</style><pre class=\"cm-content\">{}</pre></div>",
            id,
            variant.class_name(),
            html_escape::encode_double_quoted_attribute(&self.options.language),
            read_only,
            css,
            body
        )
    }

    /// Tear down the session and release its anchor.
    pub fn destroy(self) -> Anchor {
        tracing::debug!(anchor = %self.anchor, "editor session destroyed");
        self.anchor
    }

    fn apply_change(&mut self, from: usize, to: usize, insert: &str) {
        self.state.doc.replace_range(from..to, insert);
        self.revision += 1;

        let revision = self.revision;
        for extension in &self.state.extensions {
            if let Extension::ChangeListener(Some(listener)) = extension {
                listener.notify(revision);
            }
        }
    }

    fn open_completion(&mut self, explicit: bool) -> Option<&ActiveCompletion> {
        let completion = match (self.state.completion_source(), self.state.autocompletion()) {
            (Some(source), Some(config)) if !self.is_read_only() => {
                let ctx = CompletionContext::new(&self.state.doc, self.state.cursor, explicit);
                source(&ctx)
                    .map(|result| {
                        let typed = &self.state.doc[result.from..self.state.cursor];
                        result.narrowed(typed, config.max_rendered_options)
                    })
                    .filter(|result| !result.options.is_empty())
                    .map(|result| ActiveCompletion {
                        from: result.from,
                        options: result.options,
                        selected: 0,
                    })
            }
            _ => None,
        };

        self.state.completion = completion;
        self.state.completion.as_ref()
    }

    fn accept_completion(&mut self) -> bool {
        let Some(active) = self.state.completion.take() else {
            return false;
        };
        let Some(option) = active.selected_option() else {
            return false;
        };
        if self.is_read_only() {
            return false;
        }

        let (text, offset) = option.insertion();
        let to = self.state.cursor;
        self.apply_change(active.from, to, &text);
        self.state.cursor = active.from + offset;
        true
    }

    fn run_command(&mut self, command: Command) -> bool {
        match command {
            Command::AcceptCompletion => self.accept_completion(),
            Command::IndentMore => {
                if self.is_read_only() {
                    return false;
                }
                let start = self.state.line_start();
                let unit = self.state.indent_unit().to_string();
                self.apply_change(start, start, &unit);
                self.state.cursor += unit.len();
                true
            }
            Command::IndentLess => {
                if self.is_read_only() {
                    return false;
                }
                let start = self.state.line_start();
                let max = self.state.indent_unit().len();
                let removable = self.state.doc[start..]
                    .bytes()
                    .take(max)
                    .take_while(|b| *b == b' ')
                    .count();
                if removable > 0 {
                    self.apply_change(start, start + removable, "");
                    self.state.cursor = self.state.cursor.saturating_sub(removable).max(start);
                }
                true
            }
        }
    }
}

//! Extension set assembly for one live editor.

use std::fmt;
use std::sync::Arc;

use crate::completion::CompletionSource;
use crate::registry::{ExtensionRegistry, Grammar};
use crate::theme::{Theme, ThemeVariant};

/// Keys the editor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Tab,
    ShiftTab,
    Enter,
    Escape,
    ArrowUp,
    ArrowDown,
}

/// Commands a key binding can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Accept the selected completion; fails when none is open
    AcceptCompletion,
    IndentMore,
    IndentLess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    pub key: Key,
    pub command: Command,
}

impl KeyBinding {
    pub const fn new(key: Key, command: Command) -> Self {
        Self { key, command }
    }
}

/// Autocompletion behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutocompletionConfig {
    pub activate_on_typing: bool,
    pub close_on_blur: bool,
    pub max_rendered_options: usize,
    /// Enter/Escape/arrow handling while the list is open
    pub default_keymap: bool,
}

/// Called with the new revision after every document mutation.
#[derive(Clone)]
pub struct ChangeListener(Arc<dyn Fn(u64) + Send + Sync>);

impl ChangeListener {
    pub fn new(f: impl Fn(u64) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub(crate) fn notify(&self, revision: u64) {
        (self.0)(revision)
    }
}

impl fmt::Debug for ChangeListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ChangeListener")
    }
}

/// One independent editor feature. A session is configured by an ordered list
/// of these; earlier entries take precedence.
#[derive(Debug, Clone)]
pub enum Extension {
    /// Baseline editing behaviour (newline on Enter, and so on)
    BasicSetup,
    Language(Grammar),
    Completions(CompletionSource),
    TabSize(u32),
    IndentUnit(String),
    Autocompletion(AutocompletionConfig),
    Theme(Theme),
    ChangeListener(Option<ChangeListener>),
    Keymap(Vec<KeyBinding>),
    ReadOnly,
    ThemeVariant(ThemeVariant),
}

/// Everything a session is built from besides the sampled dark-mode flag.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub language: String,
    pub runnable: bool,
    pub tab_size: u32,
    pub max_rendered_options: usize,
    pub theme_override: Theme,
    pub on_change: Option<ChangeListener>,
}

impl SessionOptions {
    pub fn new(language: impl Into<String>, runnable: bool) -> Self {
        Self {
            language: language.into(),
            runnable,
            tab_size: playdoc_config::DEFAULT_TAB_SIZE,
            max_rendered_options: playdoc_config::DEFAULT_MAX_RENDERED_OPTIONS as usize,
            theme_override: Theme::new(),
            on_change: None,
        }
    }

    /// Apply resolved editor settings from configuration.
    pub fn with_settings(mut self, settings: &playdoc_config::EditorSettings) -> Self {
        self.tab_size = settings.tab_size;
        self.max_rendered_options = settings.max_rendered_options as usize;
        self.theme_override = Theme::from(&settings.theme);
        self
    }

    pub fn with_theme_override(mut self, theme: Theme) -> Self {
        self.theme_override = theme;
        self
    }

    pub fn with_change_listener(mut self, listener: ChangeListener) -> Self {
        self.on_change = Some(listener);
        self
    }
}

/// Bindings attached to runnable editors: Tab accepts a completion, or
/// indents when there is none.
pub fn runnable_keymap() -> Vec<KeyBinding> {
    vec![
        KeyBinding::new(Key::Tab, Command::AcceptCompletion),
        KeyBinding::new(Key::Tab, Command::IndentMore),
        KeyBinding::new(Key::ShiftTab, Command::IndentLess),
    ]
}

/// Build the full extension set for a session.
pub fn build_extensions(
    registry: &ExtensionRegistry,
    options: &SessionOptions,
    dark: bool,
) -> Vec<Extension> {
    let mut extensions = vec![
        Extension::BasicSetup,
        Extension::TabSize(options.tab_size),
        Extension::IndentUnit(" ".repeat(options.tab_size as usize)),
        Extension::Autocompletion(AutocompletionConfig {
            activate_on_typing: true,
            close_on_blur: true,
            max_rendered_options: options.max_rendered_options,
            default_keymap: true,
        }),
        Extension::Theme(Theme::editor_default().merged(&options.theme_override)),
        Extension::ChangeListener(options.on_change.clone()),
    ];

    if options.runnable {
        extensions.push(Extension::Keymap(runnable_keymap()));
    } else {
        extensions.push(Extension::ReadOnly);
    }

    // Language support goes right after the baseline bundle
    if let Some(language) = registry.resolve(&options.language) {
        extensions.splice(1..1, language);
    }

    extensions.push(Extension::ThemeVariant(ThemeVariant::from_dark(dark)));

    extensions
}

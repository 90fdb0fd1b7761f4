//! Shared configuration types for playdoc
//!
//! This crate contains types that are shared between:
//! - The `playdoc` binary (for YAML config parsing)
//! - The editor and runtime crates (for the values they are built from)

use std::collections::BTreeMap;

use facet::Facet;

/// Default indentation width of live editors
pub const DEFAULT_TAB_SIZE: u32 = 4;

/// Default cap on the number of completion options shown
pub const DEFAULT_MAX_RENDERED_OPTIONS: u32 = 10;

/// Default interpreter command for Python snippets
pub const DEFAULT_PYTHON: &str = "python3";

/// Default bound on how long the Python runtime may take to come up
pub const DEFAULT_LOAD_TIMEOUT_SECS: u64 = 30;

/// Selector → property → value overrides layered onto the editor theme
pub type ThemeOverrides = BTreeMap<String, BTreeMap<String, String>>;

/// Playdoc configuration from `.config/playdoc.yaml`
#[derive(Debug, Clone, Default, Facet)]
#[facet(rename_all = "snake_case")]
pub struct PlaydocConfig {
    /// Live editor configuration
    #[facet(default)]
    pub editor: Option<EditorConfig>,

    /// Snippet execution configuration
    #[facet(default)]
    pub runtime: Option<RuntimeConfig>,
}

/// Live editor configuration
#[derive(Debug, Clone, Default, Facet)]
#[facet(rename_all = "snake_case")]
pub struct EditorConfig {
    /// Indentation width in columns
    #[facet(default)]
    pub tab_size: Option<u32>,

    /// Maximum number of completion options shown at once
    #[facet(default)]
    pub max_rendered_options: Option<u32>,

    /// Theme overrides, e.g. `{ ".cm-content": { padding: "8px" } }`
    #[facet(default)]
    pub theme: Option<ThemeOverrides>,
}

/// Snippet execution configuration
#[derive(Debug, Clone, Default, Facet)]
#[facet(rename_all = "snake_case")]
pub struct RuntimeConfig {
    /// Python interpreter command
    #[facet(default)]
    pub python: Option<String>,

    /// Seconds to wait for the Python runtime to report ready
    #[facet(default)]
    pub load_timeout_secs: Option<u64>,

    /// Languages allowed to execute (`js`, `py`)
    #[facet(default)]
    pub enabled_languages: Option<Vec<String>>,
}

/// Editor settings with every default applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSettings {
    pub tab_size: u32,
    pub max_rendered_options: u32,
    pub theme: ThemeOverrides,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            tab_size: DEFAULT_TAB_SIZE,
            max_rendered_options: DEFAULT_MAX_RENDERED_OPTIONS,
            theme: ThemeOverrides::new(),
        }
    }
}

/// Runtime settings with every default applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub python: String,
    pub load_timeout_secs: u64,
    pub enabled_languages: Vec<String>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            python: DEFAULT_PYTHON.to_string(),
            load_timeout_secs: DEFAULT_LOAD_TIMEOUT_SECS,
            enabled_languages: vec!["js".to_string(), "py".to_string()],
        }
    }
}

impl RuntimeSettings {
    /// Whether snippets tagged `language` may be executed.
    pub fn is_enabled(&self, language: &str) -> bool {
        self.enabled_languages.iter().any(|l| l == language)
    }
}

impl PlaydocConfig {
    /// Editor settings, falling back to defaults for anything unset.
    pub fn editor_settings(&self) -> EditorSettings {
        let defaults = EditorSettings::default();
        let Some(editor) = &self.editor else {
            return defaults;
        };

        EditorSettings {
            tab_size: editor.tab_size.unwrap_or(defaults.tab_size),
            max_rendered_options: editor
                .max_rendered_options
                .unwrap_or(defaults.max_rendered_options),
            theme: editor.theme.clone().unwrap_or_default(),
        }
    }

    /// Runtime settings, falling back to defaults for anything unset.
    pub fn runtime_settings(&self) -> RuntimeSettings {
        let defaults = RuntimeSettings::default();
        let Some(runtime) = &self.runtime else {
            return defaults;
        };

        RuntimeSettings {
            python: runtime.python.clone().unwrap_or(defaults.python),
            load_timeout_secs: runtime
                .load_timeout_secs
                .unwrap_or(defaults.load_timeout_secs),
            enabled_languages: runtime
                .enabled_languages
                .clone()
                .unwrap_or(defaults.enabled_languages),
        }
    }
}

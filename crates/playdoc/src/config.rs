//! Configuration file discovery and parsing
//!
//! Searches for `.config/playdoc.yaml` walking up from the current directory.
//! The project root is the parent of `.config/`.

use std::env;
use std::sync::OnceLock;

use camino::{Utf8Path, Utf8PathBuf};
use eyre::{Result, eyre};
use fs_err as fs;
use playdoc_config::{EditorSettings, PlaydocConfig, RuntimeSettings};

const CONFIG_DIR: &str = ".config";
const CONFIG_FILE_YAML: &str = "playdoc.yaml";

/// Discovered configuration with every default applied
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    /// Project root (parent of .config/), if a config file was found
    pub root: Option<Utf8PathBuf>,
    /// Live editor settings
    pub editor: EditorSettings,
    /// Snippet execution settings
    pub runtime: RuntimeSettings,
}

impl ResolvedConfig {
    /// Discover and load configuration from current directory
    pub fn discover() -> Result<Option<Self>> {
        let cwd = env::current_dir()?;
        let cwd = Utf8PathBuf::try_from(cwd).map_err(|e| {
            eyre!(
                "Current directory is not valid UTF-8: {}",
                e.as_path().display()
            )
        })?;

        match find_config_file(&cwd) {
            Some(path) => Ok(Some(load_config(&path)?)),
            None => Ok(None),
        }
    }

    /// Discover and load configuration from a specific project path
    pub fn discover_from(project_path: &Utf8Path) -> Result<Option<Self>> {
        let yaml_file = project_path.join(CONFIG_DIR).join(CONFIG_FILE_YAML);
        if yaml_file.exists() {
            Ok(Some(load_config(&yaml_file)?))
        } else {
            Ok(None)
        }
    }

    /// Discovered configuration, or defaults when there is none
    pub fn discover_or_default() -> Result<Self> {
        Ok(Self::discover()?.unwrap_or_default())
    }
}

/// Search for `.config/playdoc.yaml` walking up from `start`
fn find_config_file(start: &Utf8Path) -> Option<Utf8PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE_YAML))
        .find(|candidate| candidate.exists())
}

/// Load and resolve configuration from a config file path
pub fn load_config(config_path: &Utf8Path) -> Result<ResolvedConfig> {
    let content = fs::read_to_string(config_path)?;

    let config = parse_config(&content)
        .map_err(|e| eyre!("Failed to parse {}: {}", config_path, e))?;

    // Project root is the parent of .config/; a file anywhere else roots at its own directory
    let config_dir = config_path
        .parent()
        .ok_or_else(|| eyre!("Config file has no parent directory"))?;
    let root = if config_dir.file_name() == Some(CONFIG_DIR) {
        config_dir.parent().unwrap_or(config_dir)
    } else {
        config_dir
    };

    tracing::debug!(path = %config_path, root = %root, "loaded configuration");

    Ok(ResolvedConfig {
        root: Some(root.to_owned()),
        editor: config.editor_settings(),
        runtime: config.runtime_settings(),
    })
}

fn parse_config(content: &str) -> Result<PlaydocConfig> {
    // An empty file is a valid, all-defaults config
    if content.trim().is_empty() {
        return Ok(PlaydocConfig::default());
    }
    facet_yaml::from_str(content).map_err(|e| eyre!("{}", e))
}

// ============================================================================
// Global config access
// ============================================================================

/// Global resolved configuration
static RESOLVED_CONFIG: OnceLock<ResolvedConfig> = OnceLock::new();

/// Initialize the global config (call once at startup)
pub fn set_global_config(config: ResolvedConfig) -> Result<()> {
    RESOLVED_CONFIG
        .set(config)
        .map_err(|_| eyre!("Global config already initialized"))
}

/// Get the global config (returns None if not initialized)
pub fn global_config() -> Option<&'static ResolvedConfig> {
    RESOLVED_CONFIG.get()
}

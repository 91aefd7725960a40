//! Server configuration loaded from TOML.

use crate::error::Result;
use crate::search::{
    DEFAULT_MAX_RESULTS, DEFAULT_SNIPPET_CHARS, FieldWeights, IndexSettings, SearchOptions,
};
use anyhow::Context;
use serde::Deserialize;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "DOCSEARCH_CONFIG";

/// Runtime configuration. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Path to the generator's search payload
    pub payload: Option<PathBuf>,
    pub max_results: usize,
    pub snippet_chars: usize,
    pub prefix_enabled: bool,
    pub phrase_bonus: f32,
    /// Number of cached query results (0 disables caching)
    pub query_cache_size: usize,
    /// How often the payload file is checked for changes (0 disables the watcher)
    pub reload_interval_secs: u64,
    pub weights: FieldWeights,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            payload: None,
            max_results: DEFAULT_MAX_RESULTS,
            snippet_chars: DEFAULT_SNIPPET_CHARS,
            prefix_enabled: true,
            phrase_bonus: IndexSettings::default().phrase_bonus,
            query_cache_size: 128,
            reload_interval_secs: 0,
            weights: FieldWeights::default(),
        }
    }
}

impl Config {
    /// Parse a config from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config")
    }

    /// Load a config file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Load from `$DOCSEARCH_CONFIG`, then the per-user config file, then defaults.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(expand_tilde(&path).as_ref());
            tracing::info!("Loading config from {}", path.display());
            return Self::load_from(&path);
        }

        if let Some(path) = Self::default_path()
            && path.is_file()
        {
            tracing::info!("Loading config from {}", path.display());
            return Self::load_from(&path);
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// `<config_dir>/docsearch-mcp/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("docsearch-mcp").join("config.toml"))
    }

    /// The payload path with `~` expanded.
    pub fn payload_path(&self) -> Option<PathBuf> {
        self.payload
            .as_deref()
            .map(|path| PathBuf::from(expand_tilde(&path.to_string_lossy()).as_ref()))
    }

    pub const fn index_settings(&self) -> IndexSettings {
        IndexSettings {
            weights: self.weights,
            phrase_bonus: self.phrase_bonus,
        }
    }

    pub const fn search_options(&self) -> SearchOptions {
        SearchOptions {
            max_results: self.max_results,
            prefix_enabled: self.prefix_enabled,
            snippet_chars: self.snippet_chars,
        }
    }
}

/// Expands tilde (`~`) in a path to the user's home directory.
///
/// - `~/foo` becomes `/home/user/foo`
/// - `~` becomes `/home/user`
/// - Other paths are returned unchanged
pub fn expand_tilde(path: &str) -> Cow<'_, str> {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return Cow::Owned(home.join(stripped).display().to_string());
        }
    } else if path == "~"
        && let Some(home) = dirs::home_dir()
    {
        return Cow::Owned(home.display().to_string());
    }
    Cow::Borrowed(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let_assert!(Ok(config) = Config::from_toml(""));
        check!(config == Config::default());
        check!(config.max_results == 20);
        check!(config.weights.title == 5.0);
        check!(config.weights.category == 3.0);
        check!(config.weights.body == 1.0);
    }

    #[test]
    fn test_partial_config() {
        let_assert!(
            Ok(config) = Config::from_toml(
                r#"
                payload = "site/search_index.js"
                max_results = 5
                prefix_enabled = false

                [weights]
                title = 8.0
                "#
            )
        );
        check!(config.payload == Some(PathBuf::from("site/search_index.js")));
        check!(config.search_options().max_results == 5);
        check!(!config.search_options().prefix_enabled);
        check!(config.index_settings().weights.title == 8.0);
        check!(config.index_settings().weights.body == 1.0);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        check!(Config::from_toml("max_result = 3").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "snippet_chars = 80").expect("write config");
        let_assert!(Ok(config) = Config::load_from(file.path()));
        check!(config.snippet_chars == 80);
    }

    #[test]
    fn test_expand_tilde_passthrough() {
        check!(expand_tilde("/abs/path") == "/abs/path");
        check!(expand_tilde("relative") == "relative");
    }
}

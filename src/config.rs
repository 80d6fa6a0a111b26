//! Configuration management for annie using the prefer crate.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::{SessionFlags, TagSchema};
use crate::services::{NerConfig, PropagationOptions};

/// Session file used when neither the config, the environment nor the
/// command line names one.
pub const DEFAULT_SESSION_FILENAME: &str = "annie_session.json";

/// Environment variable overriding the session path.
pub const SESSION_ENV: &str = "ANNIE_SESSION";

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Session file the CLI reads and writes.
    pub session_path: PathBuf,
    /// Schema given to newly opened sessions.
    pub schema: TagSchema,
    /// Flags given to newly opened sessions.
    pub flags: SessionFlags,
    /// Default for `--whole-word` when propagating.
    pub whole_word: bool,
    pub ner: NerConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            session_path: PathBuf::from(DEFAULT_SESSION_FILENAME),
            schema: TagSchema::default(),
            flags: SessionFlags::default(),
            whole_word: false,
            ner: NerConfig::default(),
        }
    }
}

impl Settings {
    /// Propagation options from a session's flags and the whole-word choice.
    pub fn propagation_options(flags: SessionFlags, whole_word: bool) -> PropagationOptions {
        PropagationOptions {
            whole_word,
            extend_to_word: flags.extend_to_word,
            allow_overlap: flags.allow_overlap,
        }
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Session file path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    /// Entity tags for new sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_tags: Option<Vec<String>>,
    /// Relation types for new sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_types: Option<Vec<String>>,
    /// Tag → color overrides.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tag_colors: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extend_to_word: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_overlap: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whole_word: Option<bool>,
    /// External NER backend.
    #[serde(default)]
    pub ner: NerConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers annie config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("annie").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("{}; using defaults", e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Schema for new sessions: configured names, defaults elsewhere.
    pub fn schema(&self) -> TagSchema {
        let defaults = TagSchema::default();
        let mut schema = TagSchema::new(
            self.entity_tags
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or(defaults.entity_tags),
            self.relation_types
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or(defaults.relation_types),
        );
        for (tag, color) in &self.tag_colors {
            schema.tag_colors.insert(tag.clone(), color.clone());
        }
        schema
    }

    pub fn flags(&self) -> SessionFlags {
        SessionFlags {
            extend_to_word: self.extend_to_word.unwrap_or(false),
            allow_overlap: self.allow_overlap.unwrap_or(false),
        }
    }

    /// Apply configuration to settings.
    /// `base_dir` is used to resolve relative paths (typically config file dir or CWD).
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref session) = self.session {
            settings.session_path = self.resolve_path(session, base_dir);
        }
        settings.schema = self.schema();
        settings.flags = self.flags();
        if let Some(whole_word) = self.whole_word {
            settings.whole_word = whole_word;
        }
        settings.ner = self.ner.clone();
        if let Some(ref command) = self.ner.command {
            // Commands given as relative paths live next to the config.
            if command.contains('/') || command.starts_with('~') {
                settings.ner.command = Some(
                    self.resolve_path(command, base_dir)
                        .to_string_lossy()
                        .into_owned(),
                );
            }
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Session file from the command line (highest precedence).
    pub session_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
}

/// Load config from an explicit path, falling back to discovery.
async fn load_file_config(options: &LoadOptions) -> Config {
    if let Some(ref config_path) = options.config_path {
        return match Config::load_from_path(config_path).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}; using defaults", e);
                Config::default()
            }
        };
    }
    Config::load().await
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let config = load_file_config(&options).await;
    let mut settings = Settings::default();

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let base_dir = if options.use_cwd {
        cwd.clone()
    } else {
        config.base_dir().unwrap_or_else(|| cwd.clone())
    };

    config.apply_to_settings(&mut settings, &base_dir);

    // ANNIE_SESSION takes precedence over the config file
    if let Some(session) = std::env::var(SESSION_ENV).ok().filter(|s| !s.is_empty()) {
        tracing::debug!("Using {} from environment: {}", SESSION_ENV, session);
        settings.session_path = config.resolve_path(&session, &cwd);
    }

    // --session flag takes highest precedence
    if let Some(ref session) = options.session_path {
        settings.session_path = config.resolve_path(&session.to_string_lossy(), &cwd);
    }

    (settings, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_toml_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annie.toml");
        std::fs::write(
            &path,
            r##"
session = "work/session.json"
entity_tags = ["PER", "ORG"]
allow_overlap = true

[tag_colors]
PER = "#000000"

[ner]
command = "ner-cli"
window_chars = 500
overlap_chars = 50
"##,
        )
        .unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, dir.path());

        assert_eq!(settings.session_path, dir.path().join("work/session.json"));
        assert_eq!(settings.schema.entity_tags, vec!["PER", "ORG"]);
        assert_eq!(settings.schema.relation_types.len(), 5);
        assert_eq!(settings.schema.tag_colors["PER"], "#000000");
        assert!(settings.flags.allow_overlap);
        assert!(!settings.flags.extend_to_word);
        assert_eq!(settings.ner.command.as_deref(), Some("ner-cli"));
        assert_eq!(settings.ner.window_chars, 500);
        assert!(settings.ner.label_map.is_empty());
    }

    #[tokio::test]
    async fn test_load_yaml_and_json_config() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("annie.yaml");
        std::fs::write(&yaml, "whole_word: true\nrelation_types: [knows]\n").unwrap();
        let config = Config::load_from_path(&yaml).await.unwrap();
        assert_eq!(config.whole_word, Some(true));
        assert_eq!(config.schema().relation_types, vec!["knows"]);

        let json = dir.path().join("annie.json");
        std::fs::write(&json, r#"{"ner": {"label_map": {"PER": "Person"}}}"#).unwrap();
        let config = Config::load_from_path(&json).await.unwrap();
        assert_eq!(config.ner.label_map["PER"], "Person");
        assert_eq!(config.ner.overlap_chars, 200);
    }

    #[tokio::test]
    async fn test_invalid_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annie.toml");
        std::fs::write(&path, "session = [").unwrap();
        assert!(Config::load_from_path(&path).await.is_err());
    }

    #[test]
    fn test_resolve_path() {
        let config = Config::default();
        let base = Path::new("/base");
        assert_eq!(config.resolve_path("/abs/s.json", base), PathBuf::from("/abs/s.json"));
        assert_eq!(config.resolve_path("rel/s.json", base), PathBuf::from("/base/rel/s.json"));
    }

    #[test]
    fn test_defaults_without_config() {
        let mut settings = Settings::default();
        Config::default().apply_to_settings(&mut settings, Path::new("."));
        assert_eq!(settings.session_path, PathBuf::from(DEFAULT_SESSION_FILENAME));
        assert_eq!(settings.schema, TagSchema::default());
        assert!(!settings.whole_word);
    }
}

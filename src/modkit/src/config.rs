//! Configuration management for modkit

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use uasset_bridge::EngineVersion;

/// Preference key holding the engine version name
pub const UE_VERSION: &str = "ue_version";
/// Preference key holding the UI theme
pub const THEME: &str = "theme";
/// Preference key holding the default mappings file
pub const MAPPINGS: &str = "mappings";
/// Preference key holding the retoc executable path
pub const RETOC: &str = "retoc";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Last folder or file picked per purpose (e.g. "export", "import")
    #[serde(default)]
    pub last_used_paths: BTreeMap<String, String>,

    #[serde(default)]
    pub preferences: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        let preferences = [(UE_VERSION, "UE5_4"), (THEME, "dark")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Self {
            last_used_paths: BTreeMap::new(),
            preferences,
        }
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("modkit");

        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, or defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory at {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        Ok(())
    }

    pub fn last_used_path(&self, key: &str) -> Option<&str> {
        self.last_used_paths.get(key).map(String::as_str)
    }

    /// Does not persist; call [`Config::save`]
    pub fn set_last_used_path(&mut self, key: impl Into<String>, path: impl Into<String>) {
        self.last_used_paths.insert(key.into(), path.into());
    }

    pub fn preference(&self, key: &str) -> Option<&str> {
        self.preferences.get(key).map(String::as_str)
    }

    /// Does not persist; call [`Config::save`]
    pub fn set_preference(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.preferences.insert(key.into(), value.into());
    }

    /// Configured engine version, UE5_4 if unset or unrecognized
    pub fn engine_version(&self) -> EngineVersion {
        match self.preference(UE_VERSION).map(str::parse::<EngineVersion>) {
            Some(Ok(version)) => version,
            Some(Err(e)) => {
                tracing::warn!("ignoring configured {}: {}", UE_VERSION, e);
                EngineVersion::default()
            }
            None => EngineVersion::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.preference(UE_VERSION), Some("UE5_4"));
        assert_eq!(config.preference(THEME), Some("dark"));
        assert!(config.last_used_paths.is_empty());
        assert_eq!(config.engine_version(), EngineVersion::UE5_4);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set_last_used_path("export", "/mods/MyMod/Content");
        config.set_preference(UE_VERSION, "UE5_3");
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.last_used_path("export"), Some("/mods/MyMod/Content"));
        assert_eq!(loaded.engine_version(), EngineVersion::UE5_3);
    }

    #[test]
    fn test_missing_tables_are_filled_in() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[preferences]\ntheme = \"light\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(config.last_used_paths.is_empty());
        assert_eq!(config.preference(THEME), Some("light"));
        assert_eq!(config.preference(UE_VERSION), None);
        assert_eq!(config.engine_version(), EngineVersion::UE5_4);
    }

    #[test]
    fn test_unparseable_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "preferences = [[[").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn test_unknown_engine_version_falls_back() {
        let mut config = Config::default();
        config.set_preference(UE_VERSION, "UE9_9");
        assert_eq!(config.engine_version(), EngineVersion::UE5_4);
    }

    #[test]
    fn test_setters_do_not_persist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        Config::default().save_to(&path).unwrap();

        let mut config = Config::load_from(&path).unwrap();
        config.set_preference(THEME, "light");

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.preference(THEME), Some("dark"));
    }
}

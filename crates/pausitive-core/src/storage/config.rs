//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Default technique and session mode
//! - Terminal display settings (frame rate, progress bar)
//! - User-defined breathing techniques
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::catalog::{Catalog, Technique};
use crate::error::ConfigError;

/// Defaults used when a session is started without explicit choices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDefaults {
    #[serde(default = "default_technique")]
    pub default_technique: String,
    #[serde(default = "default_mode")]
    pub default_mode: String,
    /// Seconds to wait between setup and the first inhale.
    #[serde(default = "default_countdown_secs")]
    pub countdown_secs: u32,
}

/// Terminal display configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_true")]
    pub show_progress_bar: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionDefaults,
    #[serde(default)]
    pub display: DisplayConfig,
    /// Extra techniques merged into the built-in catalog.
    #[serde(default)]
    pub custom_techniques: Vec<Technique>,
}

// Default functions
fn default_technique() -> String {
    "technique-4-8".into()
}
fn default_mode() -> String {
    "quick-break".into()
}
fn default_countdown_secs() -> u32 {
    1
}
fn default_fps() -> u32 {
    60
}
fn default_true() -> bool {
    true
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            default_technique: default_technique(),
            default_mode: default_mode(),
            countdown_secs: default_countdown_secs(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            show_progress_bar: true,
        }
    }
}

pub const MIN_FPS: u32 = 1;
pub const MAX_FPS: u32 = 240;

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Reject values the session runner cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_FPS..=MAX_FPS).contains(&self.display.fps) {
            return Err(ConfigError::InvalidValue {
                key: "display.fps".into(),
                message: format!("must be between {MIN_FPS} and {MAX_FPS}"),
            });
        }
        let catalog = self.catalog();
        if catalog.technique(&self.session.default_technique).is_err() {
            return Err(ConfigError::InvalidValue {
                key: "session.default_technique".into(),
                message: format!("unknown technique '{}'", self.session.default_technique),
            });
        }
        if catalog.mode(&self.session.default_mode).is_err() {
            return Err(ConfigError::InvalidValue {
                key: "session.default_mode".into(),
                message: format!("unknown mode '{}'", self.session.default_mode),
            });
        }
        Ok(())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        data_dir()
            .map(|dir| dir.join("config.toml"))
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from("config.toml"),
                message: e.to_string(),
            })
    }

    /// Load from disk, or return the default when no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// holds invalid values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };
        let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the resulting config is
    /// invalid. `self` is left unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.into(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.into(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Built-in catalog plus the configured custom techniques.
    pub fn catalog(&self) -> Catalog {
        Catalog::with_custom(&self.custom_techniques)
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Using default configuration: {}", e);
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Level;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.display.fps, 60);
        assert_eq!(parsed.session.default_technique, "technique-4-8");
        assert!(parsed.custom_techniques.is_empty());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[display]\nfps = 30\n").unwrap();
        assert_eq!(parsed.display.fps, 30);
        assert!(parsed.display.show_progress_bar);
        assert_eq!(parsed.session.default_mode, "quick-break");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("display.fps").as_deref(), Some("60"));
        assert_eq!(cfg.get("session.default_mode").as_deref(), Some("quick-break"));
        assert!(cfg.get("display.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("display.show_progress_bar", "false").unwrap();
        cfg.set("display.fps", "30").unwrap();
        cfg.set("session.default_technique", "technique-7-11").unwrap();
        assert!(!cfg.display.show_progress_bar);
        assert_eq!(cfg.display.fps, 30);
        assert_eq!(cfg.session.default_technique, "technique-7-11");
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_type() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("display.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.set("display.show_progress_bar", "maybe"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn set_rejects_out_of_range_and_leaves_config_unchanged() {
        let mut cfg = Config::default();
        assert!(cfg.set("display.fps", "0").is_err());
        assert!(cfg.set("session.default_mode", "forever").is_err());
        assert_eq!(cfg.display.fps, 60);
        assert_eq!(cfg.session.default_mode, "quick-break");
    }

    #[test]
    fn custom_technique_becomes_valid_default() {
        let mut cfg = Config::default();
        cfg.custom_techniques
            .push(Technique::new("box-4", "Box", 4.0, 4.0, Level::Standard));
        cfg.set("session.default_technique", "box-4").unwrap();
        assert!(cfg.catalog().technique("box-4").is_ok());
    }

    #[test]
    fn load_and_save_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(Config::load_from(&path).unwrap().display.fps, 60);

        let mut cfg = Config::default();
        cfg.set("display.fps", "24").unwrap();
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().display.fps, 24);

        std::fs::write(&path, "display = [").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}

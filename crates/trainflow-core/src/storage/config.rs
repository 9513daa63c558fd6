//! TOML-based application configuration.
//!
//! Stores user preferences:
//! - History/listing page size
//! - Watch-loop refresh cadence
//! - Leave-confirmation behavior
//!
//! Configuration is stored at `~/.config/trainflow/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::ConfigError;

/// History and listing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Default page size for `history list` and `plan list`.
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

/// Watch-loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Tick cadence in milliseconds. Needs to stay well under the
    /// 500 ms skip window for the accelerated countdown to render.
    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/trainflow/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    /// Whether `session leave` requires `--yes` while a session is live.
    #[serde(default = "default_true")]
    pub confirm_leave: bool,
}

fn default_page_limit() -> u32 {
    10
}
fn default_refresh_ms() -> u64 {
    50
}
fn default_true() -> bool {
    true
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            page_limit: default_page_limit(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            refresh_ms: default_refresh_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history: HistoryConfig::default(),
            watch: WatchConfig::default(),
            confirm_leave: true,
        }
    }
}

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
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(ConfigError::MissingKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::MissingKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::MissingKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|_| ConfigError::InvalidValue {
                            key: key.to_string(),
                            message: format!("cannot parse '{value}' as bool"),
                        })?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                            key: key.to_string(),
                            message: format!("cannot parse '{value}' as number"),
                        })?;
                        serde_json::Value::Number(n.into())
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::MissingKey(key.to_string()))?;
        }

        Err(ConfigError::MissingKey(key.to_string()))
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk or return (and persist) the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
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

    /// Set a config value by key and persist. Returns an error if the
    /// key is unknown or the value cannot be parsed.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    /// Like [`Self::set`] but without touching disk.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.history.page_limit, 10);
        assert_eq!(cfg.watch.refresh_ms, 50);
        assert!(cfg.confirm_leave);
    }

    #[test]
    fn dotted_get() {
        let cfg = Config::default();
        assert_eq!(cfg.get("history.page_limit").unwrap(), "10");
        assert_eq!(cfg.get("confirm_leave").unwrap(), "true");
        assert!(cfg.get("no.such.key").is_none());
    }

    #[test]
    fn dotted_set_parses_types() {
        let mut cfg = Config::default();
        cfg.set_value("watch.refresh_ms", "100").unwrap();
        assert_eq!(cfg.watch.refresh_ms, 100);
        cfg.set_value("confirm_leave", "false").unwrap();
        assert!(!cfg.confirm_leave);

        assert!(cfg.set_value("watch.refresh_ms", "fast").is_err());
        assert!(cfg.set_value("unknown_key", "1").is_err());
    }

    #[test]
    fn toml_roundtrip_with_missing_sections() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.history.page_limit, 10);

        let partial = "[watch]\nrefresh_ms = 25\n";
        let cfg: Config = toml::from_str(partial).unwrap();
        assert_eq!(cfg.watch.refresh_ms, 25);
        assert_eq!(cfg.history.page_limit, 10);
    }
}

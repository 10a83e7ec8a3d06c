//! TOML-based runtime configuration.
//!
//! Holds the knobs of the service itself rather than user settings:
//! - Alarm periods (phase tick, override check, enforcement watchdog)
//! - Drift tolerance for the on-page countdown
//! - Countdown injection retry policy
//! - Store write retries
//! - Blocked page location
//!
//! Configuration is stored at `~/.config/focusgate/config.toml`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::data_dir;
use crate::error::ConfigError;

/// Alarm periods and drift tolerance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_check_interval_ms")]
    pub override_check_interval_ms: u64,
    #[serde(default = "default_check_interval_ms")]
    pub watchdog_interval_ms: u64,
    #[serde(default = "default_drift_tolerance_secs")]
    pub drift_tolerance_secs: u64,
}

/// Countdown injection retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectionConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Give up waiting for the tab after this long.
    #[serde(default = "default_injection_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_write_attempts")]
    pub write_attempts: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/focusgate/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub injection: InjectionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default = "default_blocked_page_url")]
    pub blocked_page_url: String,
}

// Default functions
fn default_tick_interval_ms() -> u64 {
    1_000
}
fn default_check_interval_ms() -> u64 {
    5_000
}
fn default_drift_tolerance_secs() -> u64 {
    2
}
fn default_max_attempts() -> u32 {
    3
}
fn default_initial_backoff_ms() -> u64 {
    250
}
fn default_injection_timeout_ms() -> u64 {
    5_000
}
fn default_write_attempts() -> u32 {
    3
}
fn default_blocked_page_url() -> String {
    "focusgate://extension/blocked.html".into()
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            override_check_interval_ms: default_check_interval_ms(),
            watchdog_interval_ms: default_check_interval_ms(),
            drift_tolerance_secs: default_drift_tolerance_secs(),
        }
    }
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            timeout_ms: default_injection_timeout_ms(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            write_attempts: default_write_attempts(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            injection: InjectionConfig::default(),
            storage: StorageConfig::default(),
            blocked_page_url: default_blocked_page_url(),
        }
    }
}

/// Walk a dotted key such as `timing.tick_interval_ms` through a JSON tree.
fn lookup<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    if key.is_empty() {
        return None;
    }
    key.split('.').try_fold(root, |node, segment| node.get(segment))
}

/// Coerce a command-line string to the JSON type already stored at a leaf.
fn coerce(existing: &Value, raw: &str) -> Result<Value, String> {
    match existing {
        Value::Bool(_) => raw.parse::<bool>().map(Value::Bool).map_err(|e| e.to_string()),
        Value::Number(_) => raw
            .parse::<u64>()
            .map(Value::from)
            .map_err(|e| e.to_string()),
        Value::String(_) => Ok(Value::String(raw.to_owned())),
        _ => serde_json::from_str(raw).map_err(|e| e.to_string()),
    }
}

/// Replace an existing leaf. Unknown sections or fields are rejected; new
/// keys are never created.
fn assign(root: &mut Value, key: &str, raw: &str) -> Result<(), ConfigError> {
    let unknown = || ConfigError::UnknownKey(key.to_owned());
    let (section, field) = match key.rsplit_once('.') {
        Some((section, field)) => (Some(section), field),
        None => (None, key),
    };
    if field.is_empty() {
        return Err(unknown());
    }

    let mut parent = root;
    for segment in section.into_iter().flat_map(|s| s.split('.')) {
        parent = parent.get_mut(segment).ok_or_else(unknown)?;
    }
    let slot = parent
        .as_object_mut()
        .and_then(|table| table.get_mut(field))
        .ok_or_else(unknown)?;
    *slot = coerce(slot, raw).map_err(|message| ConfigError::InvalidValue {
        key: key.to_owned(),
        message,
    })?;
    Ok(())
}

impl Config {
    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or write and return the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if let Ok(content) = std::fs::read_to_string(&path) {
            return toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            });
        }
        let fresh = Self::default();
        fresh.save()?;
        Ok(fresh)
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
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

    /// Value at a dotted key, rendered for display. Strings come back unquoted.
    pub fn get(&self, key: &str) -> Option<String> {
        let tree = serde_json::to_value(self).ok()?;
        lookup(&tree, key).map(|leaf| match leaf {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |e: serde_json::Error| ConfigError::InvalidValue {
            key: key.to_owned(),
            message: e.to_string(),
        };
        let mut tree = serde_json::to_value(&*self).map_err(invalid)?;
        assign(&mut tree, key, value)?;
        *self = serde_json::from_value(tree).map_err(invalid)?;
        Ok(())
    }

    /// [`Config::load`], falling back to defaults with a warning.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_survive_toml() {
        let cfg = Config::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.timing.tick_interval_ms, 1_000);
        assert_eq!(parsed.injection.max_attempts, 3);
        assert_eq!(parsed.blocked_page_url, cfg.blocked_page_url);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed: Config = toml::from_str("[timing]\ndrift_tolerance_secs = 5\n").unwrap();
        assert_eq!(parsed.timing.drift_tolerance_secs, 5);
        assert_eq!(parsed.timing.watchdog_interval_ms, 5_000);
        assert_eq!(parsed.storage.write_attempts, 3);
    }

    #[test]
    fn get_reads_nested_and_top_level_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timing.tick_interval_ms").as_deref(), Some("1000"));
        assert!(cfg.get("timing.missing_key").is_none());
        assert_eq!(
            cfg.get("blocked_page_url").as_deref(),
            Some("focusgate://extension/blocked.html")
        );
    }

    #[test]
    fn set_updates_nested_number() {
        let mut cfg = Config::default();
        cfg.set("injection.max_attempts", "5").unwrap();
        assert_eq!(cfg.injection.max_attempts, 5);
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_type() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("timing.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(cfg.set("nope", "1"), Err(ConfigError::UnknownKey(_))));
        assert!(matches!(
            cfg.set("timing.tick_interval_ms", "soon"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}

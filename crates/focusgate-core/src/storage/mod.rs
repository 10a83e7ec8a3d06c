//! Durable key-value state.
//!
//! The core reads and writes a flat namespace of JSON values (see [`keys`]).
//! [`MemoryStore`] backs tests and short-lived embeddings; [`SqliteStore`]
//! persists to `~/.config/focusgate/focusgate.db`.

mod config;
pub mod keys;
mod memory;
pub mod persist;
mod sqlite;

pub use config::{Config, InjectionConfig, StorageConfig, TimingConfig};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::path::PathBuf;

use serde_json::Value;

use crate::error::{ConfigError, StoreError};

pub trait StateStore: Send {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Safe to call for absent keys.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Returns `~/.config/focusgate[-dev]/`.
///
/// `FOCUSGATE_HOME` overrides the location entirely; `FOCUSGATE_ENV=dev`
/// selects the development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = if let Ok(home) = std::env::var("FOCUSGATE_HOME") {
        PathBuf::from(home)
    } else {
        let base_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config");
        let env = std::env::var("FOCUSGATE_ENV").unwrap_or_else(|_| "production".to_string());
        if env == "dev" {
            base_dir.join("focusgate-dev")
        } else {
            base_dir.join("focusgate")
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

//! Core error types for focusgate-core.
//!
//! Errors are grouped by the surface that produced them so callers can
//! decide between retrying (store, tab), sanitizing (validation) and
//! self-healing (enforcement).

use std::path::PathBuf;
use thiserror::Error;

use crate::platform::TabId;

/// Core error type for focusgate-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Key-value store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tab surface errors
    #[error("Tab error: {0}")]
    Tab(#[from] TabError),

    /// Enforcement hook errors
    #[error("Enforcement error: {0}")]
    Enforcement(#[from] EnforcementError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The service was used outside of its ready window
    #[error("Service is {0}")]
    Lifecycle(&'static str),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The async driver stopped or did not answer in time
    #[error("Driver error: {0}")]
    Driver(String),
}

/// Key-value store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the backing database
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Read failed
    #[error("Failed to read '{key}': {message}")]
    ReadFailed { key: String, message: String },

    /// Write failed
    #[error("Failed to write '{key}': {message}")]
    WriteFailed { key: String, message: String },

    /// Stored value could not be decoded
    #[error("Corrupt value for '{key}': {message}")]
    Corrupt { key: String, message: String },

    /// Backing store is locked
    #[error("Store is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown key in a dot-path lookup
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Could not resolve the data directory
    #[error("Cannot determine data directory: {0}")]
    DataDir(String),
}

/// Tab surface errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TabError {
    /// The tab no longer exists
    #[error("Tab {0} is closed")]
    Closed(TabId),

    /// The tab exists but cannot take script content (internal page, cross-origin)
    #[error("Tab {tab} cannot receive content: {reason}")]
    Restricted { tab: TabId, reason: String },

    /// Temporary failure, worth retrying
    #[error("Tab {tab} is temporarily unavailable: {reason}")]
    Transient { tab: TabId, reason: String },
}

impl TabError {
    /// Whether a retry has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(self, TabError::Transient { .. })
    }
}

/// Enforcement hook errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnforcementError {
    /// Platform refused to register the listener
    #[error("Failed to install navigation listener: {0}")]
    InstallFailed(String),

    /// Listener was registered but is not visible to the platform
    #[error("Navigation listener {0} failed verification after install")]
    VerificationFailed(u64),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// URL could not be parsed or has no usable host
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// Blocklist pattern is empty after sanitizing
    #[error("Invalid blocklist pattern: '{0}'")]
    InvalidPattern(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg)
                if code.code == rusqlite::ErrorCode::DatabaseLocked
                    || code.code == rusqlite::ErrorCode::DatabaseBusy =>
            {
                StoreError::Locked
            }
            _ => StoreError::ReadFailed {
                key: String::new(),
                message: err.to_string(),
            },
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

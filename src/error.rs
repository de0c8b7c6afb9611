//! Error types for tiercache
//!
//! All modules use `CacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tiercache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// All errors that can occur in tiercache
#[derive(Error, Debug)]
pub enum CacheError {
    // Lookup errors
    #[error("'{key}' not found: {reason}")]
    NotFound {
        key: String,
        reason: String,
        #[source]
        cause: Option<Box<CacheError>>,
    },

    #[error("Layer '{layer}' is not writable")]
    NotWritable { layer: String },

    #[error("Ambiguous answer for '{key}': {count} candidates where one was expected")]
    Ambiguous { key: String, count: usize },

    // Store errors
    #[error("Store {path} is corrupt: {reason}")]
    StoreCorrupt { path: PathBuf, reason: String },

    #[error("Table '{table}' does not hold {expected} values: {reason}")]
    ShapeMismatch {
        table: String,
        expected: String,
        reason: String,
    },

    #[error("Invalid SQL identifier: '{0}'")]
    InvalidIdentifier(String),

    #[error("Persistence is disabled for {0}")]
    CacheNotUsed(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    // Remote errors
    #[error("Remote source {source_name} failed: {reason}")]
    Remote { source_name: String, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("No map named '{0}' in configuration")]
    MapNotFound(String),

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("{0}")]
    User(String),
}

impl CacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a not-found error without an underlying cause
    pub fn not_found(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotFound {
            key: key.into(),
            reason: reason.into(),
            cause: None,
        }
    }

    /// Create a not-found error that remembers why the lookup gave up
    pub fn not_found_after(key: impl Into<String>, attempts: u32, cause: CacheError) -> Self {
        Self::NotFound {
            key: key.into(),
            reason: format!("giving up after {} attempt(s): {}", attempts, cause),
            cause: Some(Box::new(cause)),
        }
    }

    /// Create a not-writable error for the named layer
    pub fn not_writable(layer: impl Into<String>) -> Self {
        Self::NotWritable {
            layer: layer.into(),
        }
    }

    /// Create a transient remote failure
    pub fn remote(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Remote {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Check if the error means "key absent"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if the error means "layer refused the write"
    pub fn is_not_writable(&self) -> bool {
        matches!(self, Self::NotWritable { .. })
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Remote { .. } | Self::Io { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::StoreCorrupt { .. } => {
                Some("Move the damaged file aside; a missing file is recreated empty")
            }
            Self::ShapeMismatch { .. } => {
                Some("Use a different table name, or set `shape` to match the table")
            }
            Self::Remote { .. } => Some("Raise `retry` in the [remote] config section"),
            Self::MapNotFound(_) => Some("Run: tiercache config show"),
            Self::Ambiguous { .. } => Some("Set `on_ambiguous` on the map's http source"),
            _ => None,
        }
    }
}

//! Configuration schema for tiercache
//!
//! Configuration is stored at `~/.config/tiercache/config.toml`
//!
//! ```toml
//! [remote]
//! contact = "lab@example.org"
//! retry = 3
//!
//! [maps.gene2pathway]
//! shape = "set"
//! database = "kegg.db"
//!
//! [maps.gene2pathway.http]
//! url = "https://rest.kegg.jp/link/pathway/{key}"
//! field = 1
//! strip_prefix = "path:"
//! ```

use crate::error::{CacheError, CacheResult};
use crate::remote::HttpSourceConfig;
use crate::store::TableSpec;
use crate::value::{AmbiguityPolicy, Shape};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Throttle, retry and identification for remote sources
    pub remote: RemoteConfig,

    /// Named maps, each one layered cache
    pub maps: BTreeMap<String, MapConfig>,
}

impl Config {
    /// Look up a map by name
    pub fn map(&self, name: &str) -> CacheResult<&MapConfig> {
        self.maps
            .get(name)
            .ok_or_else(|| CacheError::MapNotFound(name.to_string()))
    }

    /// Reject combinations that parse but cannot work
    pub fn validate(&self, path: &Path) -> CacheResult<()> {
        let invalid = |reason: String| CacheError::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        };

        if !matches!(self.general.log_format.as_str(), "text" | "json") {
            return Err(invalid(format!(
                "general.log_format must be \"text\" or \"json\", not \"{}\"",
                self.general.log_format
            )));
        }

        for (name, map) in &self.maps {
            if map.database.is_none() && map.flat_file.is_none() && map.http.is_none() {
                return Err(invalid(format!(
                    "map '{}' needs a database, a flat_file or an http source",
                    name
                )));
            }
            let all_matches = map
                .http
                .as_ref()
                .and_then(|http| http.on_ambiguous)
                .is_some_and(|policy| policy == AmbiguityPolicy::AllMatches);
            if map.shape == Shape::Scalar && all_matches {
                return Err(invalid(format!(
                    "map '{}' holds scalars; on_ambiguous = \"all_matches\" needs shape = \"set\"",
                    name
                )));
            }
        }
        Ok(())
    }

    /// A starting point for `config init`
    pub fn example() -> Self {
        let mut maps = BTreeMap::new();
        maps.insert(
            "gene2pathway".to_string(),
            MapConfig {
                shape: Shape::Set,
                database: Some(PathBuf::from("kegg.db")),
                http: Some(HttpSourceConfig {
                    url: "https://rest.kegg.jp/link/pathway/{key}".to_string(),
                    field: Some(1),
                    strip_prefix: Some("path:".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        Self {
            maps,
            ..Default::default()
        }
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Base directory for relative database and flat-file paths
    pub data_dir: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            data_dir: None,
        }
    }
}

/// Remote source settings shared by every map
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Minimum spacing between two requests of one source
    pub min_interval_ms: u64,

    /// Extra attempts after a transient failure (0 = one attempt)
    pub retry: u32,

    /// Pause between attempts
    pub retry_delay_ms: u64,

    /// Per-request timeout (unset = wait forever)
    pub timeout_secs: Option<u64>,

    /// Contact address sent to upstreams in the User-Agent
    pub contact: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 1000,
            retry: 0,
            retry_delay_ms: 1000,
            timeout_secs: Some(30),
            contact: None,
        }
    }
}

impl RemoteConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// One named map: its shape and the layers behind its memory
///
/// Layers are consulted in a fixed order: SQLite table, flat file, http.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Scalar or set values
    pub shape: Shape,

    /// SQLite database file
    pub database: Option<PathBuf>,

    /// Table name (defaults to the map name)
    pub table: Option<String>,

    /// Key column name
    pub key_column: String,

    /// Value column name
    pub value_column: String,

    /// CSV side-file
    pub flat_file: Option<PathBuf>,

    /// Never write to the local layers
    pub read_only: bool,

    /// Remote source consulted last
    pub http: Option<HttpSourceConfig>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            shape: Shape::Scalar,
            database: None,
            table: None,
            key_column: "key".to_string(),
            value_column: "value".to_string(),
            flat_file: None,
            read_only: false,
            http: None,
        }
    }
}

impl MapConfig {
    /// Table and columns for a map called `name`
    pub fn table_spec(&self, name: &str) -> TableSpec {
        TableSpec::new(
            self.table.clone().unwrap_or_else(|| name.to_string()),
            &self.key_column,
            &self.value_column,
        )
    }

    pub fn database_path(&self, data_dir: &Path) -> Option<PathBuf> {
        self.database.as_ref().map(|p| data_dir.join(p))
    }

    pub fn flat_file_path(&self, data_dir: &Path) -> Option<PathBuf> {
        self.flat_file.as_ref().map(|p| data_dir.join(p))
    }
}

//! Store configuration
//!
//! Selects the durable backend and the filesystem locations it uses.
//! Values come from struct defaults, a deserialized config document, or
//! the `STAYDB_*` environment variables.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Durable backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Single JSON document on disk
    Snapshot,
    /// Embedded SQLite database
    Relational,
}

impl StorageKind {
    /// Parse the storage flag: the literal `"db"` selects the relational
    /// engine, anything else the snapshot.
    pub fn from_flag(flag: &str) -> StorageKind {
        if flag == "db" {
            StorageKind::Relational
        } else {
            StorageKind::Snapshot
        }
    }
}

/// Runtime environment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvMode {
    Development,
    Test,
}

impl EnvMode {
    pub fn from_flag(flag: &str) -> EnvMode {
        if flag == "test" {
            EnvMode::Test
        } else {
            EnvMode::Development
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Durable backend to use (default: snapshot)
    #[serde(default = "default_storage")]
    pub storage: StorageKind,

    /// Directory holding durable state (default: "data")
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Database file name inside `data_dir` (default: "staydb.sqlite3")
    #[serde(default = "default_database")]
    pub database: String,

    /// Environment mode; `Test` resets relational tables on open
    #[serde(default = "default_environment")]
    pub environment: EnvMode,
}

fn default_storage() -> StorageKind {
    StorageKind::Snapshot
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_database() -> String {
    "staydb.sqlite3".to_string()
}

fn default_environment() -> EnvMode {
    EnvMode::Development
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage: default_storage(),
            data_dir: default_data_dir(),
            database: default_database(),
            environment: default_environment(),
        }
    }
}

impl StoreConfig {
    /// Config rooted at `data_dir`, defaults elsewhere.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Read configuration from `STAYDB_STORAGE`, `STAYDB_DATA_DIR`,
    /// `STAYDB_DATABASE` and `STAYDB_ENV`. Unset variables keep their
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(flag) = env::var("STAYDB_STORAGE") {
            config.storage = StorageKind::from_flag(&flag);
        }
        if let Ok(dir) = env::var("STAYDB_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(database) = env::var("STAYDB_DATABASE") {
            config.database = database;
        }
        if let Ok(flag) = env::var("STAYDB_ENV") {
            config.environment = EnvMode::from_flag(&flag);
        }
        config
    }

    /// Snapshot document location
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("objects.json")
    }

    /// Relational database location
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database)
    }
}

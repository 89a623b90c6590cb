//! Runtime configuration: where canonical graphs are stored and how long a
//! replica waits for the canonical store before rolling back.
//!
//! ```rust
//! use socialgraph::{SocialGraphConfig, StorageKind};
//!
//! let cfg = SocialGraphConfig::memory();
//! assert_eq!(cfg.storage.kind, StorageKind::Memory);
//!
//! let cfg = SocialGraphConfig::sqlite("graphs.db");
//! assert_eq!(cfg.storage.kind, StorageKind::Sqlite);
//! ```

use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::SocialGraphError;

pub const DB_ENV: &str = "SOCIALGRAPH_DB";
pub const COMMIT_TIMEOUT_ENV: &str = "SOCIALGRAPH_COMMIT_TIMEOUT_MS";
pub const LOG_ENV: &str = "SOCIALGRAPH_LOG";

const DEFAULT_COMMIT_TIMEOUT_MS: u64 = 5_000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// Process-local maps; contents vanish on exit.
    #[default]
    Memory,
    /// One SQLite file holding every account's snapshot.
    Sqlite,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub kind: StorageKind,
    pub path: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub commit_timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            commit_timeout_ms: DEFAULT_COMMIT_TIMEOUT_MS,
        }
    }
}

impl SyncConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            commit_timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn commit_timeout(&self) -> Duration {
        Duration::from_millis(self.commit_timeout_ms)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialGraphConfig {
    pub storage: StorageConfig,
    pub sync: SyncConfig,
}

impl SocialGraphConfig {
    pub fn memory() -> Self {
        Self::default()
    }

    pub fn sqlite<P: Into<String>>(path: P) -> Self {
        Self {
            storage: StorageConfig {
                kind: StorageKind::Sqlite,
                path: Some(path.into()),
            },
            ..Self::default()
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SocialGraphError> {
        let text = fs::read_to_string(path.as_ref())
            .map_err(|e| SocialGraphError::validation(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| SocialGraphError::validation(e.to_string()))
    }

    /// Applies `SOCIALGRAPH_DB` and `SOCIALGRAPH_COMMIT_TIMEOUT_MS` when set.
    pub fn with_env_overrides(self) -> Result<Self, SocialGraphError> {
        self.with_overrides(
            std::env::var(DB_ENV).ok(),
            std::env::var(COMMIT_TIMEOUT_ENV).ok(),
        )
    }

    fn with_overrides(
        mut self,
        db: Option<String>,
        timeout_ms: Option<String>,
    ) -> Result<Self, SocialGraphError> {
        if let Some(db) = db {
            self.storage = storage_for(&db);
        }
        if let Some(raw) = timeout_ms {
            self.sync.commit_timeout_ms = raw.trim().parse().map_err(|_| {
                SocialGraphError::validation(format!("{COMMIT_TIMEOUT_ENV} must be an integer"))
            })?;
        }
        Ok(self)
    }
}

/// `memory` selects the in-process store; anything else is a SQLite path.
pub fn storage_for(db: &str) -> StorageConfig {
    if db == "memory" {
        StorageConfig::default()
    } else {
        StorageConfig {
            kind: StorageKind::Sqlite,
            path: Some(db.to_string()),
        }
    }
}

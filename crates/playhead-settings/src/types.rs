//! Settings types.
//!
//! Field names are camelCase on disk. Every section is `#[serde(default)]`
//! so a partial file only needs the keys it changes.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "backend": { "baseUrl": "http://10.0.0.5:8000" },
///   "logging": { "level": "debug", "modules": { "playhead_client": "trace" } }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayheadSettings {
    pub backend: BackendSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

impl PlayheadSettings {
    /// Reject values that would only fail later at first use.
    pub fn validate(&self) -> Result<()> {
        let url = self.backend.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SettingsError::InvalidValue(format!(
                "backend.baseUrl must start with http:// or https://, got {url:?}"
            )));
        }
        if self.backend.connect_timeout_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "backend.connectTimeoutMs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where the retrieval backend lives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendSettings {
    pub base_url: String,
    /// Limit on establishing a connection. Requests themselves have no
    /// overall deadline.
    pub connect_timeout_ms: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout_ms: 30_000,
        }
    }
}

/// Location of the durable session and catalog store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    /// `None` means `state.db` next to the settings file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
}

impl StorageSettings {
    pub fn resolved_db_path(&self) -> PathBuf {
        match &self.db_path {
            Some(path) => PathBuf::from(path),
            None => crate::loader::settings_dir().join("state.db"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
    /// Per-module level overrides, e.g. `{"playhead_client": "trace"}`.
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
            modules: BTreeMap::new(),
        }
    }
}

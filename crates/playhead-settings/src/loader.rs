//! Settings loading with deep merge and environment variable overrides.
//!
//! Deep merge rules:
//! - objects merge recursively, source wins per key
//! - arrays and primitives are replaced by source
//! - nulls in source are skipped

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::PlayheadSettings;

/// `~/.playhead`
pub fn settings_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".playhead")
}

/// `~/.playhead/settings.json`
pub fn settings_path() -> PathBuf {
    settings_dir().join("settings.json")
}

pub fn load_settings() -> Result<PlayheadSettings> {
    load_settings_from_path(&settings_path())
}

/// Load from `path` with env overrides applied. A missing file yields
/// defaults; an unreadable or invalid one is an error.
pub fn load_settings_from_path(path: &Path) -> Result<PlayheadSettings> {
    let mut settings = load_file(path)?;
    apply_overrides(&mut settings, |name| std::env::var(name).ok());
    settings.validate()?;
    Ok(settings)
}

fn load_file(path: &Path) -> Result<PlayheadSettings> {
    let defaults = serde_json::to_value(PlayheadSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `PLAYHEAD_*` overrides read through `lookup`. Empty or unparsable
/// values are ignored.
pub fn apply_overrides(settings: &mut PlayheadSettings, lookup: impl Fn(&str) -> Option<String>) {
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = read("PLAYHEAD_BACKEND_URL") {
        settings.backend.base_url = v;
    }
    if let Some(v) = read("PLAYHEAD_CONNECT_TIMEOUT_MS") {
        match parse_u64_range(&v, 100, 600_000) {
            Some(ms) => settings.backend.connect_timeout_ms = ms,
            None => warn!(key = "PLAYHEAD_CONNECT_TIMEOUT_MS", value = %v, "invalid timeout, ignoring"),
        }
    }
    if let Some(v) = read("PLAYHEAD_DB_PATH") {
        settings.storage.db_path = Some(v);
    }
    if let Some(v) = read("PLAYHEAD_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("PLAYHEAD_LOG_JSON") {
        match parse_bool(&v) {
            Some(json) => settings.logging.json = json,
            None => warn!(key = "PLAYHEAD_LOG_JSON", value = %v, "invalid boolean, ignoring"),
        }
    }
}

/// Accepts `true`/`1`/`yes`/`on` and `false`/`0`/`no`/`off`, any case.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

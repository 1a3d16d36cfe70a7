//! Shared config utilities for loading/saving JSON config files,
//! plus the console's own `ConsoleConfig`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "YUKKURI_CONSOLE_CONFIG";

const APP_DIR_NAME: &str = "yukkuri-console";

/// Generic load for any Serde config type with a `Default` implementation.
/// Falls back to `T::default()` if the file is missing or unparsable.
pub fn load_json_config<T: DeserializeOwned + Default>(path: &Path, label: &str) -> T {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<T>(&content) {
            Ok(config) => {
                tracing::info!("[{}] Loaded config from {}", label, path.display());
                config
            }
            Err(e) => {
                tracing::warn!(
                    "[{}] Failed to parse config {}: {}; using defaults",
                    label,
                    path.display(),
                    e
                );
                T::default()
            }
        },
        Err(_) => {
            tracing::info!(
                "[{}] No config file at {}; using defaults",
                label,
                path.display()
            );
            T::default()
        }
    }
}

/// Generic save for any Serde config type.
pub fn save_json_config<T: Serialize>(path: &Path, config: &T, label: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(path, json).map_err(|e| format!("Failed to write config file: {}", e))?;
    tracing::info!("[{}] Saved config to {}", label, path.display());
    Ok(())
}

// ── Console Config ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Synthesis endpoint the parameter form is posted to.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Quiet period before an edited voice is written back to the store.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Filename used when the response carries no usable `filename=`.
    #[serde(default = "default_filename")]
    pub default_filename: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Durable key/value store file. Defaults to the user data directory.
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    /// Where downloads are saved. Defaults to the user download directory.
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            debounce_ms: default_debounce_ms(),
            default_filename: default_filename(),
            request_timeout_secs: default_request_timeout_secs(),
            store_path: None,
            download_dir: None,
            log_level: default_log_level(),
        }
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8080/talk".to_string()
}
fn default_debounce_ms() -> u64 {
    300
}
fn default_filename() -> String {
    "yukkuri.wav".to_string()
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}

impl ConsoleConfig {
    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolve the store file: explicit `store_path` first, then the data directory.
    pub fn resolve_store_path(&self) -> PathBuf {
        if let Some(ref path) = self.store_path {
            return path.clone();
        }
        dirs_next::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
            .join("storage.json")
    }

    pub fn resolve_download_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.download_dir {
            return dir.clone();
        }
        dirs_next::download_dir().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Config file location: `$YUKKURI_CONSOLE_CONFIG` if set and non-empty,
/// otherwise `<config dir>/yukkuri-console/config.json`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join("config.json")
}

/// Load the console config. Falls back to defaults if the file is missing or invalid.
pub fn load_config(path: &Path) -> ConsoleConfig {
    load_json_config(path, "Config")
}

pub fn save_config(path: &Path, config: &ConsoleConfig) -> Result<(), String> {
    save_json_config(path, config, "Config")
}

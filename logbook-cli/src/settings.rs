//! Persisted command-line defaults.
//!
//! Stored as JSON at an OS-appropriate location. Flags given on the command
//! line always win over these values.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

/// Journal opened when neither `--path` nor the settings name one.
pub const DEFAULT_JOURNAL: &str = "diary.db";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Journal used when `--path` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_journal: Option<PathBuf>,
    /// Three octal digits used when `--operm` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_permissions: Option<String>,
}

impl AppSettings {
    pub fn journal_path(&self) -> PathBuf {
        self.default_journal
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_JOURNAL))
    }
}

/// Returns the path to the settings JSON file.
///
/// - macOS / Linux: `~/.config/logbook/settings.json`
/// - Windows: `%APPDATA%/Logbook/settings.json`
pub fn settings_file_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("Logbook").join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("logbook").join("settings.json")
    }
}

pub fn load_settings() -> AppSettings {
    load_from(&settings_file_path())
}

pub fn save_settings(settings: &AppSettings) -> Result<()> {
    save_to(&settings_file_path(), settings)
}

/// Loads settings from `path`; returns defaults if the file is missing or corrupt.
pub fn load_from(path: &Path) -> AppSettings {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("ignoring unreadable settings {}: {e}", path.display());
            AppSettings::default()
        }),
        Err(_) => AppSettings::default(),
    }
}

/// Saves settings to `path`, creating parent directories as needed.
pub fn save_to(path: &Path, settings: &AppSettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("failed to create settings directory {}", parent.display())
        })?;
    }
    let json = serde_json::to_string_pretty(settings).context("failed to serialize settings")?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

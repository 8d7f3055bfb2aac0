use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stockrecon_recon::SearchPolicy;

/// Manual-match search behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Queries shorter than this never reach the catalog.
    pub min_query_len: usize,
    pub limit: usize,
    /// Search-as-you-type delay for interactive clients; the CLI ignores it.
    pub debounce_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            min_query_len: 2,
            limit: 20,
            debounce_ms: 300,
        }
    }
}

impl SearchSettings {
    pub fn policy(&self) -> SearchPolicy {
        SearchPolicy {
            min_query_len: self.min_query_len,
            limit: self.limit,
            debounce: Duration::from_millis(self.debounce_ms),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(rename = "search")]
    pub search: SearchSettings,

    /// Used when a job file names no catalog.
    #[serde(rename = "catalog.default")]
    pub default_catalog: Option<PathBuf>,

    #[serde(rename = "export.directory")]
    pub export_dir: Option<PathBuf>,
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stockrecon");
        config_dir.join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                // Strip comments (lines starting with //)
                let cleaned: String = contents
                    .lines()
                    .filter(|line| !line.trim().starts_with("//"))
                    .collect::<Vec<_>>()
                    .join("\n");

                match serde_json::from_str(&cleaned) {
                    Ok(settings) => settings,
                    Err(e) => {
                        log::warn!("error parsing {}: {}; using default settings", path.display(), e);
                        Self::default()
                    }
                }
            }
            Err(e) => {
                log::warn!("error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;

        fs::write(path, json).map_err(|e| e.to_string())
    }

    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}

use std::collections::HashSet;

use serde::Deserialize;
use stockrecon_core::{ColumnLayout, Dimension, EntryId, ProductId};

use crate::error::ReconError;
use crate::mapping::MappingStore;
use crate::merge::MergePolicy;

/// File extensions a job may point at.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xls", "csv"];

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// One reconciliation run, read from a `*.recon.toml` file.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    pub name: String,
    /// Spreadsheet path, relative to the job file.
    pub file: String,
    /// Catalog path, relative to the job file. Falls back to user settings.
    #[serde(default)]
    pub catalog: Option<String>,
    #[serde(default)]
    pub columns: ColumnLayout,
    /// Mapping overrides seeded into the session before upload.
    #[serde(default)]
    pub mappings: MappingStore,
    #[serde(default)]
    pub manual: Vec<ManualEntry>,
    #[serde(default)]
    pub merge: MergePolicy,
    #[serde(default)]
    pub execute: ExecuteConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManualEntry {
    pub entry_id: EntryId,
    pub product_id: ProductId,
    /// Defaults to the row's counted quantity.
    #[serde(default)]
    pub excel_qty: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecuteConfig {
    #[serde(default)]
    pub dry_run: bool,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl JobConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: JobConfig = toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("name must not be empty".into()));
        }

        let ext = std::path::Path::new(&self.file)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ReconError::ConfigValidation(format!(
                "file '{}' must be one of: {}",
                self.file,
                SUPPORTED_EXTENSIONS.iter().map(|e| format!(".{e}")).collect::<Vec<_>>().join(", ")
            )));
        }

        let mut headers = HashSet::new();
        for column in ColumnLayout::COLUMNS {
            let header = self.columns.header(column).trim().to_lowercase();
            if header.is_empty() {
                return Err(ReconError::ConfigValidation("[columns] headers must not be empty".into()));
            }
            if !headers.insert(header) {
                return Err(ReconError::ConfigValidation(format!(
                    "column header '{}' is used twice",
                    self.columns.header(column)
                )));
            }
        }

        for dim in Dimension::ALL {
            if self.mappings.iter(dim).any(|(excel, _)| excel.is_empty()) {
                return Err(ReconError::ConfigValidation(format!("empty key in [mappings.{dim}]")));
            }
        }

        let mut seen = HashSet::new();
        for entry in &self.manual {
            if entry.entry_id.trim().is_empty() {
                return Err(ReconError::ConfigValidation("manual entry_id must not be empty".into()));
            }
            if !seen.insert(entry.entry_id.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "manual entry '{}' is listed twice",
                    entry.entry_id
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

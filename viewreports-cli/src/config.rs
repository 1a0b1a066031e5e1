//! Run configuration
//!
//! Every field has a default matching the production report template and
//! reference workbook, so a config file only needs the keys it overrides.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::excel::{CellRange, CellRef};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub reference: ReferenceColumns,
    pub extract: ExtractSettings,
    pub template: TemplateLayout,
    pub archive: ArchiveNaming,
}

/// Column names expected in the first sheet of the reference workbook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReferenceColumns {
    /// Canonical identifier column
    pub house_number: String,
    /// Canonical display name column
    pub canonical_name: String,
    /// Vendor/platform display name column
    pub vendor_name: String,
}

impl Default for ReferenceColumns {
    fn default() -> Self {
        Self {
            house_number: "HOUSE_NUMBER".to_string(),
            canonical_name: "שם קשת טי וי".to_string(),
            vendor_name: "שם תכנית בפלטפורמה".to_string(),
        }
    }
}

/// Thresholds for table-region detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractSettings {
    /// Rows after the start row that must all contain data
    pub lookahead_rows: usize,
    /// Non-empty cells a row needs to count as part of the table
    pub min_filled_cells: usize,
    /// Minimum data rows (after the header) for a table to be kept
    pub min_data_rows: usize,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            lookahead_rows: 5,
            min_filled_cells: 4,
            min_data_rows: 16,
        }
    }
}

/// Fixed positions inside the report template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateLayout {
    /// 1-based row holding the data-region headers
    pub header_row: u32,
    pub month_cell: CellRef,
    pub platform_cell: CellRef,
    /// Cells highlighted when their text equals the platform label
    pub platform_legend: CellRange,
    /// Cells highlighted when their text equals the report month
    pub month_legend: CellRange,
    pub program_header: String,
    pub house_header: String,
    pub viewers_header: String,
    pub date_header: String,
    /// ARGB fill colour used for legend highlights
    pub highlight_rgb: String,
}

impl Default for TemplateLayout {
    fn default() -> Self {
        Self {
            header_row: 4,
            month_cell: CellRef::new(1, 2),
            platform_cell: CellRef::new(2, 2),
            platform_legend: CellRange {
                start: CellRef::new(5, 17),
                end: CellRef::new(9, 17),
            },
            month_legend: CellRange {
                start: CellRef::new(5, 16),
                end: CellRef::new(16, 16),
            },
            program_header: "שם תוכנית בפלטפורמה".to_string(),
            house_header: "מספר האוס בקשת TV".to_string(),
            viewers_header: "כמות צפיות".to_string(),
            date_header: "תאריך".to_string(),
            highlight_rgb: "FFFFFF00".to_string(),
        }
    }
}

/// Archive entry prefixes per pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveNaming {
    pub extracted_prefix: String,
    pub reconciled_prefix: String,
    pub populated_prefix: String,
}

impl Default for ArchiveNaming {
    fn default() -> Self {
        Self {
            extracted_prefix: "cleaned_".to_string(),
            reconciled_prefix: "mapped_".to_string(),
            populated_prefix: "template_".to_string(),
        }
    }
}

impl Config {
    /// Parse a TOML document
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse configuration")
    }

    /// Load from an explicit path, else the user config file when present, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_file(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::load_file(&path),
            _ => {
                log::debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn load_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// `<config dir>/viewreports/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("viewreports").join("config.toml"))
}

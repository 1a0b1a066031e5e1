//! Table extraction
//!
//! Vendor exports put banners, notes and totals around the real data. The
//! extractor finds where the dense block starts, keeps only rows that belong
//! to it, promotes its first row to the header and drops tables too small to
//! be a real report.

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::ExtractSettings;
use crate::excel::{RawSheet, read_csv, read_workbook};
use crate::table::{CellValue, Table};

/// Extensions read as workbooks; the actual format is sniffed from the bytes
pub const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

/// How an extracted table was stored in its source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Workbook,
    Csv,
}

impl SourceFormat {
    /// Detect from a file name's extension, case-insensitively
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())?
            .to_lowercase();

        if ext == "csv" {
            Some(SourceFormat::Csv)
        } else if WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
            Some(SourceFormat::Workbook)
        } else {
            None
        }
    }

    /// Extension used for the cleaned intermediate of this format
    pub fn output_extension(&self) -> &'static str {
        match self {
            SourceFormat::Workbook => "xlsx",
            SourceFormat::Csv => "csv",
        }
    }
}

/// A cleaned table and where it came from
#[derive(Debug, Clone)]
pub struct ExtractedTable {
    /// `{stem}_{sheet}` for workbooks, `{stem}` for CSV files
    pub identity: String,
    pub sheet: Option<String>,
    pub format: SourceFormat,
    pub table: Table,
}

fn filled_cells(row: &[CellValue]) -> usize {
    row.iter().filter(|c| !c.is_empty()).count()
}

/// Index of the first non-empty row followed by `lookahead` non-empty rows
///
/// The following rows must exist, so a block that runs into the end of the
/// sheet is not detected.
pub fn find_table_start(rows: &[Vec<CellValue>], lookahead: usize) -> Option<usize> {
    let has_data: Vec<bool> = rows.iter().map(|r| filled_cells(r) > 0).collect();

    (0..rows.len().saturating_sub(lookahead))
        .find(|&i| has_data[i..=i + lookahead].iter().all(|&d| d))
}

/// Keep rows that are dense and whose predecessor is dense too
///
/// Row 0 only needs to be dense itself. Every surviving row is dense, so
/// applying the filter twice changes nothing.
pub fn filter_dense_rows(rows: &[Vec<CellValue>], min_filled: usize) -> Vec<Vec<CellValue>> {
    let dense: Vec<bool> = rows.iter().map(|r| filled_cells(r) >= min_filled).collect();

    rows.iter()
        .enumerate()
        .filter(|&(i, _)| dense[i] && (i == 0 || dense[i - 1]))
        .map(|(_, row)| row.clone())
        .collect()
}

/// Isolate the data table in one raw sheet
pub fn clean_sheet(sheet: &RawSheet, settings: &ExtractSettings) -> Option<Table> {
    let Some(start) = find_table_start(&sheet.rows, settings.lookahead_rows) else {
        log::debug!("Sheet '{}': no table region found", sheet.name);
        return None;
    };

    let mut rows = filter_dense_rows(&sheet.rows[start..], settings.min_filled_cells).into_iter();
    let Some(header) = rows.next() else {
        log::debug!("Sheet '{}': no dense rows after row {}", sheet.name, start + 1);
        return None;
    };

    let table = Table::from_raw(header, rows.collect());
    if table.len() < settings.min_data_rows {
        log::debug!(
            "Sheet '{}': {} data rows, below the minimum of {}",
            sheet.name,
            table.len(),
            settings.min_data_rows
        );
        return None;
    }

    Some(table)
}

/// `{stem}_{sheet}` with path separators in the sheet name replaced
pub fn sheet_identity(stem: &str, sheet: &str) -> String {
    format!("{}_{}", stem, sheet.replace(['/', '\\'], "_"))
}

/// Extract every table from one input file
///
/// Unsupported extensions yield no tables. Unreadable content is an error
/// for this file only.
pub fn extract_file(name: &str, bytes: &[u8], settings: &ExtractSettings) -> Result<Vec<ExtractedTable>> {
    let Some(format) = SourceFormat::from_file_name(name) else {
        log::debug!("Skipping {}: unsupported file type", name);
        return Ok(Vec::new());
    };

    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
        .to_string();

    let tables = match format {
        SourceFormat::Workbook => {
            let sheets = read_workbook(bytes).with_context(|| format!("Failed to read {}", name))?;
            sheets
                .iter()
                .filter_map(|sheet| {
                    let table = clean_sheet(sheet, settings)?;
                    Some(ExtractedTable {
                        identity: sheet_identity(&stem, &sheet.name),
                        sheet: Some(sheet.name.clone()),
                        format,
                        table,
                    })
                })
                .collect()
        }
        SourceFormat::Csv => {
            let (header, rows) = read_csv(bytes).with_context(|| format!("Failed to read {}", name))?;
            let mut table = Table::from_raw(header, rows);
            table.drop_empty_rows();
            if table.is_empty() {
                log::debug!("{}: CSV has no data rows", name);
                Vec::new()
            } else {
                vec![ExtractedTable {
                    identity: stem,
                    sheet: None,
                    format,
                    table,
                }]
            }
        }
    };

    for t in &tables {
        log::info!(
            "Extracted {}: {} rows x {} columns",
            t.identity,
            t.table.len(),
            t.table.columns.len()
        );
    }

    Ok(tables)
}

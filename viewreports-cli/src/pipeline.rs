//! End-to-end run: extract, reconcile, populate, archive

use std::collections::HashMap;
use std::fmt;

use anyhow::{Context, Result};

use crate::archive::{Artifact, build_archive};
use crate::config::Config;
use crate::excel::{write_csv, write_xlsx};
use crate::extract::{ExtractedTable, SourceFormat, extract_file};
use crate::month::ReportMonth;
use crate::populate::{TemplateWorkbook, populate_table};
use crate::reconcile::{ReferenceLookups, ReferenceMap, reconcile_table};

/// One uploaded platform export
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Everything a run needs besides configuration
#[derive(Debug, Clone)]
pub struct PipelineInput {
    pub files: Vec<InputFile>,
    /// Reference workbook bytes
    pub reference: Vec<u8>,
    /// Template workbook bytes
    pub template: Vec<u8>,
    /// `MM/YYYY`; the previous calendar month when absent
    pub month: Option<String>,
    /// Also archive the cleaned and mapped tables
    pub include_intermediate: bool,
}

/// Table counts per stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub extracted: usize,
    pub reconciled: usize,
    pub populated: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "extracted={}, reconciled={}, populated={}",
            self.extracted, self.reconciled, self.populated
        )
    }
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Zip archive bytes
    pub archive: Vec<u8>,
    pub summary: RunSummary,
    pub month: ReportMonth,
    /// Archive entry names, in archive order
    pub entries: Vec<String>,
}

/// Hands out run-unique identities, appending `_2`, `_3`, ... on collision
#[derive(Debug, Default)]
struct IdentityRegistry {
    used: HashMap<String, usize>,
}

impl IdentityRegistry {
    fn claim(&mut self, base: &str) -> String {
        let mut n = self.used.get(base).copied().unwrap_or(0);
        loop {
            n += 1;
            let candidate = if n == 1 {
                base.to_string()
            } else {
                format!("{}_{}", base, n)
            };
            if !self.used.contains_key(&candidate) {
                self.used.insert(base.to_string(), n);
                self.used.entry(candidate.clone()).or_insert(1);
                return candidate;
            }
        }
    }
}

/// Run the whole pipeline over in-memory inputs
///
/// Reference, template and month problems fail the run. Problems with a
/// single input file are logged and that file is left out.
pub fn run_pipeline(input: &PipelineInput, config: &Config) -> Result<RunOutput> {
    let month = match &input.month {
        Some(text) => ReportMonth::parse(text)?,
        None => ReportMonth::previous_from_now(),
    };
    log::info!("Report month: {}", month);

    let reference =
        ReferenceMap::from_bytes(&input.reference, &config.reference).context("Failed to load reference map")?;
    let lookups = ReferenceLookups::build(&reference);
    log::info!("Reference map: {} records", reference.len());

    let template = TemplateWorkbook::from_bytes(&input.template).context("Failed to load template")?;

    let mut registry = IdentityRegistry::default();
    let mut extracted: Vec<ExtractedTable> = Vec::new();
    for file in &input.files {
        match extract_file(&file.name, &file.bytes, &config.extract) {
            Ok(tables) => {
                for mut table in tables {
                    let unique = registry.claim(&table.identity);
                    if unique != table.identity {
                        log::debug!("Identity {} already used, renamed to {}", table.identity, unique);
                    }
                    table.identity = unique;
                    extracted.push(table);
                }
            }
            Err(e) => log::warn!("Skipping {}: {:#}", file.name, e),
        }
    }

    let naming = &config.archive;
    let mut summary = RunSummary {
        extracted: extracted.len(),
        ..RunSummary::default()
    };
    let mut populated: Vec<Artifact> = Vec::new();
    let mut cleaned: Vec<Artifact> = Vec::new();
    let mut mapped: Vec<Artifact> = Vec::new();

    for table in extracted {
        if input.include_intermediate {
            let name = format!(
                "{}{}.{}",
                naming.extracted_prefix,
                table.identity,
                table.format.output_extension()
            );
            let written = match table.format {
                SourceFormat::Workbook => write_xlsx(&table.table),
                SourceFormat::Csv => write_csv(&table.table),
            };
            match written {
                Ok(bytes) => cleaned.push(Artifact::new(name, bytes)),
                Err(e) => log::warn!("Leaving {} out of the archive: {:#}", name, e),
            }
        }

        let reconciled = reconcile_table(table, &lookups);
        summary.reconciled += 1;

        if input.include_intermediate {
            let name = format!("{}{}.xlsx", naming.reconciled_prefix, reconciled.identity);
            match write_xlsx(&reconciled.table) {
                Ok(bytes) => mapped.push(Artifact::new(name, bytes)),
                Err(e) => log::warn!("Leaving {} out of the archive: {:#}", name, e),
            }
        }

        match populate_table(&reconciled, &template, &month, &config.template, &config.reference) {
            Ok(Some(bytes)) => {
                summary.populated += 1;
                populated.push(Artifact::new(
                    format!("{}{}.xlsx", naming.populated_prefix, reconciled.identity),
                    bytes,
                ));
            }
            Ok(None) => {}
            Err(e) => log::warn!("Failed to populate {}: {:#}", reconciled.identity, e),
        }
    }

    let artifacts: Vec<Artifact> = populated.into_iter().chain(cleaned).chain(mapped).collect();
    let entries = artifacts.iter().map(|a| a.name.clone()).collect();
    let archive = build_archive(&artifacts)?;

    log::info!("Run complete: {}", summary);

    Ok(RunOutput {
        archive,
        summary,
        month,
        entries,
    })
}

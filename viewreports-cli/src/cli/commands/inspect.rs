//! `inspect`: run only the extractor on one file

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use colored::*;

use crate::cli::InspectArgs;
use viewreports::Config;
use viewreports::extract::extract_file;

pub fn handle_inspect_command(args: InspectArgs, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    let name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.display().to_string());
    let bytes = fs::read(&args.file).with_context(|| format!("Failed to read {}", args.file.display()))?;

    let tables = extract_file(&name, &bytes, &config.extract)?;
    if tables.is_empty() {
        println!("{}", "No tables found".yellow());
        return Ok(());
    }

    for table in &tables {
        println!(
            "{} {} rows",
            table.identity.cyan().bold(),
            table.table.len().to_string().green()
        );
        if let Some(sheet) = &table.sheet {
            println!("  sheet: {}", sheet);
        }
        println!("  columns: {}", table.table.columns.join(", ").dimmed());
    }

    Ok(())
}

//! `run`: process exports into the output archive

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use colored::*;

use crate::cli::RunArgs;
use viewreports::{Config, InputFile, PipelineInput, run_pipeline};

/// Extensions picked up when scanning an input directory
const SCANNED_EXTENSIONS: &[&str] = &["xlsx", "xls", "csv"];

pub fn handle_run_command(args: RunArgs, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    let paths = collect_inputs(&args.inputs)?;
    if paths.is_empty() {
        bail!("No .xlsx, .xls or .csv files found in the given inputs");
    }

    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        let bytes = fs::read(path).with_context(|| format!("Failed to read input: {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        files.push(InputFile::new(name, bytes));
    }
    log::info!("Loaded {} input files", files.len());

    let reference = fs::read(&args.reference)
        .with_context(|| format!("Failed to read reference workbook: {}", args.reference.display()))?;
    let template = fs::read(&args.template)
        .with_context(|| format!("Failed to read template workbook: {}", args.template.display()))?;

    let input = PipelineInput {
        files,
        reference,
        template,
        month: args.month,
        include_intermediate: args.include_intermediate,
    };
    let output = run_pipeline(&input, &config)?;

    fs::write(&args.output, &output.archive)
        .with_context(|| format!("Failed to write archive: {}", args.output.display()))?;

    println!(
        "{} {} ({})",
        "Wrote".green().bold(),
        args.output.display().to_string().cyan(),
        output.month
    );
    for entry in &output.entries {
        println!("  {}", entry.dimmed());
    }
    println!("{}", output.summary.to_string().bold());

    Ok(())
}

/// Expand directories (non-recursively) and keep explicit files as given
fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(input)
                .with_context(|| format!("Failed to list directory: {}", input.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && has_scanned_extension(p))
                .collect();
            found.sort();
            log::debug!("{}: {} input files", input.display(), found.len());
            out.extend(found);
        } else if input.is_file() {
            out.push(input.clone());
        } else {
            bail!("Input does not exist: {}", input.display());
        }
    }

    Ok(out)
}

fn has_scanned_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SCANNED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scanned_extensions() {
        assert!(has_scanned_extension(Path::new("a/פרטנר.XLSX")));
        assert!(has_scanned_extension(Path::new("export.csv")));
        assert!(!has_scanned_extension(Path::new("notes.txt")));
        assert!(!has_scanned_extension(Path::new("noext")));
    }

    #[test]
    fn test_collect_inputs_scans_directory() {
        let dir = std::env::temp_dir().join(format!("viewreports-collect-{}", std::process::id()));
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("b.csv"), "x").unwrap();
        fs::write(dir.join("a.xlsx"), "x").unwrap();
        fs::write(dir.join("skip.txt"), "x").unwrap();
        fs::write(dir.join("nested").join("c.csv"), "x").unwrap();

        let found = collect_inputs(&[dir.clone()]).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(found, vec![dir.join("a.xlsx"), dir.join("b.csv")]);
    }

    #[test]
    fn test_missing_input_is_error() {
        assert!(collect_inputs(&[PathBuf::from("/definitely/not/here.xlsx")]).is_err());
    }
}

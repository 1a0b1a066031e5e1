//! Command-line interface

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "viewreports")]
#[command(about = "Turn platform view-report exports into monthly report templates")]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "TOML")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process exports into a zip of filled templates
    Run(RunArgs),
    /// Show the tables the extractor finds in one file
    Inspect(InspectArgs),
    /// Show which vendor rules a file name resolves to
    Vendors(VendorsArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Export files, or directories scanned for .xlsx, .xls and .csv files
    #[arg(required = true, value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    /// Reference workbook mapping program names to house numbers
    #[arg(long, value_name = "XLSX")]
    pub reference: PathBuf,

    /// Report template workbook
    #[arg(long, value_name = "XLSX")]
    pub template: PathBuf,

    /// Report month as MM/YYYY (defaults to the previous month)
    #[arg(long, value_name = "MM/YYYY")]
    pub month: Option<String>,

    /// Also archive the cleaned and mapped tables
    #[arg(long)]
    pub include_intermediate: bool,

    /// Output archive path
    #[arg(short, long, default_value = "view_reports_outputs.zip")]
    pub output: PathBuf,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Export file to inspect
    pub file: PathBuf,
}

#[derive(Args)]
pub struct VendorsArgs {
    /// File name or table identity to resolve
    pub name: String,
}

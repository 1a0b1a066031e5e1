//! `vendors`: show the column roles a file name resolves to

use std::path::Path;

use anyhow::Result;
use colored::*;

use crate::cli::VendorsArgs;
use viewreports::Config;
use viewreports::vendors::{
    ColumnRule, HOUSE_KEY_COLUMNS, PLATFORM_LABELS, RECONCILE_PROGRAM_COLUMNS, REPORT_PROGRAM_COLUMNS,
    REPORT_VIEWER_COLUMNS, first_match,
};

pub fn handle_vendors_command(args: VendorsArgs, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    let name = args.name.as_str();

    println!("{}", name.cyan().bold());

    println!("{}", "Reconcile".bold());
    print_role("program column", first_match(RECONCILE_PROGRAM_COLUMNS, name));
    print_role("house key column", first_match(HOUSE_KEY_COLUMNS, name));

    println!("{}", "Report".bold());
    print_role("program column", first_match(REPORT_PROGRAM_COLUMNS, name));
    match first_match(HOUSE_KEY_COLUMNS, name) {
        Some(rule) => print_role("house column", Some(rule)),
        None => println!("  {:<18} {} {}", "house column", config.reference.house_number, "(default)".dimmed()),
    }
    print_role("viewers column", first_match(REPORT_VIEWER_COLUMNS, name));
    print_role("platform label", first_match(PLATFORM_LABELS, name));

    Ok(())
}

fn print_role(role: &str, rule: Option<&ColumnRule>) {
    match rule {
        Some(rule) => println!("  {:<18} {} {}", role, rule.value.green(), format!("[{}]", rule.vendor).dimmed()),
        None => println!("  {:<18} {}", role, "-".red()),
    }
}

use clap::Parser;
use colored::*;

mod cli;

use cli::{Cli, Commands};

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => cli::commands::run::handle_run_command(args, cli.config.as_deref()),
        Commands::Inspect(args) => cli::commands::inspect::handle_inspect_command(args, cli.config.as_deref()),
        Commands::Vendors(args) => cli::commands::vendors::handle_vendors_command(args, cli.config.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

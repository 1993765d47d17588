//! Crosswalk CLI - commission routing-code assignment.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Assign {
            file,
            lookup_dir,
            output_dir,
            backup_dir,
            target,
            no_open,
            report,
        } => commands::assign::run(
            file, lookup_dir, output_dir, backup_dir, target, no_open, report, cli.verbose,
        ),

        Commands::Check { lookup_dir } => commands::check::run(lookup_dir, cli.verbose),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

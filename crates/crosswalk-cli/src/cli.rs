//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Crosswalk: self-repairing lookup-chain assignment for commission files
#[derive(Parser)]
#[command(name = "crosswalk")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Assign the target field to every row of an input file
    Assign {
        /// Path to the input file, named "<LINE>@<YYYY-MM-DD>.csv"
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Directory holding the catalog and reference tables
        #[arg(short, long, default_value = "Lookup")]
        lookup_dir: PathBuf,

        /// Directory for the resolved output file
        #[arg(short, long, default_value = "Output")]
        output_dir: PathBuf,

        /// Directory for pre-run copies of updatable tables
        #[arg(short, long, default_value = "Backup")]
        backup_dir: PathBuf,

        /// Target field to resolve
        #[arg(short, long, default_value = "FSE Code")]
        target: String,

        /// Don't open the output or repaired tables for review
        #[arg(long)]
        no_open: bool,

        /// Write the run report as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Validate the catalog and reference tables without running anything
    Check {
        /// Directory holding the catalog and reference tables
        #[arg(short, long, default_value = "Lookup")]
        lookup_dir: PathBuf,
    },
}

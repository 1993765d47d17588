//! Assign command - run a full resolution pass over an input file.

use std::fs;
use std::path::{Path, PathBuf};

use colored::Colorize;
use crosswalk::{Crosswalk, CrosswalkConfig, NoReview, ReviewSink};

/// Opens repaired tables and the output file in the operator's default
/// spreadsheet program.
struct DesktopReview;

impl ReviewSink for DesktopReview {
    fn open_for_review(&self, path: &Path) {
        if let Err(e) = open::that(path) {
            eprintln!(
                "{} could not open {} for review: {}",
                "Warning:".yellow().bold(),
                path.display(),
                e
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    file: PathBuf,
    lookup_dir: PathBuf,
    output_dir: PathBuf,
    backup_dir: PathBuf,
    target: String,
    no_open: bool,
    report_path: Option<PathBuf>,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("Input file not found: {}", file.display()).into());
    }

    println!(
        "{} {} (target: {})",
        "Assigning".cyan().bold(),
        file.display(),
        target.white().bold()
    );

    let config = CrosswalkConfig {
        lookup_dir,
        output_dir,
        backup_dir,
        target_field: target,
    };
    let crosswalk = Crosswalk::with_config(config);

    let report = if no_open {
        crosswalk.run_with_review(&file, &NoReview)?
    } else {
        crosswalk.run_with_review(&file, &DesktopReview)?
    };

    println!(
        "{} {}/{} rows resolved, {} flagged for review",
        "Done:".green().bold(),
        report.resolution.resolved,
        report.resolution.rows,
        report.resolution.flagged
    );
    if !report.repaired_tables.is_empty() {
        println!(
            "{} {} — fill in the {} placeholders before the next run",
            "Repaired:".yellow().bold(),
            report.repaired_tables.join(", "),
            "ENF".white().bold()
        );
    }
    println!("Output: {}", report.output.display().to_string().cyan());

    if verbose {
        println!(
            "Batch: line={} file-date={} uploaded={}",
            report.batch.line, report.batch.file_date, report.upload_timestamp
        );
    }

    if let Some(path) = report_path {
        fs::write(&path, serde_json::to_string_pretty(&report)?)?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

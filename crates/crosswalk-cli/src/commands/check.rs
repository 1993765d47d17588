//! Check command - validate the catalog and reference tables.

use std::path::PathBuf;

use colored::Colorize;
use crosswalk::{Catalog, ReferenceTable};

pub fn run(lookup_dir: PathBuf, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("{} {}", "Checking".cyan().bold(), lookup_dir.display());

    let catalog = Catalog::load(&lookup_dir)?;
    println!(
        "Catalog: {} tables, {} target fields",
        catalog.tables.len(),
        catalog.paths.len()
    );

    for (target, paths) in &catalog.paths {
        println!(
            "  {} {} path(s)",
            target.white().bold(),
            paths.len()
        );
        if verbose {
            for path in paths {
                let chain: Vec<String> = path
                    .iter()
                    .map(|id| {
                        catalog
                            .table(*id)
                            .map(|t| t.name.clone())
                            .unwrap_or_else(|_| id.to_string())
                    })
                    .collect();
                println!("    {}", chain.join(" -> "));
            }
        }
    }

    let mut problems = 0;
    for spec in catalog.tables.values() {
        match ReferenceTable::load(spec.clone(), &lookup_dir) {
            Ok(table) => {
                let marker = if spec.updatable { "updatable" } else { "fixed" };
                println!(
                    "  {} {} ({} entries, {})",
                    "ok".green(),
                    spec.name,
                    table.len(),
                    marker
                );
            }
            Err(e) => {
                problems += 1;
                println!("  {} {}: {}", "FAIL".red().bold(), spec.name, e);
            }
        }
    }

    if problems > 0 {
        return Err(format!("{} reference table(s) failed to load", problems).into());
    }

    println!("{}", "Catalog is valid.".green().bold());
    Ok(())
}

//! Main Crosswalk struct and public API: drives a full assignment run.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, TableId};
use crate::error::{CrosswalkError, Result};
use crate::io;
use crate::lookup::{self, ReferenceTable, ResolveReport, Resolver};
use crate::standardize::{BatchIdentity, Standardizer};

/// Configuration for a Crosswalk run.
#[derive(Debug, Clone)]
pub struct CrosswalkConfig {
    /// Directory holding the catalog CSVs, field mappings, and the
    /// persisted reference tables.
    pub lookup_dir: PathBuf,
    /// Where the resolved output file is written.
    pub output_dir: PathBuf,
    /// Where updatable tables are copied before the run mutates them.
    pub backup_dir: PathBuf,
    /// The derived field resolved for every row.
    pub target_field: String,
}

impl Default for CrosswalkConfig {
    fn default() -> Self {
        Self {
            lookup_dir: PathBuf::from("Lookup"),
            output_dir: PathBuf::from("Output"),
            backup_dir: PathBuf::from("Backup"),
            target_field: "FSE Code".to_string(),
        }
    }
}

/// Receives "open for review" requests for repaired tables.
///
/// The library itself never opens anything; front ends decide what review
/// means (the CLI launches the file in the operator's spreadsheet program).
pub trait ReviewSink {
    fn open_for_review(&self, path: &Path);
}

/// A [`ReviewSink`] that ignores every request.
pub struct NoReview;

impl ReviewSink for NoReview {
    fn open_for_review(&self, _path: &Path) {}
}

/// Result of one assignment run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Input file name.
    pub input: String,
    /// Where the resolved dataset was written.
    pub output: PathBuf,
    /// Batch identity parsed from the input file name.
    pub batch: BatchIdentity,
    /// Upload timestamp stamped onto every row.
    pub upload_timestamp: String,
    /// Row-level resolution counts.
    pub resolution: ResolveReport,
    /// Names of reference tables that were repaired and re-persisted.
    pub repaired_tables: Vec<String>,
}

/// The main Crosswalk engine.
pub struct Crosswalk {
    config: CrosswalkConfig,
}

impl Crosswalk {
    /// Create a Crosswalk instance with default configuration.
    pub fn new() -> Self {
        Self::with_config(CrosswalkConfig::default())
    }

    /// Create a Crosswalk instance with custom configuration.
    pub fn with_config(config: CrosswalkConfig) -> Self {
        Self { config }
    }

    /// Run a full assignment without opening anything for review.
    pub fn run(&self, input: impl AsRef<Path>) -> Result<RunReport> {
        self.run_with_review(input, &NoReview)
    }

    /// Run a full assignment: load configuration and reference tables,
    /// standardize the input, resolve the target field on every row, flush
    /// and persist any repaired tables, and write the output file.
    ///
    /// Updatable tables are lock-checked up front so a held file aborts the
    /// run before anything is mutated.
    pub fn run_with_review(
        &self,
        input: impl AsRef<Path>,
        review: &dyn ReviewSink,
    ) -> Result<RunReport> {
        let input = input.as_ref();
        let batch = BatchIdentity::from_path(input)?;

        let catalog = Catalog::load(&self.config.lookup_dir)?;
        let mut tables = self.load_tables(&catalog)?;

        // A held table aborts the run before anything is mutated.
        for table in tables.values() {
            if table.spec.updatable && io::is_locked(&table.path) {
                return Err(CrosswalkError::Locked(table.path.clone()));
            }
        }
        for table in tables.values() {
            if table.spec.updatable {
                io::backup_file(&table.path, &self.config.backup_dir)?;
            }
        }

        let raw = io::read_table(input)?;
        let standardizer = Standardizer::load(&self.config.lookup_dir, batch.clone())?;
        let mut data = standardizer.standardize(&raw);

        let resolver = Resolver::new(&catalog);
        let resolution = resolver.resolve(&mut tables, &mut data, &self.config.target_field)?;

        let mut repaired_tables = Vec::new();
        for table in tables.values_mut() {
            if !table.has_pending() {
                continue;
            }
            lookup::flush(table, &data)?;
            io::write_table(&table.path, &table.data)?;
            review.open_for_review(&table.path);
            repaired_tables.push(table.spec.name.clone());
        }

        let output = self.output_path(input, &standardizer.upload_timestamp);
        io::write_table(&output, &data)?;
        review.open_for_review(&output);

        Ok(RunReport {
            input: input
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            output,
            batch,
            upload_timestamp: standardizer.upload_timestamp,
            resolution,
            repaired_tables,
        })
    }

    /// Load every registered reference table.
    pub fn load_tables(&self, catalog: &Catalog) -> Result<IndexMap<TableId, ReferenceTable>> {
        let mut tables = IndexMap::new();
        for spec in catalog.tables.values() {
            let table = ReferenceTable::load(spec.clone(), &self.config.lookup_dir)?;
            tables.insert(spec.id, table);
        }
        Ok(tables)
    }

    fn output_path(&self, input: &Path, upload_timestamp: &str) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.config.output_dir.join(format!(
            "{}_({})_{{{}}}.csv",
            stem, self.config.target_field, upload_timestamp
        ))
    }
}

impl Default for Crosswalk {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    use crate::lookup::{LOOKUP_FLAG_COLUMN, SENTINEL};

    /// Build a full working directory: catalog, field mappings, two
    /// reference tables, and an input batch.
    fn setup() -> (TempDir, CrosswalkConfig, PathBuf) {
        let root = TempDir::new().unwrap();
        let lookup = root.path().join("Lookup");
        fs::create_dir_all(&lookup).unwrap();

        fs::write(
            lookup.join("tables.csv"),
            "Number,Name,Updatable,Key-Value Pair,Lookup Flag,ID Columns\n\
             1,Customers.csv,TRUE,Customer@Customer Code,CUST,Line@Upload Timestamp\n\
             2,Territories.csv,FALSE,Customer Code@FSE Code,TERR,\n",
        )
        .unwrap();
        fs::write(
            lookup.join("fields.csv"),
            "Lookup Name,Standard Name\n\
             Customer,Customer\n\
             Customer Code,Customer Code\n\
             FSE Code,FSE Code\n",
        )
        .unwrap();
        fs::write(lookup.join("paths.csv"), "Value,Path\nFSE Code,1@2\n").unwrap();
        fs::write(
            lookup.join("field_mappings.csv"),
            "Customer,Customer Code,FSE Code,Line,File Date,Upload Timestamp,Lookup Flag\n\
             Cust Name,,,,,,\n",
        )
        .unwrap();
        fs::write(
            lookup.join("Customers.csv"),
            "Line,Upload Timestamp,Customer,Customer Code\n\
             ACME-LINE,2024-01-01 08.00.00,Acme Corp,ACME\n",
        )
        .unwrap();
        fs::write(
            lookup.join("Territories.csv"),
            "Customer Code,FSE Code\nACME,JDOE\n",
        )
        .unwrap();

        let input = root.path().join("VISHAY@2024-03-01.csv");
        fs::write(&input, "Cust Name\nacme corp\nNewCo Ltd\n").unwrap();

        let config = CrosswalkConfig {
            lookup_dir: lookup,
            output_dir: root.path().join("Output"),
            backup_dir: root.path().join("Backup"),
            target_field: "FSE Code".to_string(),
        };
        (root, config, input)
    }

    #[test]
    fn test_full_run_resolves_and_repairs() {
        let (_root, config, input) = setup();
        let crosswalk = Crosswalk::with_config(config.clone());

        let report = crosswalk.run(&input).unwrap();
        assert_eq!(report.resolution.rows, 2);
        assert_eq!(report.resolution.resolved, 1);
        assert_eq!(report.resolution.flagged, 1);
        assert_eq!(report.repaired_tables, ["Customers.csv"]);
        assert!(report.output.exists());

        // Row 1 resolved through both tables; row 2 left a placeholder.
        let output = io::read_table(&report.output).unwrap();
        assert_eq!(output.value(0, "FSE Code"), "JDOE");
        assert_eq!(output.value(1, "Customer Code"), SENTINEL);
        assert_eq!(output.value(1, LOOKUP_FLAG_COLUMN), "CUST");

        // The repaired table now carries the unknown key, batch-stamped and
        // sorted to the top.
        let customers = io::read_table(config.lookup_dir.join("Customers.csv")).unwrap();
        assert_eq!(customers.value(0, "Customer"), "NEWCO LTD");
        assert_eq!(customers.value(0, "Customer Code"), SENTINEL);
        assert_eq!(customers.value(0, "Line"), "VISHAY");
        assert_eq!(customers.value(0, "Upload Timestamp"), report.upload_timestamp);

        // Backup of the updatable table was taken before mutation.
        let backups: Vec<_> = fs::read_dir(&config.backup_dir).unwrap().collect();
        assert_eq!(backups.len(), 1);
    }

    #[test]
    fn test_rerun_after_repair_is_stable() {
        // A second run translates the unknown key to its placeholder, dies
        // at the next step, and backward-invalidates the sentinel itself (a
        // no-op replacement). The placeholder row is never duplicated.
        let (_root, config, input) = setup();
        let crosswalk = Crosswalk::with_config(config.clone());

        crosswalk.run(&input).unwrap();
        let report = crosswalk.run(&input).unwrap();

        assert_eq!(report.resolution.flagged, 1);
        assert_eq!(report.repaired_tables, ["Customers.csv"]);
        let customers = io::read_table(config.lookup_dir.join("Customers.csv")).unwrap();
        let placeholders = (0..customers.row_count())
            .filter(|&r| customers.value(r, "Customer").eq_ignore_ascii_case("NewCo Ltd"))
            .count();
        assert_eq!(placeholders, 1);
        assert_eq!(customers.value(0, "Customer Code"), SENTINEL);
    }

    #[test]
    fn test_bad_input_name_is_fatal() {
        let (root, config, _input) = setup();
        let bad = root.path().join("no-separator.csv");
        fs::write(&bad, "Cust Name\nacme corp\n").unwrap();

        let err = Crosswalk::with_config(config).run(&bad).unwrap_err();
        assert!(matches!(err, CrosswalkError::Config(_)));
    }

    #[test]
    #[cfg(unix)]
    fn test_locked_updatable_table_aborts_before_mutation() {
        use std::os::unix::fs::{MetadataExt, PermissionsExt};

        let (_root, config, input) = setup();
        // Root ignores the permission bit, so the probe cannot trip.
        let uid = fs::metadata(&config.lookup_dir).map(|m| m.uid()).unwrap_or(0);
        if uid == 0 {
            return;
        }

        let held = config.lookup_dir.join("Customers.csv");
        fs::set_permissions(&held, fs::Permissions::from_mode(0o444)).unwrap();

        let err = Crosswalk::with_config(config.clone()).run(&input).unwrap_err();
        assert!(matches!(err, CrosswalkError::Locked(_)));
        // Fatal before any mutation: no backup, no output.
        assert!(!config.output_dir.exists());
        assert!(!config.backup_dir.exists());
    }

    #[test]
    fn test_missing_reference_table_is_fatal() {
        let (_root, config, input) = setup();
        fs::remove_file(config.lookup_dir.join("Territories.csv")).unwrap();

        let err = Crosswalk::with_config(config.clone()).run(&input).unwrap_err();
        assert!(matches!(err, CrosswalkError::Io { .. }));
        // Fatal before any mutation: no backup, no output.
        assert!(!config.output_dir.exists());
        assert!(!config.backup_dir.exists());
    }
}

//! Column standardization: mapping raw source headers onto the standard
//! field set and generating the run's batch columns.
//!
//! The resolution engine only ever sees standardized datasets; everything
//! here runs before the first lookup.

use std::path::Path;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{CrosswalkError, Result};
use crate::io::{self, DataTable};

/// File name of the field-mapping CSV within the lookup directory.
pub const FIELD_MAPPINGS_FILE: &str = "field_mappings.csv";

/// Format for the upload timestamp written to every row of a batch.
pub const UPLOAD_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H.%M.%S";

/// The line and file date encoded in an input file's name.
///
/// Input files are named `<LINE>@<YYYY-MM-DD>.csv`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchIdentity {
    pub line: String,
    pub file_date: String,
}

impl BatchIdentity {
    /// Parse the batch identity from an input file path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        match stem.split_once('@') {
            Some((line, file_date)) if !line.is_empty() && !file_date.is_empty() => {
                Ok(Self {
                    line: line.to_string(),
                    file_date: file_date.to_string(),
                })
            }
            _ => Err(CrosswalkError::Config(format!(
                "Invalid input file name '{}': expected \"<LINE>@<YYYY-MM-DD>.csv\"",
                path.display()
            ))),
        }
    }
}

/// Projects raw input tables onto the standard field set.
///
/// The field-mapping table's header row is the standard field list; each
/// following row holds accepted alternate source headers for its column.
pub struct Standardizer {
    field_mappings: DataTable,
    pub batch: BatchIdentity,
    /// Batch identity timestamp, fixed at construction for the whole run.
    pub upload_timestamp: String,
}

impl Standardizer {
    /// Load field mappings from the lookup directory.
    pub fn load(lookup_dir: impl AsRef<Path>, batch: BatchIdentity) -> Result<Self> {
        let field_mappings = io::read_table(lookup_dir.as_ref().join(FIELD_MAPPINGS_FILE))?;
        Ok(Self::new(field_mappings, batch))
    }

    /// Build a standardizer from an already-parsed mapping table.
    pub fn new(field_mappings: DataTable, batch: BatchIdentity) -> Self {
        let upload_timestamp = Local::now().format(UPLOAD_TIMESTAMP_FORMAT).to_string();
        Self {
            field_mappings,
            batch,
            upload_timestamp,
        }
    }

    /// The standard field names, in output column order.
    pub fn standard_fields(&self) -> &[String] {
        &self.field_mappings.headers
    }

    /// Run the full standardization pipeline on a raw input table.
    pub fn standardize(&self, input: &DataTable) -> DataTable {
        let mut table = self.map_columns(input);
        self.preprocess(&mut table);
        self.generate_columns(&mut table);
        table
    }

    /// Project the input onto the standard header: a direct name match wins,
    /// otherwise the first alternate name present in the input is used.
    /// Standard fields with no source column come out blank.
    pub fn map_columns(&self, input: &DataTable) -> DataTable {
        let mut mapped = DataTable::with_headers(self.field_mappings.headers.clone());
        mapped.rows = vec![vec![String::new(); mapped.headers.len()]; input.row_count()];

        for (out_col, field) in self.field_mappings.headers.iter().enumerate() {
            let source = if input.column_index(field).is_some() {
                input.column_index(field)
            } else {
                self.field_mappings
                    .column_values(out_col)
                    .filter(|alternate| !alternate.is_empty())
                    .find_map(|alternate| input.column_index(alternate))
            };

            if let Some(in_col) = source {
                for row in 0..input.row_count() {
                    let value = input.get(row, in_col).unwrap_or("").to_string();
                    mapped.set(row, out_col, value);
                }
            }
        }

        mapped
    }

    /// Line-specific cell fixes.
    ///
    /// VISHAY files carry compact `YYYYMMDD` dates; anything that does not
    /// parse as a real date is left untouched.
    pub fn preprocess(&self, table: &mut DataTable) {
        if self.batch.line != "VISHAY" {
            return;
        }
        let Some(date_col) = table.column_index("Date") else {
            return;
        };

        for row in &mut table.rows {
            if let Some(cell) = row.get_mut(date_col) {
                if let Some(fixed) = expand_compact_date(cell) {
                    *cell = fixed;
                }
            }
        }
    }

    /// Fill the generated batch columns on every row.
    pub fn generate_columns(&self, table: &mut DataTable) {
        for row in 0..table.row_count() {
            table.set_value(row, "Line", self.batch.line.clone());
            table.set_value(row, "File Date", self.batch.file_date.clone());
            table.set_value(row, "Upload Timestamp", self.upload_timestamp.clone());
        }
    }
}

/// Turn `20240301` into `2024-03-01`; `None` when the cell is not a
/// plausible compact date.
fn expand_compact_date(cell: &str) -> Option<String> {
    let trimmed = cell.trim();
    if trimmed.len() != 8 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let formatted = format!(
        "{}-{}-{}",
        &trimmed[..4],
        &trimmed[4..6],
        &trimmed[6..]
    );
    NaiveDate::parse_from_str(&formatted, "%Y-%m-%d").ok()?;
    Some(formatted)
}

//! Static lookup configuration: the table registry, the standardized-name
//! dictionary, and the path catalog.
//!
//! The catalog is loaded once per run from three CSVs in the lookup
//! directory and is immutable afterwards. All cross-references are checked
//! at load time so a bad path or a missing column mapping fails before any
//! row is processed.

mod paths;

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{CrosswalkError, Result};
use crate::io::{self, DataTable};

pub use paths::parse_path;

/// Stable numeric identifier for a reference table.
pub type TableId = u32;

/// Registry entry describing one reference table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSpec {
    /// Stable id, referenced from paths.
    pub id: TableId,
    /// File name of the persisted table within the lookup directory.
    pub name: String,
    /// Whether this table may be auto-repaired.
    pub updatable: bool,
    /// Column translated *from* (lookup-file name).
    pub key_column: String,
    /// Column translated *to* (lookup-file name).
    pub value_column: String,
    /// Short code written to a row's `"Lookup Flag"` when this table misses.
    pub lookup_flag: String,
    /// Standardized columns copied from the dataset's template row when a
    /// placeholder row is synthesized. Only meaningful when `updatable`.
    pub id_columns: Vec<String>,
}

/// An ordered chain of reference tables; a row's token is threaded through
/// each table in turn.
pub type LookupPath = Vec<TableId>;

/// Immutable lookup configuration for a run.
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Registry of reference tables, in registry order.
    pub tables: IndexMap<TableId, TableSpec>,
    /// Target field -> alternative paths, in priority order.
    pub paths: IndexMap<String, Vec<LookupPath>>,
    /// Lookup-file column name -> standardized dataset field name.
    pub standard_names: IndexMap<String, String>,
}

/// File names of the three catalog CSVs within the lookup directory.
pub const TABLES_FILE: &str = "tables.csv";
pub const FIELDS_FILE: &str = "fields.csv";
pub const PATHS_FILE: &str = "paths.csv";

impl Catalog {
    /// Build a catalog from already-parsed parts and validate it.
    pub fn new(
        tables: IndexMap<TableId, TableSpec>,
        paths: IndexMap<String, Vec<LookupPath>>,
        standard_names: IndexMap<String, String>,
    ) -> Result<Self> {
        let catalog = Self {
            tables,
            paths,
            standard_names,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load the catalog from `tables.csv`, `fields.csv`, and `paths.csv` in
    /// the lookup directory.
    pub fn load(lookup_dir: impl AsRef<Path>) -> Result<Self> {
        let lookup_dir = lookup_dir.as_ref();

        let registry = io::read_table(lookup_dir.join(TABLES_FILE))?;
        let fields = io::read_table(lookup_dir.join(FIELDS_FILE))?;
        let path_rows = io::read_table(lookup_dir.join(PATHS_FILE))?;

        let tables = Self::parse_registry(&registry)?;
        let standard_names = Self::parse_fields(&fields)?;
        let paths = Self::parse_paths(&path_rows)?;

        Self::new(tables, paths, standard_names)
    }

    fn parse_registry(registry: &DataTable) -> Result<IndexMap<TableId, TableSpec>> {
        for required in ["Number", "Name", "Updatable", "Key-Value Pair", "Lookup Flag"] {
            if registry.column_index(required).is_none() {
                return Err(CrosswalkError::MissingColumn {
                    table: TABLES_FILE.to_string(),
                    column: required.to_string(),
                });
            }
        }

        let mut tables = IndexMap::new();
        for row in 0..registry.row_count() {
            let id_cell = registry.value(row, "Number");
            let id: TableId = id_cell.parse().map_err(|_| {
                CrosswalkError::Config(format!(
                    "Invalid table number '{}' in {}",
                    id_cell, TABLES_FILE
                ))
            })?;
            let (key_column, value_column) =
                paths::parse_key_value_pair(registry.value(row, "Key-Value Pair"))?;

            let spec = TableSpec {
                id,
                name: registry.value(row, "Name").to_string(),
                updatable: paths::parse_flag(registry.value(row, "Updatable")),
                key_column,
                value_column,
                lookup_flag: registry.value(row, "Lookup Flag").to_string(),
                id_columns: paths::parse_columns(registry.value(row, "ID Columns")),
            };

            if tables.insert(id, spec).is_some() {
                return Err(CrosswalkError::Config(format!(
                    "Duplicate table number {} in {}",
                    id, TABLES_FILE
                )));
            }
        }

        Ok(tables)
    }

    fn parse_fields(fields: &DataTable) -> Result<IndexMap<String, String>> {
        for required in ["Lookup Name", "Standard Name"] {
            if fields.column_index(required).is_none() {
                return Err(CrosswalkError::MissingColumn {
                    table: FIELDS_FILE.to_string(),
                    column: required.to_string(),
                });
            }
        }

        let mut names = IndexMap::new();
        for row in 0..fields.row_count() {
            let lookup_name = fields.value(row, "Lookup Name");
            if lookup_name.is_empty() {
                continue;
            }
            names.insert(
                lookup_name.to_string(),
                fields.value(row, "Standard Name").to_string(),
            );
        }

        Ok(names)
    }

    fn parse_paths(path_rows: &DataTable) -> Result<IndexMap<String, Vec<LookupPath>>> {
        for required in ["Value", "Path"] {
            if path_rows.column_index(required).is_none() {
                return Err(CrosswalkError::MissingColumn {
                    table: PATHS_FILE.to_string(),
                    column: required.to_string(),
                });
            }
        }

        // Repeated target rows accumulate alternative paths in file order,
        // which is the priority order the engine tries them in.
        let mut paths: IndexMap<String, Vec<LookupPath>> = IndexMap::new();
        for row in 0..path_rows.row_count() {
            let target = path_rows.value(row, "Value");
            if target.is_empty() {
                continue;
            }
            let path = paths::parse_path(path_rows.value(row, "Path"))?;
            paths.entry(target.to_string()).or_default().push(path);
        }

        Ok(paths)
    }

    /// Check every cross-reference the run will rely on.
    fn validate(&self) -> Result<()> {
        for (target, path_set) in &self.paths {
            for path in path_set {
                for id in path {
                    if !self.tables.contains_key(id) {
                        return Err(CrosswalkError::Config(format!(
                            "Path for '{}' references unknown table id {}",
                            target, id
                        )));
                    }
                }
            }
        }

        for spec in self.tables.values() {
            for column in [&spec.key_column, &spec.value_column] {
                if !self.standard_names.contains_key(column) {
                    return Err(CrosswalkError::Config(format!(
                        "Table '{}' column '{}' has no standardized-name entry",
                        spec.name, column
                    )));
                }
            }
        }

        Ok(())
    }

    /// Get a registry entry by id.
    pub fn table(&self, id: TableId) -> Result<&TableSpec> {
        self.tables.get(&id).ok_or_else(|| {
            CrosswalkError::Config(format!("Unknown table id {}", id))
        })
    }

    /// Get the ordered path set for a target field.
    pub fn path_set(&self, target_field: &str) -> Result<&[LookupPath]> {
        self.paths
            .get(target_field)
            .map(|p| p.as_slice())
            .ok_or_else(|| {
                CrosswalkError::Config(format!(
                    "No lookup paths configured for target field '{}'",
                    target_field
                ))
            })
    }

    /// Translate a lookup-file column name to its standardized field name.
    pub fn standard_name(&self, lookup_name: &str) -> Result<&str> {
        self.standard_names
            .get(lookup_name)
            .map(|s| s.as_str())
            .ok_or_else(|| {
                CrosswalkError::Config(format!(
                    "Column '{}' has no standardized-name entry",
                    lookup_name
                ))
            })
    }
}

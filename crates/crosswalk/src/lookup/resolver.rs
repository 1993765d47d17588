//! Multi-path lookup resolution.
//!
//! For every dataset row the engine walks each configured path in priority
//! order, threading an intermediate value (`carry`) through the chain of
//! reference tables. Each step first checks the table's value column (the
//! token is already canonical), then its key column (the token translates),
//! and on a double miss records repair feedback and moves on to the next
//! path.
//!
//! `resolve` mutates the dataset as a documented side effect: intermediate
//! hits are written through into the row's value column so later paths and
//! rows observe the canonical form without re-deriving it, and write-throughs
//! from a path that later dies are deliberately left in place. Only `carry`
//! is reset between paths.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, TableId};
use crate::error::{CrosswalkError, Result};
use crate::io::DataTable;

use super::reference::ReferenceTable;

/// Placeholder value meaning "entry not found", written both to the dataset
/// and to repaired tables pending human correction.
pub const SENTINEL: &str = "ENF";

/// Dataset column that receives a table's flag code when resolution fails.
pub const LOOKUP_FLAG_COLUMN: &str = "Lookup Flag";

/// Row-level outcome counts for one `resolve` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolveReport {
    /// Total rows processed.
    pub rows: usize,
    /// Rows where some path produced a usable value.
    pub resolved: usize,
    /// Rows left with a `"Lookup Flag"` instead.
    pub flagged: usize,
}

/// Walks the path catalog's chains through loaded reference tables.
pub struct Resolver<'a> {
    catalog: &'a Catalog,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over an immutable catalog.
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Populate `target_field` on every row of the dataset.
    ///
    /// Rows are processed sequentially in dataset order and steps
    /// sequentially within a path; the write-through side effects make both
    /// orders load-bearing. Reference tables accumulate pending repairs but
    /// are never flushed here.
    pub fn resolve(
        &self,
        tables: &mut IndexMap<TableId, ReferenceTable>,
        data: &mut DataTable,
        target_field: &str,
    ) -> Result<ResolveReport> {
        let path_set = self.catalog.path_set(target_field)?.to_vec();

        // Every table a path names must be loaded before any row runs.
        for path in &path_set {
            for id in path {
                if !tables.contains_key(id) {
                    return Err(CrosswalkError::Config(format!(
                        "Path for '{}' references table id {} which is not loaded",
                        target_field, id
                    )));
                }
            }
        }

        let mut report = ResolveReport {
            rows: data.row_count(),
            ..Default::default()
        };

        for row in 0..data.row_count() {
            let mut flag = String::new();
            let mut resolved = false;

            'paths: for path in &path_set {
                let mut carry = String::new();

                for (step_index, &id) in path.iter().enumerate() {
                    let last_step = step_index + 1 == path.len();
                    let table = table(tables, id)?;
                    let updatable = table.spec.updatable;
                    let key_field = self.catalog.standard_name(&table.spec.key_column)?;
                    let value_field =
                        self.catalog.standard_name(&table.spec.value_column)?.to_string();

                    // Previous step's output is the key when there is one.
                    let key = if carry.is_empty() {
                        data.value(row, key_field).to_uppercase()
                    } else {
                        carry.clone()
                    };

                    let hit = if table.lookup_by_value(&key).is_some() {
                        // Already canonical for this table.
                        Some(key.clone())
                    } else {
                        table
                            .lookup_by_key(&key)
                            .map(|index| table.value_at(index).to_string())
                    };

                    match hit {
                        Some(output) => {
                            carry = output;
                            if updatable || !last_step {
                                data.set_value(row, &value_field, carry.clone());
                            }
                        }
                        None => {
                            // Dead end at this step.
                            flag = table.spec.lookup_flag.clone();

                            if updatable {
                                data.set_value(row, &value_field, SENTINEL.to_string());
                                table_mut(tables, id)?.queue_new_key(&key);
                            }

                            // The previous step emitted a value that led
                            // nowhere, so it is retroactively suspect.
                            if step_index > 0 {
                                let previous = table_mut(tables, path[step_index - 1])?;
                                if previous.spec.updatable {
                                    previous.queue_invalid_value(&key);
                                }
                            }

                            // Partial progress is discarded; the next path
                            // starts from the row's own fields.
                            continue 'paths;
                        }
                    }
                }

                // Path completed every step.
                if !carry.is_empty() && carry != SENTINEL {
                    data.set_value(row, target_field, carry);
                    resolved = true;
                    break;
                }
                if carry == SENTINEL {
                    // The chain ended on an unrepaired placeholder; point
                    // the operator at the final table.
                    if let Some(&last_id) = path.last() {
                        flag = table(tables, last_id)?.spec.lookup_flag.clone();
                    }
                }
            }

            if resolved {
                report.resolved += 1;
            } else if !flag.is_empty() {
                data.set_value(row, LOOKUP_FLAG_COLUMN, flag);
                report.flagged += 1;
            }
        }

        Ok(report)
    }
}

fn table(tables: &IndexMap<TableId, ReferenceTable>, id: TableId) -> Result<&ReferenceTable> {
    tables
        .get(&id)
        .ok_or_else(|| CrosswalkError::Config(format!("Table id {} is not loaded", id)))
}

fn table_mut(
    tables: &mut IndexMap<TableId, ReferenceTable>,
    id: TableId,
) -> Result<&mut ReferenceTable> {
    tables
        .get_mut(&id)
        .ok_or_else(|| CrosswalkError::Config(format!("Table id {} is not loaded", id)))
}

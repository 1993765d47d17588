//! In-memory reference tables: bidirectional key/value indexes with
//! pending-repair bookkeeping.

use std::path::{Path, PathBuf};

use crate::catalog::TableSpec;
use crate::error::{CrosswalkError, Result};
use crate::io::{self, DataTable};

/// One loaded reference table.
///
/// `keys` and `values` are parallel, case-normalized (upper-cased) copies of
/// the persisted key/value columns; index `i` of one corresponds to index
/// `i` of the other, and that invariant survives every repair. Entries are
/// not required to be unique; searches return the first match.
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    /// Registry entry this table was loaded from.
    pub spec: TableSpec,
    /// Where the persisted table lives.
    pub path: PathBuf,
    /// The persisted form, original case, mutated only by `flush`.
    pub data: DataTable,
    keys: Vec<String>,
    values: Vec<String>,
    pending_new_keys: Vec<String>,
    pending_invalid_values: Vec<String>,
}

impl ReferenceTable {
    /// Load a reference table from its persisted CSV in the lookup directory.
    pub fn load(spec: TableSpec, lookup_dir: impl AsRef<Path>) -> Result<Self> {
        let path = lookup_dir.as_ref().join(&spec.name);
        let data = io::read_table(&path)?;
        Self::from_parts(spec, path, data)
    }

    /// Build a table from already-parsed data (used by tests and reloads).
    pub fn from_parts(spec: TableSpec, path: PathBuf, data: DataTable) -> Result<Self> {
        let mut table = Self {
            spec,
            path,
            data,
            keys: Vec::new(),
            values: Vec::new(),
            pending_new_keys: Vec::new(),
            pending_invalid_values: Vec::new(),
        };
        table.rebuild_index()?;
        Ok(table)
    }

    /// Rebuild the upper-cased search index from the persisted data.
    ///
    /// Fails with the offending column name when the key or value column is
    /// absent, which is fatal for the run.
    pub fn rebuild_index(&mut self) -> Result<()> {
        let key_col = self.require_column(&self.spec.key_column)?;
        let value_col = self.require_column(&self.spec.value_column)?;

        self.keys = self
            .data
            .column_values(key_col)
            .map(|v| v.to_uppercase())
            .collect();
        self.values = self
            .data
            .column_values(value_col)
            .map(|v| v.to_uppercase())
            .collect();

        debug_assert_eq!(self.keys.len(), self.values.len());
        Ok(())
    }

    fn require_column(&self, name: &str) -> Result<usize> {
        self.data
            .column_index(name)
            .ok_or_else(|| CrosswalkError::MissingColumn {
                table: self.spec.name.clone(),
                column: name.to_string(),
            })
    }

    /// Number of entries in the index.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Find the first index whose value equals `token` (callers pass
    /// upper-cased tokens).
    pub fn lookup_by_value(&self, token: &str) -> Option<usize> {
        self.values.iter().position(|v| v == token)
    }

    /// Find the first index whose key equals `token`.
    pub fn lookup_by_key(&self, token: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == token)
    }

    /// The (upper-cased) value at an index returned by a lookup.
    pub fn value_at(&self, index: usize) -> &str {
        self.values.get(index).map(|s| s.as_str()).unwrap_or("")
    }

    /// Queue a key that failed resolution for appension at flush time.
    pub fn queue_new_key(&mut self, token: &str) {
        if !self.pending_new_keys.iter().any(|k| k == token) {
            self.pending_new_keys.push(token.to_string());
        }
    }

    /// Queue a value now believed wrong for replacement at flush time.
    pub fn queue_invalid_value(&mut self, token: &str) {
        if !self.pending_invalid_values.iter().any(|v| v == token) {
            self.pending_invalid_values.push(token.to_string());
        }
    }

    /// Whether any repairs are queued.
    pub fn has_pending(&self) -> bool {
        !self.pending_new_keys.is_empty() || !self.pending_invalid_values.is_empty()
    }

    /// Keys queued this run, in insertion order.
    pub fn pending_new_keys(&self) -> &[String] {
        &self.pending_new_keys
    }

    /// Values queued for invalidation this run.
    pub fn pending_invalid_values(&self) -> &[String] {
        &self.pending_invalid_values
    }

    /// Drop both queues. Called exactly once per run, at the end of `flush`.
    pub fn clear_pending(&mut self) {
        self.pending_new_keys.clear();
        self.pending_invalid_values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn spec(updatable: bool) -> TableSpec {
        TableSpec {
            id: 1,
            name: "Customers.csv".to_string(),
            updatable,
            key_column: "Customer".to_string(),
            value_column: "Customer Code".to_string(),
            lookup_flag: "CUST".to_string(),
            id_columns: vec![],
        }
    }

    fn table() -> ReferenceTable {
        let data = DataTable::new(
            vec!["Customer".into(), "Customer Code".into()],
            vec![
                vec!["Acme Corp".into(), "ACME".into()],
                vec!["Globex".into(), "GLOBEX".into()],
                vec!["acme corp".into(), "ACME2".into()],
            ],
        );
        ReferenceTable::from_parts(spec(true), "Customers.csv".into(), data).unwrap()
    }

    #[test]
    fn test_index_is_upper_cased_and_parallel() {
        let table = table();
        assert_eq!(table.len(), 3);
        assert_eq!(table.lookup_by_key("ACME CORP"), Some(0));
        assert_eq!(table.value_at(0), "ACME");
    }

    #[test]
    fn test_first_match_wins() {
        let table = table();
        // Rows 0 and 2 share the same normalized key.
        assert_eq!(table.lookup_by_key("ACME CORP"), Some(0));
    }

    #[test]
    fn test_lookup_by_value() {
        let table = table();
        assert_eq!(table.lookup_by_value("GLOBEX"), Some(1));
        assert_eq!(table.lookup_by_value("NOPE"), None);
    }

    #[test]
    fn test_pending_queues_deduplicate() {
        let mut table = table();
        table.queue_new_key("NEWCO");
        table.queue_new_key("NEWCO");
        table.queue_invalid_value("ACME");
        table.queue_invalid_value("ACME");

        assert_eq!(table.pending_new_keys(), ["NEWCO"]);
        assert_eq!(table.pending_invalid_values(), ["ACME"]);
        assert!(table.has_pending());

        table.clear_pending();
        assert!(!table.has_pending());
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let data = DataTable::new(vec!["Customer".into()], vec![vec!["Acme".into()]]);
        let err = ReferenceTable::from_parts(spec(true), "Customers.csv".into(), data)
            .unwrap_err();
        assert!(matches!(
            err,
            CrosswalkError::MissingColumn { ref column, .. } if column == "Customer Code"
        ));
    }
}

//! Reference-table repair: flushing queued mutations into the persisted
//! form.
//!
//! Flush is the last thing that happens to a table in a run and is
//! all-or-nothing within that table: invalid values are replaced with the
//! sentinel, placeholder rows are appended for every unknown key, the table
//! is deduplicated and re-sorted, and both queues are cleared. An operator
//! is expected to fill in the `"ENF"` placeholders before the next run.

use crate::error::{CrosswalkError, Result};
use crate::io::DataTable;

use super::reference::ReferenceTable;
use super::resolver::SENTINEL;

/// Identifying column that, when present, becomes the primary sort key.
pub const UPLOAD_TIMESTAMP_COLUMN: &str = "Upload Timestamp";

/// Apply a table's queued repairs.
///
/// `template` is the just-resolved dataset; its first row supplies the
/// identifying column values for synthesized placeholder rows, tying them to
/// the run's batch. Maintains the key/value index invariant and leaves the
/// pending queues empty.
pub fn flush(table: &mut ReferenceTable, template: &DataTable) -> Result<()> {
    let key_col = require_column(table, &table.spec.key_column)?;
    let value_col = require_column(table, &table.spec.value_column)?;

    replace_invalid_values(table, value_col);
    append_new_keys(table, template, key_col, value_col);
    dedup_by_key(&mut table.data, key_col);
    sort_rows(table, value_col);

    table.clear_pending();
    table.rebuild_index()
}

fn require_column(table: &ReferenceTable, name: &str) -> Result<usize> {
    table
        .data
        .column_index(name)
        .ok_or_else(|| CrosswalkError::MissingColumn {
            table: table.spec.name.clone(),
            column: name.to_string(),
        })
}

/// Replace every occurrence of each queued invalid value with the sentinel.
///
/// The persisted column keeps its original case while the queues hold
/// upper-cased tokens, so the comparison is case-insensitive.
fn replace_invalid_values(table: &mut ReferenceTable, value_col: usize) {
    let invalid: Vec<String> = table
        .pending_invalid_values()
        .iter()
        .map(|v| v.to_uppercase())
        .collect();
    if invalid.is_empty() {
        return;
    }

    for row in &mut table.data.rows {
        if let Some(cell) = row.get_mut(value_col) {
            if invalid.iter().any(|v| *v == cell.to_uppercase()) {
                *cell = SENTINEL.to_string();
            }
        }
    }
}

/// Synthesize a placeholder row per pending key, copying identifying
/// columns from the template row.
fn append_new_keys(
    table: &mut ReferenceTable,
    template: &DataTable,
    key_col: usize,
    value_col: usize,
) {
    let pending: Vec<String> = table.pending_new_keys().to_vec();
    let id_columns = table.spec.id_columns.clone();

    for new_key in pending {
        let mut row = vec![String::new(); table.data.headers.len()];
        for (col, header) in table.data.headers.iter().enumerate() {
            if id_columns.iter().any(|c| c == header) {
                row[col] = template.value(0, header).to_string();
            }
        }
        row[key_col] = new_key;
        row[value_col] = SENTINEL.to_string();
        table.data.push_row(row);
    }
}

/// Deduplicate by key (case-insensitive), keeping the **last** occurrence so
/// a freshly appended placeholder wins over a stale duplicate. Surviving
/// rows keep their relative order.
fn dedup_by_key(data: &mut DataTable, key_col: usize) {
    let mut seen: Vec<String> = Vec::new();
    let mut keep = vec![false; data.rows.len()];

    for (index, row) in data.rows.iter().enumerate().rev() {
        let key = row.get(key_col).map(|s| s.to_uppercase()).unwrap_or_default();
        if !seen.contains(&key) {
            seen.push(key);
            keep[index] = true;
        }
    }

    let mut index = 0;
    data.rows.retain(|_| {
        let kept = keep[index];
        index += 1;
        kept
    });
}

/// Re-sort the table with the sentinel first in the value column.
///
/// When the table carries an upload-timestamp identifying column the
/// primary key is that timestamp descending (newest batch on top), with the
/// ENF-first value order as secondary; otherwise the value order stands
/// alone.
fn sort_rows(table: &mut ReferenceTable, value_col: usize) {
    let timestamp_col = if table
        .spec
        .id_columns
        .iter()
        .any(|c| c == UPLOAD_TIMESTAMP_COLUMN)
    {
        table.data.column_index(UPLOAD_TIMESTAMP_COLUMN)
    } else {
        None
    };

    let value_rank = |row: &Vec<String>| -> (u8, String) {
        let value = row.get(value_col).cloned().unwrap_or_default();
        if value == SENTINEL {
            (0, value)
        } else {
            (1, value)
        }
    };

    match timestamp_col {
        Some(ts_col) => table.data.rows.sort_by(|a, b| {
            let ts_a = a.get(ts_col).map(|s| s.as_str()).unwrap_or("");
            let ts_b = b.get(ts_col).map(|s| s.as_str()).unwrap_or("");
            ts_b.cmp(ts_a).then_with(|| value_rank(a).cmp(&value_rank(b)))
        }),
        None => table.data.rows.sort_by(|a, b| value_rank(a).cmp(&value_rank(b))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableSpec;

    fn spec(id_columns: Vec<&str>) -> TableSpec {
        TableSpec {
            id: 1,
            name: "Customers.csv".to_string(),
            updatable: true,
            key_column: "Customer".to_string(),
            value_column: "Customer Code".to_string(),
            lookup_flag: "CUST".to_string(),
            id_columns: id_columns.into_iter().map(|s| s.to_string()).collect(),
        }
    }

    fn reference(spec: TableSpec, headers: &[&str], rows: &[&[&str]]) -> ReferenceTable {
        let data = DataTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        );
        ReferenceTable::from_parts(spec, "Customers.csv".into(), data).unwrap()
    }

    fn template() -> DataTable {
        DataTable::new(
            vec!["Line".into(), "Upload Timestamp".into(), "Customer".into()],
            vec![vec![
                "VISHAY".into(),
                "2024-03-01 09.30.00".into(),
                "ACME".into(),
            ]],
        )
    }

    #[test]
    fn test_new_key_appended_once_with_sentinel() {
        let mut table = reference(
            spec(vec!["Line"]),
            &["Line", "Customer", "Customer Code"],
            &[&["VISHAY", "Acme", "ACME"]],
        );
        table.queue_new_key("NEWCO");
        flush(&mut table, &template()).unwrap();

        let appended: Vec<usize> = (0..table.data.row_count())
            .filter(|&r| table.data.value(r, "Customer") == "NEWCO")
            .collect();
        assert_eq!(appended.len(), 1);
        let row = appended[0];
        assert_eq!(table.data.value(row, "Customer Code"), SENTINEL);
        assert_eq!(table.data.value(row, "Line"), "VISHAY");
        assert!(!table.has_pending());
    }

    #[test]
    fn test_new_key_replaces_stale_duplicate() {
        // The key already exists with a stale value; the fresh placeholder
        // must win and appear exactly once.
        let mut table = reference(
            spec(vec![]),
            &["Customer", "Customer Code"],
            &[&["NEWCO", "OLD"], &["Acme", "ACME"]],
        );
        table.queue_new_key("NEWCO");
        flush(&mut table, &template()).unwrap();

        let hits: Vec<usize> = (0..table.data.row_count())
            .filter(|&r| table.data.value(r, "Customer").to_uppercase() == "NEWCO")
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(table.data.value(hits[0], "Customer Code"), SENTINEL);
    }

    #[test]
    fn test_invalid_values_replaced_everywhere() {
        let mut table = reference(
            spec(vec![]),
            &["Customer", "Customer Code"],
            &[
                &["Acme", "BAD"],
                &["Globex", "GLOBEX"],
                &["Initech", "bad"],
            ],
        );
        table.queue_invalid_value("BAD");
        flush(&mut table, &template()).unwrap();

        let bad_left = (0..table.data.row_count())
            .any(|r| table.data.value(r, "Customer Code").to_uppercase() == "BAD");
        assert!(!bad_left);
        let sentinels = (0..table.data.row_count())
            .filter(|&r| table.data.value(r, "Customer Code") == SENTINEL)
            .count();
        assert_eq!(sentinels, 2);
    }

    #[test]
    fn test_sentinel_sorts_first_without_timestamp() {
        let mut table = reference(
            spec(vec![]),
            &["Customer", "Customer Code"],
            &[&["B", "ZETA"], &["A", "ALPHA"]],
        );
        table.queue_new_key("NEWCO");
        flush(&mut table, &template()).unwrap();

        assert_eq!(table.data.value(0, "Customer Code"), SENTINEL);
        assert_eq!(table.data.value(1, "Customer Code"), "ALPHA");
        assert_eq!(table.data.value(2, "Customer Code"), "ZETA");
    }

    #[test]
    fn test_timestamp_descending_then_sentinel_first() {
        let mut table = reference(
            spec(vec!["Upload Timestamp"]),
            &["Upload Timestamp", "Customer", "Customer Code"],
            &[
                &["2024-01-01 08.00.00", "Old", "OLD"],
                &["2024-01-01 08.00.00", "Older", "AAA"],
            ],
        );
        table.queue_new_key("NEWCO");
        flush(&mut table, &template()).unwrap();

        // The synthesized row carries the newest timestamp, so it leads.
        assert_eq!(table.data.value(0, "Customer"), "NEWCO");
        assert_eq!(table.data.value(0, "Customer Code"), SENTINEL);
        // Within the older group, value order ascending.
        assert_eq!(table.data.value(1, "Customer Code"), "AAA");
        assert_eq!(table.data.value(2, "Customer Code"), "OLD");
    }

    #[test]
    fn test_flush_with_empty_queues_is_noop() {
        let mut table = reference(
            spec(vec![]),
            &["Customer", "Customer Code"],
            &[&["B", "ZETA"], &["A", "ALPHA"]],
        );
        table.queue_new_key("NEWCO");
        flush(&mut table, &template()).unwrap();

        let after_first = table.data.clone();
        flush(&mut table, &template()).unwrap();
        assert_eq!(table.data.rows, after_first.rows);
    }

    #[test]
    fn test_index_invariant_holds_after_flush() {
        let mut table = reference(
            spec(vec![]),
            &["Customer", "Customer Code"],
            &[&["A", "X"], &["B", "Y"]],
        );
        table.queue_new_key("C");
        table.queue_invalid_value("Y");
        flush(&mut table, &template()).unwrap();

        assert_eq!(table.len(), table.data.row_count());
        // The repaired index answers lookups for the new placeholder.
        let index = table.lookup_by_key("C").unwrap();
        assert_eq!(table.value_at(index), SENTINEL);
    }
}

//! CSV reading/writing, lock probing, and backups.

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::{CrosswalkError, Result};

use super::table::DataTable;

/// Read a CSV file into a [`DataTable`].
///
/// Short rows are padded with empty strings and long rows truncated so every
/// row matches the header width.
pub fn read_table(path: impl AsRef<Path>) -> Result<DataTable> {
    let path = path.as_ref();

    let file = File::open(path).map_err(|e| CrosswalkError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();
    if headers.is_empty() {
        return Err(CrosswalkError::EmptyData(format!(
            "No columns found in '{}'",
            path.display()
        )));
    }

    let expected_cols = headers.len();
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let mut row: Vec<String> = record.iter().map(|s| s.trim().to_string()).collect();
        row.resize(expected_cols, String::new());
        rows.push(row);
    }

    Ok(DataTable::new(headers, rows))
}

/// Write a [`DataTable`] to a CSV file.
///
/// Refuses to write when the target is locked; callers see the error before
/// any bytes are touched. Parent directories are created as needed.
pub fn write_table(path: impl AsRef<Path>, table: &DataTable) -> Result<()> {
    let path = path.as_ref();

    if is_locked(path) {
        return Err(CrosswalkError::Locked(path.to_path_buf()));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| CrosswalkError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    let file = File::create(path).map_err(|e| CrosswalkError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(&table.headers)?;
    let width = table.headers.len();
    for row in &table.rows {
        let mut record: Vec<&str> = row.iter().map(|s| s.as_str()).collect();
        record.resize(width, "");
        writer.write_record(&record)?;
    }
    writer.flush().map_err(|e| CrosswalkError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

/// Check whether a file is held open elsewhere.
///
/// Probes by opening for write: permission denied means another program
/// (typically a spreadsheet application) has the file; a missing file is not
/// locked.
pub fn is_locked(path: impl AsRef<Path>) -> bool {
    match OpenOptions::new().write(true).open(path.as_ref()) {
        Ok(_) => false,
        Err(e) => e.kind() == ErrorKind::PermissionDenied,
    }
}

/// Copy a file into the backup directory with a date-stamped name.
///
/// `Lookup.csv` becomes `Lookup_(24-03-01).csv`. Returns the backup path.
pub fn backup_file(path: impl AsRef<Path>, backup_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let backup_dir = backup_dir.as_ref();

    if !backup_dir.exists() {
        fs::create_dir_all(backup_dir).map_err(|e| CrosswalkError::Io {
            path: backup_dir.to_path_buf(),
            source: e,
        })?;
    }

    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let timestamp = Local::now().format("%y-%m-%d");
    let backup_path = backup_dir.join(format!("{}_({}){}", stem, timestamp, ext));

    fs::copy(path, &backup_path).map_err(|e| CrosswalkError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(backup_path)
}

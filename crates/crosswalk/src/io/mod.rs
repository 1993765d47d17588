//! Tabular input/output: the CSV source/sink collaborators.

mod files;
mod table;

pub use files::{backup_file, is_locked, read_table, write_table};
pub use table::DataTable;

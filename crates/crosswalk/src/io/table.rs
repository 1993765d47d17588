//! In-memory tabular data.

/// Parsed tabular data: a header row plus row-major string cells.
///
/// Every cell is a string; blank cells are empty strings. The resolution
/// engine mutates tables in place, so cell writes by column name will
/// materialize a missing column rather than fail (the target field and
/// `"Lookup Flag"` columns usually do not exist on the input).
#[derive(Debug, Clone, Default)]
pub struct DataTable {
    /// Column headers.
    pub headers: Vec<String>,
    /// Row data as strings (row-major order).
    pub rows: Vec<Vec<String>>,
}

impl DataTable {
    /// Create a new data table.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Create an empty table with the given header.
    pub fn with_headers(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Get the number of rows (excluding header).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Find the index of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Get a specific cell value.
    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(col).map(|s| s.as_str()))
    }

    /// Get a cell by column name; missing column or short row reads as "".
    pub fn value(&self, row: usize, column: &str) -> &str {
        self.column_index(column)
            .and_then(|col| self.get(row, col))
            .unwrap_or("")
    }

    /// Set a cell by index, padding the row if it is short.
    pub fn set(&mut self, row: usize, col: usize, value: String) {
        if let Some(r) = self.rows.get_mut(row) {
            if r.len() <= col {
                r.resize(col + 1, String::new());
            }
            r[col] = value;
        }
    }

    /// Set a cell by column name, adding the column if it does not exist.
    pub fn set_value(&mut self, row: usize, column: &str, value: String) {
        let col = match self.column_index(column) {
            Some(col) => col,
            None => {
                self.add_column(column.to_string(), String::new());
                self.headers.len() - 1
            }
        };
        self.set(row, col, value);
    }

    /// Append a new column filled with a default value.
    pub fn add_column(&mut self, name: String, default: String) {
        self.headers.push(name);
        for row in &mut self.rows {
            row.push(default.clone());
        }
    }

    /// Get all values for a column by index.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |row| row.get(index).map(|s| s.as_str()).unwrap_or(""))
    }

    /// Append a row, padding or truncating to the header width.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }
}

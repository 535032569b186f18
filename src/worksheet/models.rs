//! Row and table primitives shared by every worksheet store backend.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single worksheet row: column header -> cell value.
///
/// Cells keep the order in which they were inserted so that headers written
/// back to the sheet stay in a stable, human-friendly order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: Vec<(String, String)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(column, value);
        self
    }

    /// Set a cell, replacing the value if the column is already present.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(c, _)| *c == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(c, _)| c.as_str())
    }

    /// True when every cell is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

/// How a write treats the rows already present in the target worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteMode {
    /// Drop every existing row and write the given rows.
    Replace,
    /// Insert rows whose key is absent, overwrite rows whose key is present.
    Upsert { key_column: String },
}

impl WriteMode {
    pub fn upsert(key_column: impl Into<String>) -> Self {
        WriteMode::Upsert {
            key_column: key_column.into(),
        }
    }
}

/// Logical worksheet names used by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNames {
    pub raw: String,
    pub staging: String,
    pub processed: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            raw: "raw_data".to_string(),
            staging: "staging".to_string(),
            processed: "processed".to_string(),
        }
    }
}

/// Merge `incoming` into `existing` by `key_column`.
///
/// Rows keep their position; rows with a new key are appended in the order
/// they arrive. Columns of an existing row that the incoming row does not
/// carry (e.g. a note a human added) are preserved. Later duplicates of the
/// same key within `incoming` win.
pub fn upsert_rows(existing: Vec<Row>, incoming: &[Row], key_column: &str) -> Vec<Row> {
    let mut merged = existing;
    let mut positions: HashMap<String, usize> = HashMap::new();
    for (index, row) in merged.iter().enumerate() {
        if let Some(key) = row.get(key_column) {
            positions.entry(key.to_string()).or_insert(index);
        }
    }

    for row in incoming {
        let Some(key) = row.get(key_column) else {
            continue;
        };
        match positions.get(key) {
            Some(&index) => {
                for (column, value) in &row.cells {
                    merged[index].insert(column.clone(), value.clone());
                }
            }
            None => {
                positions.insert(key.to_string(), merged.len());
                merged.push(row.clone());
            }
        }
    }
    merged
}

/// Header for a table write: the declared columns first, then any extra
/// columns found on the rows, in first-seen order.
pub fn header_for(columns: &[&str], rows: &[Row]) -> Vec<String> {
    let mut header: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
    for row in rows {
        for column in row.columns() {
            if !header.iter().any(|h| h == column) {
                header.push(column.to_string());
            }
        }
    }
    header
}

/// Lay rows out as a grid (header first) for transports that speak in cells.
pub fn to_grid(header: &[String], rows: &[Row]) -> Vec<Vec<String>> {
    let mut grid = Vec::with_capacity(rows.len() + 1);
    grid.push(header.to_vec());
    for row in rows {
        grid.push(
            header
                .iter()
                .map(|column| row.get(column).unwrap_or_default().to_string())
                .collect(),
        );
    }
    grid
}

/// Rows parsed from a cell grid.
#[derive(Debug, Default)]
pub struct ParsedGrid {
    pub rows: Vec<Row>,
    /// Non-empty cells with no header above them. They are not part of any
    /// row.
    pub ignored_cells: usize,
}

/// Parse a grid whose first line is the header. Short lines are padded with
/// empty cells. Cells past the header, or under an empty header cell, are
/// dropped and counted so the caller can warn about them.
pub fn from_grid(grid: Vec<Vec<String>>) -> ParsedGrid {
    let mut lines = grid.into_iter();
    let Some(header) = lines.next() else {
        return ParsedGrid::default();
    };

    let mut parsed = ParsedGrid::default();
    for line in lines {
        let mut row = Row::new();
        for (position, value) in line.iter().enumerate() {
            match header.get(position) {
                Some(column) if !column.is_empty() => row.insert(column.clone(), value.clone()),
                _ if !value.trim().is_empty() => parsed.ignored_cells += 1,
                _ => {}
            }
        }
        for column in header.iter().skip(line.len()) {
            if !column.is_empty() {
                row.insert(column.clone(), "");
            }
        }
        parsed.rows.push(row);
    }
    parsed
}

//! Core data structures for the race/coordinate join.
//!
//! Defines the in-memory table shared by loader, joiner and formatter,
//! the coordinate record, and the run statistics.

use crate::value::Value;

/// An ordered table of typed values
///
/// Column names are unique and every row holds exactly one value per
/// column, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given unique column names
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row, padding with nulls or dropping extra values so it
    /// matches the column count
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    /// Look up a field by row number and column name
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(index))
    }

    /// Return the index of `name`, appending it as an all-null column when absent
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(index) = self.column_index(name) {
            return index;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(Value::Null);
        }
        self.columns.len() - 1
    }

    /// Overwrite a single field
    pub fn set(&mut self, row: usize, column: usize, value: Value) {
        if let Some(slot) = self.rows.get_mut(row).and_then(|r| r.get_mut(column)) {
            *slot = value;
        }
    }
}

/// A racecourse location
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinate {
    pub name: Value,
    pub x: Value,
    pub y: Value,
}

impl Coordinate {
    pub fn new(name: impl Into<Value>, x: impl Into<Value>, y: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            x: x.into(),
            y: y.into(),
        }
    }
}

/// Join statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct JoinStats {
    pub races: usize,
    pub coordinates: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub duplicate_names: usize,
}

//! # Ledger Module
//!
//! The in-memory observation table, its undo log, and its CSV persistence.
//!
//! This module handles:
//! - An ordered, string-typed table with fixed columns
//! - Invertible add/delete actions with a bounded undo stack
//! - Dated output paths with collision avoidance
//! - Atomic full-file CSV writes and loading

pub mod action;
pub mod writer;

use crate::error::{InstalogError, Result};

pub use action::{Action, ActionLog, UNDO_CAPACITY};
pub use writer::{load_ledger, LedgerWriter, SheetName};

/// Columns of the observation sheet
pub const OBSERVATION_COLUMNS: [&str; 7] = [
    "Species",
    "Count",
    "Time",
    "Obs",
    "Comment",
    "Latitude",
    "Longitude",
];

/// Columns of the GPS track sheet
pub const TRACK_COLUMNS: [&str; 3] = ["Time", "Latitude", "Longitude"];

/// One ledger row; cell values in column order
pub type Row = Vec<String>;

/// Ordered table of string cells.
///
/// Every row has exactly one value per column. Rows are kept in insertion
/// order and are only ever removed from the tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Ledger {
    /// Creates an empty ledger with the given column names
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Creates an empty observation ledger
    pub fn observations() -> Self {
        Self::new(OBSERVATION_COLUMNS)
    }

    /// Creates an empty track ledger
    pub fn track() -> Self {
        Self::new(TRACK_COLUMNS)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last_row(&self) -> Option<&Row> {
        self.rows.last()
    }

    /// Index of the column called `name`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Append a row at the tail
    ///
    /// # Errors
    ///
    /// Returns `InvalidEdit` if the row width differs from the column count
    pub fn push_row(&mut self, row: Row) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(InstalogError::InvalidEdit(format!(
                "row has {} values but the sheet has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Remove and return the tail row
    pub fn pop_row(&mut self) -> Option<Row> {
        self.rows.pop()
    }

    /// Overwrite a single cell in place
    ///
    /// # Errors
    ///
    /// Returns `InvalidEdit` if `row` or `column` is out of range
    pub fn set_cell(&mut self, row: usize, column: usize, value: impl Into<String>) -> Result<()> {
        let width = self.columns.len();
        let height = self.rows.len();
        let cell = self
            .rows
            .get_mut(row)
            .and_then(|cells| cells.get_mut(column))
            .ok_or_else(|| {
                InstalogError::InvalidEdit(format!(
                    "cell ({}, {}) is outside the {}x{} sheet",
                    row, column, height, width
                ))
            })?;
        *cell = value.into();
        Ok(())
    }

    /// Remove every row, keeping the columns
    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> Row {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_observation_columns() {
        let ledger = Ledger::observations();
        assert_eq!(ledger.columns().len(), 7);
        assert_eq!(ledger.column_index("Species"), Some(0));
        assert_eq!(ledger.column_index("Comment"), Some(4));
        assert_eq!(ledger.column_index("Longitude"), Some(6));
        assert_eq!(ledger.column_index("Altitude"), None);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_push_and_pop_tail() {
        let mut ledger = Ledger::track();
        ledger.push_row(row(&["10:00:00", "1.0", "2.0"])).unwrap();
        ledger.push_row(row(&["10:00:01", "1.5", "2.5"])).unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.pop_row(), Some(row(&["10:00:01", "1.5", "2.5"])));
        assert_eq!(ledger.last_row(), Some(&row(&["10:00:00", "1.0", "2.0"])));
    }

    #[test]
    fn test_push_rejects_wrong_width() {
        let mut ledger = Ledger::track();
        let result = ledger.push_row(row(&["10:00:00", "1.0"]));
        assert!(matches!(result, Err(InstalogError::InvalidEdit(_))));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_set_cell() {
        let mut ledger = Ledger::track();
        ledger.push_row(row(&["10:00:00", "1.0", "2.0"])).unwrap();
        ledger.set_cell(0, 1, "3.0").unwrap();
        assert_eq!(ledger.rows()[0][1], "3.0");

        assert!(ledger.set_cell(1, 0, "x").is_err());
        assert!(ledger.set_cell(0, 3, "x").is_err());
    }

    #[test]
    fn test_pop_empty() {
        let mut ledger = Ledger::observations();
        assert_eq!(ledger.pop_row(), None);
    }
}

use chrono::{DateTime, Utc};

use super::query_result::QueryResult;

/// A borrowed view of one row of a [`QueryResult`].
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    result: &'a QueryResult,
    index: usize,
}

impl<'a> RowRef<'a> {
    pub(crate) fn new(result: &'a QueryResult, index: usize) -> Self {
        Self { result, index }
    }

    /// Position of this row within its result.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.result.column_index(column_name)
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&'a str> {
        self.result.get_str(self.index, column_name)
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, col: usize) -> Option<&'a str> {
        self.result.as_str(self.index, col)
    }

    #[must_use]
    pub fn get_bool(&self, column_name: &str) -> Option<bool> {
        self.result.get_bool(self.index, column_name)
    }

    #[must_use]
    pub fn get_int64(&self, column_name: &str) -> Option<i64> {
        self.result.get_int64(self.index, column_name)
    }

    #[must_use]
    pub fn get_datetime(&self, column_name: &str) -> Option<DateTime<Utc>> {
        self.result.get_datetime(self.index, column_name)
    }
}

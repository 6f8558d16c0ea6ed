use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::row::RowRef;
use crate::datetime;

/// Completion status of one result object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultStatus {
    /// A statement that returns no rows finished.
    CommandOk,
    /// A statement returned a (possibly empty) row set.
    TuplesOk,
    /// The statement failed; see [`QueryResult::error_message`].
    Error,
}

impl ResultStatus {
    #[must_use]
    pub fn is_success(self) -> bool {
        !matches!(self, Self::Error)
    }
}

/// One result object drained from a connection.
///
/// Values are kept in the text representation the server sent them in; the
/// typed accessors parse on read. `None` cells are SQL `NULL`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    status: ResultStatus,
    column_names: Arc<Vec<String>>,
    rows: Vec<Vec<Option<String>>>,
    rows_affected: u64,
    error_message: Option<String>,
    // name -> index, shared with clones of this result
    column_index_cache: Arc<HashMap<String, usize>>,
}

impl QueryResult {
    /// A row-returning result.
    #[must_use]
    pub fn tuples(column_names: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let cache = column_names
            .iter()
            .enumerate()
            .rev()
            .map(|(i, name)| (name.clone(), i))
            .collect::<HashMap<_, _>>();
        let rows_affected = rows.len() as u64;
        Self {
            status: ResultStatus::TuplesOk,
            column_names: Arc::new(column_names),
            rows,
            rows_affected,
            error_message: None,
            column_index_cache: Arc::new(cache),
        }
    }

    /// A command result with no rows (INSERT/UPDATE/DDL...).
    #[must_use]
    pub fn command(rows_affected: u64) -> Self {
        Self {
            status: ResultStatus::CommandOk,
            column_names: Arc::new(Vec::new()),
            rows: Vec::new(),
            rows_affected,
            error_message: None,
            column_index_cache: Arc::new(HashMap::new()),
        }
    }

    /// A failed statement.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Error,
            column_names: Arc::new(Vec::new()),
            rows: Vec::new(),
            rows_affected: 0,
            error_message: Some(message.into()),
            column_index_cache: Arc::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_rows_affected(mut self, rows_affected: u64) -> Self {
        self.rows_affected = rows_affected;
        self
    }

    #[must_use]
    pub fn status(&self) -> ResultStatus {
        self.status
    }

    /// Error text for failed results, empty otherwise.
    #[must_use]
    pub fn error_message(&self) -> &str {
        self.error_message.as_deref().unwrap_or("")
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.column_names.len()
    }

    #[must_use]
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Resolve a column name to its index.
    ///
    /// Unquoted names are case-folded to lower case; a name wrapped in double
    /// quotes is matched exactly. Duplicate names resolve to the first column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let key = match name
            .strip_prefix('"')
            .and_then(|inner| inner.strip_suffix('"'))
        {
            Some(quoted) => quoted.replace("\"\"", "\""),
            None => name.to_lowercase(),
        };
        self.column_index_cache.get(&key).copied()
    }

    #[must_use]
    pub fn row(&self, index: usize) -> Option<RowRef<'_>> {
        (index < self.rows.len()).then(|| RowRef::new(self, index))
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> {
        (0..self.rows.len()).map(|index| RowRef::new(self, index))
    }

    #[must_use]
    pub fn is_null(&self, row: usize, col: usize) -> bool {
        matches!(self.rows.get(row).and_then(|r| r.get(col)), Some(None))
    }

    /// Raw text of a cell; `None` for `NULL` or out-of-range positions.
    #[must_use]
    pub fn as_str(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_deref()
    }

    /// `true` when the cell text starts with `t` (PostgreSQL's boolean output).
    #[must_use]
    pub fn as_bool(&self, row: usize, col: usize) -> Option<bool> {
        self.as_str(row, col).map(|v| v.starts_with('t'))
    }

    #[must_use]
    pub fn as_integer(&self, row: usize, col: usize) -> Option<i32> {
        self.as_str(row, col)?.trim().parse().ok()
    }

    #[must_use]
    pub fn as_int64(&self, row: usize, col: usize) -> Option<i64> {
        self.as_str(row, col)?.trim().parse().ok()
    }

    /// Parse the cell as a timestamp anchored at UTC.
    #[must_use]
    pub fn as_datetime(&self, row: usize, col: usize) -> Option<DateTime<Utc>> {
        datetime::parse_utc(self.as_str(row, col)?)
    }

    #[must_use]
    pub fn get_str(&self, row: usize, column: &str) -> Option<&str> {
        self.as_str(row, self.column_index(column)?)
    }

    #[must_use]
    pub fn get_bool(&self, row: usize, column: &str) -> Option<bool> {
        self.as_bool(row, self.column_index(column)?)
    }

    #[must_use]
    pub fn get_integer(&self, row: usize, column: &str) -> Option<i32> {
        self.as_integer(row, self.column_index(column)?)
    }

    #[must_use]
    pub fn get_int64(&self, row: usize, column: &str) -> Option<i64> {
        self.as_int64(row, self.column_index(column)?)
    }

    #[must_use]
    pub fn get_datetime(&self, row: usize, column: &str) -> Option<DateTime<Utc>> {
        self.as_datetime(row, self.column_index(column)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn sample() -> QueryResult {
        QueryResult::tuples(
            vec![
                "id".into(),
                "name".into(),
                "active".into(),
                "created".into(),
                "Mixed".into(),
            ],
            vec![
                vec![
                    Some("7".into()),
                    Some("alice".into()),
                    Some("t".into()),
                    Some("2024-01-02 03:04:05.5".into()),
                    Some("x".into()),
                ],
                vec![
                    Some("9000000000".into()),
                    None,
                    Some("f".into()),
                    Some("not a date".into()),
                    None,
                ],
            ],
        )
    }

    #[test]
    fn accessors_by_index() {
        let rs = sample();
        assert_eq!(rs.status(), ResultStatus::TuplesOk);
        assert_eq!(rs.n_rows(), 2);
        assert_eq!(rs.n_columns(), 5);
        assert_eq!(rs.as_str(0, 1), Some("alice"));
        assert_eq!(rs.as_integer(0, 0), Some(7));
        assert_eq!(rs.as_int64(1, 0), Some(9_000_000_000));
        assert_eq!(rs.as_integer(1, 0), None, "does not fit in i32");
        assert_eq!(rs.as_bool(0, 2), Some(true));
        assert_eq!(rs.as_bool(1, 2), Some(false));
        assert_eq!(rs.as_datetime(0, 3).unwrap().nanosecond(), 500_000_000);
        assert_eq!(rs.as_datetime(1, 3), None);
        assert!(rs.is_null(1, 1));
        assert!(!rs.is_null(0, 1));
        assert_eq!(rs.as_str(1, 1), None);
        assert_eq!(rs.as_str(5, 0), None);
        assert_eq!(rs.as_str(0, 42), None);
    }

    #[test]
    fn accessors_by_name() {
        let rs = sample();
        assert_eq!(rs.get_str(0, "name"), Some("alice"));
        assert_eq!(rs.get_str(0, "NAME"), Some("alice"));
        assert_eq!(rs.get_int64(1, "id"), Some(9_000_000_000));
        assert_eq!(rs.get_integer(0, "id"), Some(7));
        assert_eq!(rs.get_bool(0, "active"), Some(true));
        assert!(rs.get_datetime(0, "created").is_some());
        assert_eq!(rs.get_str(0, "missing"), None);
        // unquoted lookups fold case, quoted lookups are exact
        assert_eq!(rs.column_index("Mixed"), None);
        assert_eq!(rs.column_index("\"Mixed\""), Some(4));
    }

    #[test]
    fn duplicate_columns_resolve_to_first() {
        let rs = QueryResult::tuples(
            vec!["a".into(), "a".into()],
            vec![vec![Some("1".into()), Some("2".into())]],
        );
        assert_eq!(rs.get_str(0, "a"), Some("1"));
    }

    #[test]
    fn command_and_error_results() {
        let cmd = QueryResult::command(3);
        assert_eq!(cmd.status(), ResultStatus::CommandOk);
        assert_eq!(cmd.rows_affected(), 3);
        assert_eq!(cmd.n_rows(), 0);
        assert_eq!(cmd.error_message(), "");

        let err = QueryResult::error("ERROR:  relation \"nope\" does not exist");
        assert!(!err.status().is_success());
        assert!(err.error_message().contains("nope"));
    }
}
